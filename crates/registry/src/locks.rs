//! Per-service call serialization.
//!
//! A remote node cannot correlate overlapping requests of the same service
//! from one client, so calls of one [`ServiceKind`] are issued strictly one
//! at a time (FIFO).  Calls of different kinds may overlap.

use cyd_protocol::ServiceKind;
use tokio::sync::{Mutex, MutexGuard};

/// One FIFO lock per register service.
#[derive(Debug, Default)]
pub struct ServiceLocks {
    list: Mutex<()>,
    access: Mutex<()>,
}

impl ServiceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire exclusive use of `kind`.  Released when the guard drops.
    pub async fn acquire(&self, kind: ServiceKind) -> MutexGuard<'_, ()> {
        self.lock_for(kind).lock().await
    }

    /// Whether a call of `kind` is currently in flight.
    pub fn is_busy(&self, kind: ServiceKind) -> bool {
        self.lock_for(kind).try_lock().is_err()
    }

    fn lock_for(&self, kind: ServiceKind) -> &Mutex<()> {
        match kind {
            ServiceKind::List => &self.list,
            ServiceKind::Access => &self.access,
        }
    }
}
