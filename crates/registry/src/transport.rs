//! Transport seam for the register services.
//!
//! The registry never touches frames or sessions.  It only needs a client
//! that can issue one List or Access call to a node and return the response,
//! or fail.  Implementations wrap a real bus stack; [`MemoryNode`] is an
//! in-process node for tests and simulations.
//!
//! [`MemoryNode`]: crate::memory::MemoryNode

use async_trait::async_trait;
use cyd_protocol::{AccessRequest, AccessResponse, ListRequest, ListResponse, NodeId};

/// Issues register service calls to remote nodes.
///
/// One call is one request/response exchange.  Retries, timeouts and call
/// serialization are handled by the caller; an implementation may still
/// return [`TransportError::Timeout`] if its own stack gives up first.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// `uavcan.register.List`: name of the register at `request.index`.
    async fn list(&self, remote: NodeId, request: ListRequest) -> Result<ListResponse, TransportError>;

    /// `uavcan.register.Access`: read or write one register.
    async fn access(
        &self,
        remote: NodeId,
        request: AccessRequest,
    ) -> Result<AccessResponse, TransportError>;
}

/// Errors that can occur during a single service call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("timeout waiting for response")]
    Timeout,

    #[error("transport is closed")]
    Closed,

    #[error("request rejected by transport: {0}")]
    Rejected(String),
}

impl From<TransportError> for cyd_domain::error::Error {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Timeout => cyd_domain::error::Error::Timeout(e.to_string()),
            other => cyd_domain::error::Error::Transport(other.to_string()),
        }
    }
}
