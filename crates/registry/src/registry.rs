//! Discovers, caches and writes the registers of one remote node.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use cyd_domain::config::RegistryConfig;
use cyd_domain::trace::TraceEvent;
use cyd_protocol::{
    parse_wire_name, wire_name, AccessRequest, AccessResponse, ListRequest, Name, NodeId,
    ServiceKind, Slot, NODE_ID_REGISTER,
};
use futures_util::FutureExt;
use parking_lot::RwLock;

use crate::codec::{CodecError, NativeValue};
use crate::locks::ServiceLocks;
use crate::register::{Register, RegisterSnapshot};
use crate::transport::{ServiceClient, TransportError};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RegisterMap
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Name-keyed register storage that iterates in insertion order.
#[derive(Debug, Default)]
struct RegisterMap {
    by_name: HashMap<String, Register>,
    order: Vec<String>,
}

impl RegisterMap {
    fn get(&self, name: &str) -> Option<&Register> {
        self.by_name.get(name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Register> {
        self.by_name.get_mut(name)
    }

    fn insert(&mut self, register: Register) {
        let name = register.name().to_string();
        if self.by_name.insert(name.clone(), register).is_none() {
            self.order.push(name);
        }
    }

    fn remove(&mut self, name: &str) -> Option<Register> {
        let register = self.by_name.remove(name)?;
        self.order.retain(|n| n != name);
        Some(register)
    }

    fn iter(&self) -> impl Iterator<Item = &Register> {
        self.order.iter().filter_map(|n| self.by_name.get(n))
    }

    fn len(&self) -> usize {
        self.by_name.len()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Registers of a single remote node.
///
/// All operations take `&self`, so one registry can serve concurrent
/// discovery, refreshes and writes.  Calls of the same service are issued
/// one at a time; every call is retried up to
/// [`RegistryConfig::request_attempts`] times with a per-attempt timeout.
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use cyd_protocol::NodeId;
/// # use cyd_registry::{MemoryNode, Registry};
/// # async fn demo() -> Result<(), cyd_registry::RegistryError> {
/// let registry = Registry::new(Some(NodeId(5)), Arc::new(MemoryNode::new(5)));
/// registry.discover().await?;
/// if registry.contains("navlight.brightness") {
///     registry.set_value("navlight.brightness", 50u16).await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Registry {
    remote_id: RwLock<Option<NodeId>>,
    client: Arc<dyn ServiceClient>,
    config: RegistryConfig,
    locks: ServiceLocks,
    registers: RwLock<RegisterMap>,
}

impl Registry {
    /// Create a registry with the default call policy.
    ///
    /// `remote_id` may be `None` until the node's identifier is known.
    pub fn new(remote_id: Option<NodeId>, client: Arc<dyn ServiceClient>) -> Self {
        Self::with_config(remote_id, client, RegistryConfig::default())
    }

    pub fn with_config(
        remote_id: Option<NodeId>,
        client: Arc<dyn ServiceClient>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            remote_id: RwLock::new(remote_id),
            client,
            config,
            locks: ServiceLocks::new(),
            registers: RwLock::new(RegisterMap::default()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn remote_id(&self) -> Option<NodeId> {
        *self.remote_id.read()
    }

    /// Point the registry at another node identifier (or none).
    ///
    /// Cached registers are kept; refresh them if the node changed.
    pub fn set_remote_id(&self, remote_id: Option<NodeId>) {
        let old = std::mem::replace(&mut *self.remote_id.write(), remote_id);
        if old != remote_id {
            TraceEvent::RemoteRepointed {
                old_node_id: old.map(|id| id.0),
                new_node_id: remote_id.map(|id| id.0),
            }
            .emit();
        }
    }

    fn require_remote_id(&self) -> Result<NodeId, RegistryError> {
        self.remote_id().ok_or(RegistryError::NoRemoteIdentifier)
    }

    // ── Protocol ─────────────────────────────────────────────────────

    /// Run one service call with the retry budget.
    ///
    /// Returns `None` once every attempt failed or timed out.  The caller is
    /// responsible for holding the service lock.
    async fn call_with_retry<T, F, Fut>(
        &self,
        node_id: NodeId,
        kind: ServiceKind,
        request: &str,
        mut call: F,
    ) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let timeout = self.config.response_timeout();
        for attempt in 0..self.config.attempts() {
            let error = match tokio::time::timeout(timeout, call()).await {
                Ok(Ok(response)) => return Some(response),
                Ok(Err(e)) => e,
                Err(_) => TransportError::Timeout,
            };
            tracing::debug!(
                node_id = %node_id,
                service = %kind,
                request,
                attempt,
                error = %error,
                "service call failed"
            );
        }
        None
    }

    /// Discover every register of the remote node.
    ///
    /// Walks the list service from index 0 until an empty name, reading each
    /// listed register.  If a list call gets no answer after all attempts the
    /// node is assumed not to implement the register API and discovery stops
    /// early without error.  Registers found so far are kept either way.
    ///
    /// Returns the number of names listed.
    pub async fn discover(&self) -> Result<usize, RegistryError> {
        let node_id = self.require_remote_id()?;
        let started = Instant::now();
        let _list = self.locks.acquire(ServiceKind::List).await;

        let mut count = 0;
        let limit = self.config.list_index_limit() as usize;
        for index in (0..=u16::MAX).take(limit) {
            let request = ListRequest { index };
            let response = self
                .call_with_retry(node_id, ServiceKind::List, &format!("index {index}"), || {
                    self.client.list(node_id, request)
                })
                .await;

            let Some(response) = response else {
                tracing::info!(
                    node_id = %node_id,
                    index,
                    "node seems not to have the register API implemented"
                );
                TraceEvent::RegisterApiMissing {
                    node_id: node_id.0,
                    index,
                }
                .emit();
                return Ok(count);
            };
            if response.is_end_of_list() {
                break;
            }

            self.refresh_register(response.name).await?;
            count += 1;
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(node_id = %node_id, count, duration_ms, "registers discovered");
        for register in self.registers.read().iter() {
            tracing::debug!(node_id = %node_id, register = %register, "node has register");
        }
        TraceEvent::RegistersDiscovered {
            node_id: node_id.0,
            count,
            duration_ms,
        }
        .emit();
        Ok(count)
    }

    /// Read one wire name (`foo.bar`, `foo.bar<`, `foo.bar>` or `foo.bar=`)
    /// and merge the answer into the cache.
    ///
    /// The name goes out with its bytes unchanged; the cache is keyed by its
    /// lossy UTF-8 text.  An unanswered read is logged and otherwise ignored.
    pub async fn refresh_register(&self, name: impl Into<Name>) -> Result<(), RegistryError> {
        let node_id = self.require_remote_id()?;
        let request = AccessRequest::read(name);
        let text = request.name.to_string_lossy().into_owned();
        let name = text.as_str();

        let response = {
            let _access = self.locks.acquire(ServiceKind::Access).await;
            self.call_with_retry(node_id, ServiceKind::Access, name, || {
                self.client.access(node_id, request.clone())
            })
            .await
        };

        match response {
            Some(response) => {
                self.insert(name, response);
            }
            None => {
                tracing::info!(node_id = %node_id, register = %name, "access to register failed");
                TraceEvent::RegisterAccessFailed {
                    node_id: node_id.0,
                    register: name.to_string(),
                    attempts: self.config.attempts(),
                    write: false,
                }
                .emit();
            }
        }
        Ok(())
    }

    /// Read the value and all three shadow slots of register `name`.
    pub async fn refresh_register_full(&self, name: &str) -> Result<(), RegistryError> {
        let (base, _) = parse_wire_name(name);
        let names: Vec<String> = [Slot::Value, Slot::Min, Slot::Max, Slot::Default]
            .into_iter()
            .map(|slot| wire_name(base, slot))
            .collect();
        self.refresh_all(&names).await
    }

    /// Refresh several wire names concurrently.  Every read is attempted
    /// even if another fails.
    async fn refresh_all(&self, names: &[String]) -> Result<(), RegistryError> {
        let futs: Vec<_> = names.iter().map(|n| self.refresh_register(n.as_str())).collect();
        futures_util::future::join_all(futs)
            .await
            .into_iter()
            .collect()
    }

    /// Route a response to the slot its wire name addresses.
    ///
    /// Returns `false` if the response could not be attached to a register.
    fn insert(&self, name: &str, response: AccessResponse) -> bool {
        let (base, slot) = parse_wire_name(name);
        let mut registers = self.registers.write();
        if let Some(register) = registers.get_mut(base) {
            register.update(slot, response);
            return true;
        }
        match Register::new(base, slot, response) {
            Ok(register) => {
                tracing::debug!(register = %register, "new register");
                registers.insert(register);
                true
            }
            Err(e) => {
                tracing::warn!(register = %name, error = %e, "node reported no value for register");
                false
            }
        }
    }

    /// Write `value` to register `name` and reconcile the node's answer.
    ///
    /// Returns whether the value read back equals the requested one (a
    /// single-element array and its scalar compare equal).  An unanswered
    /// write returns `Ok(false)`.
    pub async fn set_value(
        &self,
        name: &str,
        value: impl Into<NativeValue>,
    ) -> Result<bool, RegistryError> {
        let node_id = self.require_remote_id()?;
        let codec = {
            let registers = self.registers.read();
            let register = registers
                .get(name)
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
            if !register.mutable() {
                return Err(RegistryError::Immutable(name.to_string()));
            }
            *register.codec()
        };

        let value: NativeValue = value.into();
        if value.is_none() {
            return Err(CodecError::TypeMismatch {
                dtype: codec.dtype(),
                found: value.kind_name(),
            }
            .into());
        }
        let value = codec.normalize(&value)?;
        let request = AccessRequest::write(name, codec.to_wire(&value)?);
        tracing::debug!(node_id = %node_id, register = %name, value = %value, "setting register");

        let response = {
            let _access = self.locks.acquire(ServiceKind::Access).await;
            self.call_with_retry(node_id, ServiceKind::Access, name, || {
                self.client.access(node_id, request.clone())
            })
            .await
        };

        let Some(response) = response else {
            tracing::error!(node_id = %node_id, register = %name, "access to register failed");
            TraceEvent::RegisterAccessFailed {
                node_id: node_id.0,
                register: name.to_string(),
                attempts: self.config.attempts(),
                write: true,
            }
            .emit();
            return Ok(false);
        };

        self.insert(name, response);
        let current = self.registers.read().get(name).map(|r| r.value());
        let success = matches!(&current, Some(Ok(v)) if value.matches(v));
        if success {
            tracing::info!(node_id = %node_id, register = %name, value = %value, "register set");
        } else {
            tracing::warn!(
                node_id = %node_id,
                register = %name,
                requested = %value,
                current = ?current,
                "setting register failed"
            );
        }
        TraceEvent::RegisterWritten {
            node_id: node_id.0,
            register: name.to_string(),
            success,
        }
        .emit();
        Ok(success)
    }

    // ── Mapping interface ────────────────────────────────────────────

    /// Cloned state of register `name`.
    pub fn get(&self, name: &str) -> Result<Register, RegistryError> {
        self.registers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Handle for the transport-backed operations of register `name`.
    pub fn register(&self, name: &str) -> Result<RegisterRef<'_>, RegistryError> {
        if !self.contains(name) {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        Ok(RegisterRef {
            registry: self,
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registers.read().get(name).is_some()
    }

    /// Drop register `name` from the cache (the node is not contacted).
    pub fn remove(&self, name: &str) -> Result<Register, RegistryError> {
        self.registers
            .write()
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// All cached registers, in the order they were first seen.
    pub fn registers(&self) -> Vec<Register> {
        self.registers.read().iter().cloned().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.registers
            .read()
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<RegisterSnapshot> {
        self.registers.read().iter().map(Register::snapshot).collect()
    }

    // ── Device-style helpers ─────────────────────────────────────────

    /// Current value of `name`, optionally re-read from the node first.
    pub async fn read(&self, name: &str, refresh: bool) -> Result<NativeValue, RegistryError> {
        if refresh {
            self.register(name)?.refresh().await?;
        }
        Ok(self.get(name)?.value()?)
    }

    /// Write `value` and return what the node reports afterwards.
    pub async fn write(
        &self,
        name: &str,
        value: impl Into<NativeValue>,
    ) -> Result<NativeValue, RegistryError> {
        self.set_value(name, value).await?;
        Ok(self.get(name)?.value()?)
    }

    /// Write the default value of `name` back to it.
    pub async fn reset(&self, name: &str) -> Result<bool, RegistryError> {
        self.register(name)?.reset_value().await
    }

    /// Change the node's identifier through its `uavcan.node.id` register
    /// and follow it.
    pub async fn set_node_id(&self, node_id: NodeId) -> Result<(), RegistryError> {
        if self.remote_id() == Some(node_id) {
            tracing::debug!(node_id = %node_id, "node ID is already set");
            return Ok(());
        }
        if self.set_value(NODE_ID_REGISTER, node_id.0).await? {
            self.set_remote_id(Some(node_id));
            Ok(())
        } else {
            Err(RegistryError::NodeIdRejected(node_id))
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("remote_id", &self.remote_id())
            .field("registers", &self.names())
            .finish()
    }
}

/// One register per line.
impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for register in self.registers.read().iter() {
            writeln!(f, "{register}")?;
        }
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RegisterRef
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Borrowed handle to one register of a [`Registry`].
///
/// Cached state is read through the registry on every call, so the handle
/// always reflects the latest merged responses.
#[derive(Debug, Clone)]
pub struct RegisterRef<'r> {
    registry: &'r Registry,
    name: String,
}

impl RegisterRef<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapshot(&self) -> Result<Register, RegistryError> {
        self.registry.get(&self.name)
    }

    pub fn value(&self) -> Result<NativeValue, RegistryError> {
        Ok(self.snapshot()?.value()?)
    }

    pub async fn set_value(&self, value: impl Into<NativeValue>) -> Result<bool, RegistryError> {
        self.registry.set_value(&self.name, value).await
    }

    /// Write the register's default value.
    pub async fn reset_value(&self) -> Result<bool, RegistryError> {
        let register = self.snapshot()?;
        if !register.has_default() {
            tracing::warn!(register = %self.name, "register has no default value, reset has no effect");
            return Err(RegistryError::NoDefault(self.name.clone()));
        }
        let default = register.default_value()?;
        self.set_value(default).await
    }

    /// Re-read the value and every shadow slot currently present.
    pub async fn refresh(&self) -> Result<(), RegistryError> {
        let register = self.snapshot()?;
        let mut names = vec![self.name.clone()];
        names.extend(
            Slot::SHADOWS
                .into_iter()
                .filter(|slot| register.has_slot(*slot))
                .map(|slot| wire_name(&self.name, slot)),
        );
        self.registry.refresh_all(&names).await
    }

    /// Run `body` with the register temporarily set to `value`.
    ///
    /// The previous value is written back when `body` completes, returns an
    /// error, or panics.  If the temporary value is not accepted, `body` is
    /// not run.  A failed restore is reported after `body`'s own outcome is
    /// settled: it replaces a successful result, and a panic from `body` is
    /// resumed after the restore attempt.
    pub async fn with_temporary_value<F, T>(
        &self,
        value: impl Into<NativeValue>,
        body: F,
    ) -> Result<T, RegistryError>
    where
        F: Future<Output = T>,
    {
        let previous = self.value()?;
        if !self.set_value(value).await? {
            return Err(RegistryError::TemporaryValueRejected(self.name.clone()));
        }

        let outcome = AssertUnwindSafe(body).catch_unwind().await;

        let restored = match self.set_value(previous).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(RegistryError::RestoreFailed(self.name.clone())),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(output) => restored.map(|()| output),
            Err(panic) => {
                if let Err(e) = &restored {
                    tracing::error!(register = %self.name, error = %e, "restore after panic failed");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Caller-facing failures of registry operations.
///
/// Unanswered calls are not errors: reads degrade to "no data" and writes
/// return `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("remote node ID is not set")]
    NoRemoteIdentifier,

    #[error("register not found: {0}")]
    NotFound(String),

    #[error("{0} is immutable and thus may not be written to")]
    Immutable(String),

    #[error("{0} has no default value")]
    NoDefault(String),

    #[error("register value: {0}")]
    Codec(#[from] CodecError),

    #[error("temporary value for {0} was not accepted")]
    TemporaryValueRejected(String),

    #[error("failed to restore previous value of {0}")]
    RestoreFailed(String),

    #[error("node did not accept node ID {0}")]
    NodeIdRejected(NodeId),
}

impl From<RegistryError> for cyd_domain::error::Error {
    fn from(e: RegistryError) -> Self {
        cyd_domain::error::Error::Registry(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryNode;
    use cyd_protocol::WireValue;

    fn node() -> Arc<MemoryNode> {
        Arc::new(
            MemoryNode::new(5)
                .with_register("a.b", WireValue::Natural8(vec![1]), true, true)
                .with_register("a.c", WireValue::String(b"hi".to_vec()), false, true)
                .with_register("a.b<", WireValue::Natural8(vec![0]), false, true),
        )
    }

    #[tokio::test]
    async fn operations_require_remote_id() {
        let registry = Registry::new(None, node());
        assert!(matches!(
            registry.discover().await,
            Err(RegistryError::NoRemoteIdentifier)
        ));
        assert!(matches!(
            registry.refresh_register("a.b").await,
            Err(RegistryError::NoRemoteIdentifier)
        ));
        assert!(matches!(
            registry.set_value("a.b", 1u8).await,
            Err(RegistryError::NoRemoteIdentifier)
        ));
    }

    #[tokio::test]
    async fn discovery_keeps_first_seen_order() {
        let registry = Registry::new(Some(NodeId(5)), node());
        assert_eq!(registry.discover().await.unwrap(), 3);
        assert_eq!(registry.names(), vec!["a.b", "a.c"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("a.b").unwrap().has_min());
    }

    #[tokio::test]
    async fn lookup_of_unknown_name_fails() {
        let registry = Registry::new(Some(NodeId(5)), node());
        assert!(matches!(registry.get("x.y"), Err(RegistryError::NotFound(_))));
        assert!(matches!(registry.register("x.y"), Err(RegistryError::NotFound(_))));
        assert!(!registry.contains("x.y"));
    }

    #[tokio::test]
    async fn remove_drops_from_cache_only() {
        let n = node();
        let registry = Registry::new(Some(NodeId(5)), n.clone());
        registry.discover().await.unwrap();
        let calls = n.calls().len();

        let removed = registry.remove("a.b").unwrap();
        assert_eq!(removed.name(), "a.b");
        assert!(!registry.contains("a.b"));
        assert_eq!(registry.names(), vec!["a.c"]);
        assert!(matches!(registry.remove("a.b"), Err(RegistryError::NotFound(_))));
        assert_eq!(n.calls().len(), calls);
    }

    #[tokio::test]
    async fn refresh_of_unknown_register_inserts_nothing() {
        let registry = Registry::new(Some(NodeId(5)), node());
        registry.refresh_register("no.such").await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn refresh_register_full_reads_every_slot() {
        let n = node();
        let registry = Registry::new(Some(NodeId(5)), n.clone());
        registry.refresh_register_full("a.b").await.unwrap();
        assert_eq!(n.call_count(ServiceKind::Access), 4);
        let reg = registry.get("a.b").unwrap();
        assert_eq!(reg.min().unwrap(), NativeValue::Integer(0));
        assert!(!reg.has_max());
        assert!(!reg.has_default());
    }

    #[tokio::test]
    async fn shape_errors_surface_before_any_call() {
        let n = node();
        let registry = Registry::new(Some(NodeId(5)), n.clone());
        registry.discover().await.unwrap();
        let before = n.call_count(ServiceKind::Access);

        let err = registry.set_value("a.b", vec![1u16, 2]).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Codec(CodecError::LengthMismatch { expected: 1, found: 2 })
        ));
        assert_eq!(n.call_count(ServiceKind::Access), before);
    }

    #[tokio::test]
    async fn writing_none_fails_before_any_call() {
        let n = node();
        let registry = Registry::new(Some(NodeId(5)), n.clone());
        registry.discover().await.unwrap();
        let before = n.calls().len();

        let err = registry.set_value("a.b", NativeValue::None).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Codec(CodecError::TypeMismatch { found: "none", .. })
        ));
        assert_eq!(n.calls().len(), before);
    }

    #[tokio::test]
    async fn write_helper_returns_authoritative_value() {
        let registry = Registry::new(Some(NodeId(5)), node());
        registry.discover().await.unwrap();
        let v = registry.write("a.b", 9u8).await.unwrap();
        assert_eq!(v, NativeValue::Integer(9));
        assert_eq!(registry.read("a.b", true).await.unwrap(), NativeValue::Integer(9));
    }

    #[tokio::test]
    async fn reset_without_default_fails() {
        let registry = Registry::new(Some(NodeId(5)), node());
        registry.discover().await.unwrap();
        assert!(matches!(
            registry.reset("a.b").await,
            Err(RegistryError::NoDefault(_))
        ));
    }

    #[tokio::test]
    async fn display_lists_every_register() {
        let registry = Registry::new(Some(NodeId(5)), node());
        registry.discover().await.unwrap();
        let text = registry.to_string();
        assert!(text.contains("natural8[1] a.b: value=1, min=0, mutable=true, persistent=true"));
        assert!(text.contains("string a.c: value=hi, mutable=false, persistent=true"));
    }

    #[tokio::test]
    async fn repointing_changes_target() {
        let registry = Registry::new(Some(NodeId(6)), node());
        registry.discover().await.unwrap();
        assert!(registry.is_empty());

        registry.set_remote_id(Some(NodeId(5)));
        assert_eq!(registry.remote_id(), Some(NodeId(5)));
        registry.discover().await.unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registry_error_converts_to_domain_error() {
        let e: cyd_domain::error::Error = RegistryError::Immutable("a.c".into()).into();
        assert!(matches!(e, cyd_domain::error::Error::Registry(_)));
        assert!(e.to_string().contains("a.c is immutable"));
    }
}
