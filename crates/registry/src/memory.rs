//! In-process register server implementing [`ServiceClient`].
//!
//! A `MemoryNode` behaves like one remote node that serves the List and
//! Access services from a table of registers.  It records every call it
//! receives and can be told to drop calls, which makes it the transport of
//! choice for exercising a [`Registry`](crate::Registry) without a bus.

use std::time::Duration;

use async_trait::async_trait;
use cyd_protocol::{
    AccessRequest, AccessResponse, ListRequest, ListResponse, Name, NodeId, ServiceKind,
    Timestamp, WireValue, NODE_ID_REGISTER,
};
use parking_lot::Mutex;

use crate::transport::{ServiceClient, TransportError};

/// One register (or shadow slot) served by a [`MemoryNode`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub value: WireValue,
    pub mutable: bool,
    pub persistent: bool,
}

/// A call received by a [`MemoryNode`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    List { remote: NodeId, index: u16 },
    Access { remote: NodeId, name: String, value: WireValue },
}

impl RecordedCall {
    pub fn kind(&self) -> ServiceKind {
        match self {
            RecordedCall::List { .. } => ServiceKind::List,
            RecordedCall::Access { .. } => ServiceKind::Access,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, RecordedCall::Access { value, .. } if !value.is_empty())
    }
}

#[derive(Debug, Default)]
struct Traffic {
    in_flight: usize,
    peak: usize,
    drop_next: usize,
}

#[derive(Debug)]
struct NodeState {
    node_id: NodeId,
    /// Wire names in list order.
    entries: Vec<(String, MemoryEntry)>,
    clock_us: u64,
    unresponsive: bool,
    calls: Vec<RecordedCall>,
    list: Traffic,
    access: Traffic,
}

impl NodeState {
    fn traffic(&mut self, kind: ServiceKind) -> &mut Traffic {
        match kind {
            ServiceKind::List => &mut self.list,
            ServiceKind::Access => &mut self.access,
        }
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut MemoryEntry> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }

    fn tick(&mut self) -> Timestamp {
        self.clock_us += 1;
        Timestamp::from_micros(self.clock_us)
    }
}

/// Simulated remote node serving registers from memory.
pub struct MemoryNode {
    state: Mutex<NodeState>,
    latency: Duration,
}

impl MemoryNode {
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Self {
            state: Mutex::new(NodeState {
                node_id: node_id.into(),
                entries: Vec::new(),
                clock_us: 0,
                unresponsive: false,
                calls: Vec::new(),
                list: Traffic::default(),
                access: Traffic::default(),
            }),
            latency: Duration::ZERO,
        }
    }

    /// Add a register (or a `<`/`>`/`=` shadow) at the end of the list.
    pub fn with_register(
        self,
        wire_name: impl Into<String>,
        value: WireValue,
        mutable: bool,
        persistent: bool,
    ) -> Self {
        self.state.lock().entries.push((
            wire_name.into(),
            MemoryEntry {
                value,
                mutable,
                persistent,
            },
        ));
        self
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn node_id(&self) -> NodeId {
        self.state.lock().node_id
    }

    /// Stop (or resume) answering any call.
    pub fn set_unresponsive(&self, unresponsive: bool) {
        self.state.lock().unresponsive = unresponsive;
    }

    /// Silently drop the next `count` calls of `kind`.
    pub fn drop_next(&self, kind: ServiceKind, count: usize) {
        self.state.lock().traffic(kind).drop_next = count;
    }

    /// Change a register on the device side, bypassing the mutable flag.
    pub fn set_entry_value(&self, wire_name: &str, value: WireValue) {
        if let Some(entry) = self.state.lock().entry_mut(wire_name) {
            entry.value = value;
        }
    }

    pub fn entry(&self, wire_name: &str) -> Option<MemoryEntry> {
        self.state.lock().entry_mut(wire_name).map(|e| e.clone())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, kind: ServiceKind) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.kind() == kind)
            .count()
    }

    /// Write calls received, as `(name, value)`.
    pub fn writes(&self) -> Vec<(String, WireValue)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.is_write())
            .filter_map(|c| match c {
                RecordedCall::Access { name, value, .. } => Some((name.clone(), value.clone())),
                RecordedCall::List { .. } => None,
            })
            .collect()
    }

    /// Highest number of overlapping calls of `kind` observed so far.
    pub fn peak_concurrency(&self, kind: ServiceKind) -> usize {
        self.state.lock().traffic(kind).peak
    }

    /// Record the call and decide whether it gets an answer.
    fn admit(&self, remote: NodeId, call: RecordedCall) -> Result<InFlight<'_>, TransportError> {
        let mut state = self.state.lock();
        let kind = call.kind();
        state.calls.push(call);
        if state.unresponsive || remote != state.node_id {
            return Err(TransportError::Timeout);
        }
        let traffic = state.traffic(kind);
        if traffic.drop_next > 0 {
            traffic.drop_next -= 1;
            return Err(TransportError::Timeout);
        }
        traffic.in_flight += 1;
        traffic.peak = traffic.peak.max(traffic.in_flight);
        Ok(InFlight { node: self, kind })
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn serve_access(&self, request: &AccessRequest) -> AccessResponse {
        let mut state = self.state.lock();
        let timestamp = state.tick();
        let name = request.name.to_string_lossy().into_owned();

        let mut new_node_id = None;
        let Some(entry) = state.entry_mut(&name) else {
            return AccessResponse {
                timestamp,
                mutable: false,
                persistent: false,
                value: WireValue::Empty,
            };
        };

        if request.is_write()
            && entry.mutable
            && request.value.kind() == entry.value.kind()
            && request.value.len() == entry.value.len()
        {
            entry.value = request.value.clone();
            if name == NODE_ID_REGISTER {
                if let WireValue::Natural16(ids) = &entry.value {
                    new_node_id = ids.first().copied().map(NodeId);
                }
            }
        }

        let response = AccessResponse {
            timestamp,
            mutable: entry.mutable,
            persistent: entry.persistent,
            value: entry.value.clone(),
        };
        if let Some(id) = new_node_id {
            state.node_id = id;
        }
        response
    }
}

/// Counts a call as in flight until dropped, including on cancellation.
struct InFlight<'a> {
    node: &'a MemoryNode,
    kind: ServiceKind,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.node.state.lock().traffic(self.kind).in_flight -= 1;
    }
}

#[async_trait]
impl ServiceClient for MemoryNode {
    async fn list(&self, remote: NodeId, request: ListRequest) -> Result<ListResponse, TransportError> {
        let _in_flight = self.admit(
            remote,
            RecordedCall::List {
                remote,
                index: request.index,
            },
        )?;
        let response = {
            let state = self.state.lock();
            state
                .entries
                .get(usize::from(request.index))
                .map(|(name, _)| ListResponse {
                    name: Name::from(name.as_str()),
                })
                .unwrap_or_else(ListResponse::end_of_list)
        };
        self.delay().await;
        Ok(response)
    }

    async fn access(
        &self,
        remote: NodeId,
        request: AccessRequest,
    ) -> Result<AccessResponse, TransportError> {
        let _in_flight = self.admit(
            remote,
            RecordedCall::Access {
                remote,
                name: request.name.to_string_lossy().into_owned(),
                value: request.value.clone(),
            },
        )?;
        let response = self.serve_access(&request);
        self.delay().await;
        Ok(response)
    }
}
