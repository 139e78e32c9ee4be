//! Register protocol: the wire-level types of the Cyphal register services.
//!
//! Two services are used by a client that manages a remote node's registers:
//!
//! - **List** (`uavcan.register.List`): enumerate register names by index.
//!   An empty name in the response marks the end of the list.
//! - **Access** (`uavcan.register.Access`): read a register by name (request
//!   value left empty) or write it (request value set).  The response always
//!   carries the authoritative post-access state.
//!
//! Transport concerns (CAN/UDP framing, priorities, transfer reassembly) are
//! not modelled here; a transport only has to move these structs.

pub mod name;
pub mod value;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use name::{follows_naming_convention, parse_wire_name, wire_name, Name, Slot};
pub use value::{ValueKind, WireValue};

/// Register name that carries the node's own identifier.
pub const NODE_ID_REGISTER: &str = "uavcan.node.id";

/// Address of a node on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u16);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for NodeId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

/// Device-reported synchronized time, in microseconds.
///
/// Zero means "unknown" and is treated as authoritative when merging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub microsecond: u64,
}

impl Timestamp {
    pub const UNKNOWN: Timestamp = Timestamp { microsecond: 0 };

    pub fn from_micros(microsecond: u64) -> Self {
        Self { microsecond }
    }

    pub fn is_unknown(&self) -> bool {
        self.microsecond == 0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.microsecond as f64 * 1e-6
    }
}

/// The two register services, used to key per-service call serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    List,
    Access,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::List => f.write_str("uavcan.register.List"),
            ServiceKind::Access => f.write_str("uavcan.register.Access"),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// List service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListResponse {
    /// Empty once `index` is past the last register.
    pub name: Name,
}

impl ListResponse {
    pub fn end_of_list() -> Self {
        Self::default()
    }

    pub fn is_end_of_list(&self) -> bool {
        self.name.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Access service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub name: Name,
    /// `Empty` reads; anything else writes.
    pub value: WireValue,
}

impl AccessRequest {
    pub fn read(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            value: WireValue::Empty,
        }
    }

    pub fn write(name: impl Into<Name>, value: WireValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn is_write(&self) -> bool {
        !self.value.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccessResponse {
    pub timestamp: Timestamp,
    pub mutable: bool,
    pub persistent: bool,
    /// `Empty` if the register does not exist.
    pub value: WireValue,
}
