//! `cyd-registry` — client-side register registry for Cyphal nodes.
//!
//! This crate provides:
//! - A `Registry` that discovers every register of one remote node through
//!   the List and Access services and keeps a timestamp-merged cache.
//! - Typed reads and writes through `NativeValue`, checked against each
//!   register's wire type by `ValueCodec`.
//! - The `ServiceClient` transport seam and `MemoryNode`, an in-process node
//!   for tests and simulations.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cyd_registry::{Registry, NativeValue};
//!
//! let registry = Registry::new(Some(NodeId(5)), client);
//! registry.discover().await?;
//!
//! let brightness = registry.register("navlight.brightness")?;
//! brightness.with_temporary_value(50u16, async {
//!     // run a test with the light dimmed
//! }).await?;
//! ```

pub mod codec;
pub mod locks;
pub mod memory;
pub mod register;
pub mod registry;
pub mod transport;

// Re-exports for convenience.
pub use codec::{CodecError, NativeValue, ValueCodec};
pub use memory::{MemoryEntry, MemoryNode, RecordedCall};
pub use register::{Register, RegisterSnapshot};
pub use registry::{RegisterRef, Registry, RegistryError};
pub use transport::{ServiceClient, TransportError};
