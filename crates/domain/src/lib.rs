//! `cyd-domain` — types shared by every crate of the device library:
//! configuration, structured trace events and the umbrella error type.

pub mod config;
pub mod error;
pub mod trace;
