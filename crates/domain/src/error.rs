/// Shared error type used across the device library crates.
///
/// Crate-specific errors convert into it with `From`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("transport: {0}")]
    Transport(String),

    #[error("registry: {0}")]
    Registry(String),
}
