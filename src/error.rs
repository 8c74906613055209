//! Error types for cache operations.
//!
//! Everything below the facade propagates `Result<T>` with `?`. The facade
//! boundary is where errors stop: there they are logged and replaced with the
//! operation's fallback value, never surfaced to the caller.

use std::fmt;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures a cache backend can surface.
///
/// At the facade boundary all of these collapse into a single "backend
/// unavailable" outcome; the distinction only matters for log output and for
/// code driving a backend directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend unreachable or a command failed (network, auth, node down).
    BackendError(String),
    /// Value could not be encoded for storage.
    SerializationError(String),
    /// Stored payload could not be decoded into the requested type.
    DeserializationError(String),
    /// Invalid backend configuration.
    ConfigError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "backend error: {}", msg),
            Error::SerializationError(msg) => write!(f, "serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "deserialization error: {}", msg),
            Error::ConfigError(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
