//! Cache backend abstraction and implementations.
//!
//! Backends own everything the facade does not: connections, pooling, wire
//! protocol, topology. The facade hands them raw text or already-encoded
//! bytes and expects plain `Result`s back; no fallback logic lives here.

#[cfg(feature = "inmemory")]
mod inmemory;
#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryBackend;
#[cfg(feature = "redis")]
pub use redis::{PoolSettings, RedisBackend, RedisConfig, Topology};

use crate::error::Result;
use std::collections::HashSet;
use std::time::Duration;

/// Capability the facade consumes. Every call may fail; the facade decides
/// what failure means to its own callers.
///
/// Text and structured values travel on distinct paths so a backend can keep
/// plain strings human-readable (the Redis backend stores both as-is; the
/// distinction matters for backends with typed storage).
///
/// TTL, where given, must be applied atomically with the write; a backend
/// must not issue a separate expire call.
#[allow(async_fn_in_trait)]
pub trait CacheBackend: Send + Sync {
    /// Store a plain text value, optionally with an expiry.
    async fn set_text(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Store an encoded structured value, optionally with an expiry.
    async fn set_structured(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Fetch a plain text value. `Ok(None)` means absent.
    async fn get_text(&self, key: &str) -> Result<Option<String>>;

    /// Fetch an encoded structured value. `Ok(None)` means absent.
    async fn get_structured(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove an entry. Deleting an absent key is a no-op, not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Store an encoded value under `field` within the hash at `key`.
    async fn hash_put(&self, key: &str, field: &str, value: Vec<u8>) -> Result<()>;

    /// Fetch the value under `field` within the hash at `key`.
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>>;

    /// Return all live keys whose names match a glob-style `pattern`.
    ///
    /// Pattern semantics are backend-defined (Redis `KEYS` style). Cost is
    /// unbounded on large keyspaces; callers are expected to use narrow
    /// patterns.
    async fn keys_matching(&self, pattern: &str) -> Result<HashSet<String>>;
}
