//! Fail-open cache facade - main entry point for cache operations.

use crate::backend::CacheBackend;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

/// Failure-tolerant access surface over a cache backend.
///
/// Every operation is wrapped so that a backend failure is logged and
/// replaced with a default (`None`, empty set, or silent no-op) instead of
/// surfacing to the caller. The facade never errors, never retries, and
/// never panics on backend trouble: a cache outage degrades reads to misses
/// and writes to no-ops. The price of that contract is ambiguity: callers
/// cannot tell "absent" from "backend down" and must treat both as a miss.
///
/// Value-type dispatch is explicit at the call site: `set_text`/`get_text`
/// take the plain-string path, `set`/`get` serialize through JSON. There is
/// no runtime type inspection.
///
/// The facade is stateless apart from the backend handle and safe to share
/// across tasks whenever the backend is. It never closes the backend; that
/// lifecycle belongs to the hosting process.
///
/// # Example
///
/// ```
/// # use cache_guard::{CacheFacade, backend::InMemoryBackend};
/// # async fn example() {
/// let cache = CacheFacade::new(InMemoryBackend::new());
///
/// cache.set_text("user:1", "alice", None).await;
/// assert_eq!(cache.get_text("user:1").await.as_deref(), Some("alice"));
/// # }
/// ```
pub struct CacheFacade<B: CacheBackend> {
    backend: B,
}

impl<B: CacheBackend> CacheFacade<B> {
    /// Create a facade over the given backend handle.
    pub fn new(backend: B) -> Self {
        CacheFacade { backend }
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run a backend call; on failure log it and return `fallback`.
    ///
    /// `noun` names the identifier in the log line ("key" or "pattern");
    /// `detail` carries the written value for mutation ops so the log line
    /// records what was lost.
    async fn guard<T>(
        op: &str,
        noun: &str,
        id: &str,
        detail: Option<&str>,
        fallback: T,
        call: impl Future<Output = Result<T>>,
    ) -> T {
        match call.await {
            Ok(value) => value,
            Err(e) => {
                match detail {
                    Some(d) => error!(
                        "✗ backend {} failed for {}:{}, value:{} ({}), using fallback",
                        op, noun, id, d, e
                    ),
                    None => error!(
                        "✗ backend {} failed for {}:{} ({}), using fallback",
                        op, noun, id, e
                    ),
                }
                fallback
            }
        }
    }

    /// Store a plain text value, optionally with an expiry.
    ///
    /// The text path bypasses structured serialization entirely. An empty
    /// key is logged and skipped. On backend failure the call completes
    /// silently after logging.
    pub async fn set_text(&self, key: &str, value: &str, ttl: Option<Duration>) {
        if key.is_empty() {
            warn!("SET skipped: empty key");
            return;
        }
        debug!("» SET (text) called for key:{}", key);
        Self::guard(
            "SET",
            "key",
            key,
            Some(value),
            (),
            self.backend.set_text(key, value, ttl),
        )
        .await
    }

    /// Store a structured value via the JSON path, optionally with an expiry.
    ///
    /// A value that fails to serialize is handled like any backend failure:
    /// logged and swallowed. On backend failure the call completes silently
    /// after logging.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        if key.is_empty() {
            warn!("SET skipped: empty key");
            return;
        }
        debug!("» SET (structured) called for key:{}", key);
        let payload = match serde_json::to_vec(value) {
            Ok(payload) => payload,
            Err(e) => {
                error!("✗ backend SET failed for key:{}: value not serializable ({})", key, e);
                return;
            }
        };
        let rendered = String::from_utf8_lossy(&payload).into_owned();
        Self::guard(
            "SET",
            "key",
            key,
            Some(&rendered),
            (),
            self.backend.set_structured(key, payload, ttl),
        )
        .await
    }

    /// Fetch a plain text value.
    ///
    /// Returns `None` when the key is absent, and also when the backend
    /// call fails; the two are indistinguishable by design.
    pub async fn get_text(&self, key: &str) -> Option<String> {
        debug!("» GET (text) called for key:{}", key);
        Self::guard("GET", "key", key, None, None, self.backend.get_text(key)).await
    }

    /// Fetch a structured value and decode it as `T`.
    ///
    /// A stored payload that does not decode to `T` is a caller error: the
    /// wrong `T` was requested for what lives under the key. It is logged
    /// distinctly and yields `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        debug!("» GET (structured) called for key:{}", key);
        let bytes =
            Self::guard("GET", "key", key, None, None, self.backend.get_structured(key)).await?;
        decode(key, &bytes)
    }

    /// Remove an entry. Idempotent: deleting an absent key is a no-op.
    pub async fn delete(&self, key: &str) {
        debug!("» DEL called for key:{}", key);
        Self::guard("DEL", "key", key, None, (), self.backend.delete(key)).await
    }

    /// Store a value under `field` within the hash at `key`.
    ///
    /// A `None` field or value makes the whole call a silent no-op: no
    /// backend mutation and no error.
    pub async fn hash_put<T: Serialize>(&self, key: &str, field: Option<&str>, value: Option<&T>) {
        let (Some(field), Some(value)) = (field, value) else {
            debug!("HSET skipped for key:{}: field or value absent", key);
            return;
        };
        debug!("» HSET called for key:{}, field:{}", key, field);
        let payload = match serde_json::to_vec(value) {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    "✗ backend HSET failed for key:{}, field:{}: value not serializable ({})",
                    key, field, e
                );
                return;
            }
        };
        let rendered = String::from_utf8_lossy(&payload).into_owned();
        Self::guard(
            "HSET",
            "key",
            key,
            Some(&rendered),
            (),
            self.backend.hash_put(key, field, payload),
        )
        .await
    }

    /// Fetch and decode the value under `field` within the hash at `key`.
    ///
    /// A `None` field short-circuits to `None` without touching the backend.
    pub async fn hash_get<T: DeserializeOwned>(&self, key: &str, field: Option<&str>) -> Option<T> {
        let field = field?;
        debug!("» HGET called for key:{}, field:{}", key, field);
        let bytes = Self::guard(
            "HGET",
            "key",
            key,
            None,
            None,
            self.backend.hash_get(key, field),
        )
        .await?;
        decode(key, &bytes)
    }

    /// Return all keys matching a backend-defined glob `pattern`.
    ///
    /// Unbounded cost on large keyspaces; use narrow patterns. On backend
    /// failure returns an empty set, indistinguishable from zero matches.
    pub async fn keys_matching(&self, pattern: &str) -> HashSet<String> {
        debug!("» KEYS called for pattern:{}", pattern);
        Self::guard(
            "KEYS",
            "pattern",
            pattern,
            None,
            HashSet::new(),
            self.backend.keys_matching(pattern),
        )
        .await
    }
}

fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Option<T> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            error!(
                "✗ Stored value for key:{} does not decode to the requested type ({})",
                key, e
            );
            None
        }
    }
}
