//! In-memory cache backend implementation.
//!
//! Process-local backend backed by DashMap. Useful for tests and for
//! deployments that want the facade contract without an external store.
//! Expiry is lazy: entries past their deadline are dropped when touched.

use super::CacheBackend;
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
enum Slot {
    Value(Vec<u8>),
    Hash(HashMap<String, Vec<u8>>),
}

#[derive(Clone, Debug)]
struct Entry {
    slot: Slot,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Thread-safe in-memory backend with TTL support.
///
/// Mirrors Redis keyspace semantics where they are observable through the
/// [`CacheBackend`] trait: string and hash slots share one keyspace, a plain
/// write replaces a hash outright, and a hash operation against a string slot
/// fails with a wrong-type error.
///
/// # Example
///
/// ```
/// # use cache_guard::backend::{InMemoryBackend, CacheBackend};
/// # async fn example() -> cache_guard::Result<()> {
/// let backend = InMemoryBackend::new();
/// backend.set_text("greeting", "hello", None).await?;
/// assert_eq!(backend.get_text("greeting").await?.as_deref(), Some("hello"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    entries: Arc<DashMap<String, Entry>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        InMemoryBackend {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        self.entries.retain(|_, e| !e.expired());
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    fn purge_if_expired(&self, key: &str) {
        self.entries.remove_if(key, |_, e| e.expired());
    }

    fn store(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        // Sub-millisecond TTLs round down to "no expiry", same as the Redis
        // backend's PX handling of them.
        let ttl = ttl.filter(|d| d.as_millis() > 0);
        let entry = Entry {
            slot: Slot::Value(value),
            expires_at: ttl.map(|d| Instant::now() + d),
        };
        self.entries.insert(key.to_string(), entry);
        if let Some(d) = ttl {
            debug!("✓ inmemory SET {} (TTL: {:?})", key, d);
        } else {
            debug!("✓ inmemory SET {}", key);
        }
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.purge_if_expired(key);
        match self.entries.get(key) {
            Some(entry) => match &entry.slot {
                Slot::Value(bytes) => Ok(Some(bytes.clone())),
                Slot::Hash(_) => Err(wrong_type(key)),
            },
            None => Ok(None),
        }
    }
}

fn wrong_type(key: &str) -> Error {
    Error::BackendError(format!(
        "WRONGTYPE operation against key {} holding the wrong kind of value",
        key
    ))
}

impl CacheBackend for InMemoryBackend {
    async fn set_text(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.store(key, value.as_bytes().to_vec(), ttl);
        Ok(())
    }

    async fn set_structured(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.store(key, value, ttl);
        Ok(())
    }

    async fn get_text(&self, key: &str) -> Result<Option<String>> {
        match self.load(key)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| Error::DeserializationError(format!("key {}: {}", key, e))),
            None => Ok(None),
        }
    }

    async fn get_structured(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.load(key)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        debug!("✓ inmemory DEL {}", key);
        Ok(())
    }

    async fn hash_put(&self, key: &str, field: &str, value: Vec<u8>) -> Result<()> {
        self.purge_if_expired(key);
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            slot: Slot::Hash(HashMap::new()),
            expires_at: None,
        });
        match &mut entry.slot {
            Slot::Hash(map) => {
                map.insert(field.to_string(), value);
                debug!("✓ inmemory HSET {} {}", key, field);
                Ok(())
            }
            Slot::Value(_) => Err(wrong_type(key)),
        }
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        self.purge_if_expired(key);
        match self.entries.get(key) {
            Some(entry) => match &entry.slot {
                Slot::Hash(map) => Ok(map.get(field).cloned()),
                Slot::Value(_) => Err(wrong_type(key)),
            },
            None => Ok(None),
        }
    }

    async fn keys_matching(&self, pattern: &str) -> Result<HashSet<String>> {
        self.entries.retain(|_, e| !e.expired());
        let keys = self
            .entries
            .iter()
            .filter(|entry| glob_match(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect::<HashSet<_>>();
        debug!("✓ inmemory KEYS {} -> {} match(es)", pattern, keys.len());
        Ok(keys)
    }
}

/// Redis-style glob matching over `*` (any run) and `?` (any single char).
///
/// Character classes are not supported; a pattern without wildcards is an
/// exact match.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star_pi, star_ti)) = backtrack {
            // Last `*` swallows one more character and we retry.
            pi = star_pi + 1;
            ti = star_ti + 1;
            backtrack = Some((star_pi, star_ti + 1));
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_text_round_trip() {
        let backend = InMemoryBackend::new();
        backend
            .set_text("user:1", "alice", None)
            .await
            .expect("set failed");

        let value = backend.get_text("user:1").await.expect("get failed");
        assert_eq!(value.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_structured_round_trip() {
        let backend = InMemoryBackend::new();
        backend
            .set_structured("doc:1", b"{\"age\":30}".to_vec(), None)
            .await
            .expect("set failed");

        let value = backend.get_structured("doc:1").await.expect("get failed");
        assert_eq!(value, Some(b"{\"age\":30}".to_vec()));
    }

    #[tokio::test]
    async fn test_get_absent_key() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.get_text("missing").await.expect("get failed"), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let backend = InMemoryBackend::new();
        backend.set_text("k", "one", None).await.expect("set failed");
        backend.set_text("k", "two", None).await.expect("set failed");
        assert_eq!(
            backend.get_text("k").await.expect("get failed").as_deref(),
            Some("two")
        );
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let backend = InMemoryBackend::new();
        backend
            .set_text("ephemeral", "gone soon", Some(Duration::from_millis(30)))
            .await
            .expect("set failed");

        assert!(backend
            .get_text("ephemeral")
            .await
            .expect("get failed")
            .is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(
            backend.get_text("ephemeral").await.expect("get failed"),
            None
        );
        assert_eq!(backend.len(), 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_a_plain_write() {
        let backend = InMemoryBackend::new();
        backend
            .set_text("k", "v", Some(Duration::ZERO))
            .await
            .expect("set failed");
        assert_eq!(
            backend.get_text("k").await.expect("get failed").as_deref(),
            Some("v")
        );

        backend
            .set_structured("j", b"1".to_vec(), Some(Duration::from_micros(200)))
            .await
            .expect("set failed");
        assert!(backend
            .get_structured("j")
            .await
            .expect("get failed")
            .is_some());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = InMemoryBackend::new();
        backend.set_text("k", "v", None).await.expect("set failed");
        backend.delete("k").await.expect("delete failed");
        backend.delete("k").await.expect("second delete failed");
        assert_eq!(backend.get_text("k").await.expect("get failed"), None);
    }

    #[tokio::test]
    async fn test_hash_round_trip() {
        let backend = InMemoryBackend::new();
        backend
            .hash_put("session:1", "user", b"\"alice\"".to_vec())
            .await
            .expect("hash_put failed");

        let value = backend
            .hash_get("session:1", "user")
            .await
            .expect("hash_get failed");
        assert_eq!(value, Some(b"\"alice\"".to_vec()));

        let absent = backend
            .hash_get("session:1", "other")
            .await
            .expect("hash_get failed");
        assert_eq!(absent, None);
    }

    #[tokio::test]
    async fn test_hash_against_string_slot_is_wrong_type() {
        let backend = InMemoryBackend::new();
        backend.set_text("k", "v", None).await.expect("set failed");

        let err = backend
            .hash_put("k", "field", b"v".to_vec())
            .await
            .expect_err("expected wrong-type error");
        assert!(err.to_string().contains("WRONGTYPE"));

        let err = backend
            .hash_get("k", "field")
            .await
            .expect_err("expected wrong-type error");
        assert!(err.to_string().contains("WRONGTYPE"));
    }

    #[tokio::test]
    async fn test_get_against_hash_slot_is_wrong_type() {
        let backend = InMemoryBackend::new();
        backend
            .hash_put("h", "f", b"v".to_vec())
            .await
            .expect("hash_put failed");

        let err = backend
            .get_text("h")
            .await
            .expect_err("expected wrong-type error");
        assert!(err.to_string().contains("WRONGTYPE"));
    }

    #[tokio::test]
    async fn test_plain_set_replaces_hash() {
        let backend = InMemoryBackend::new();
        backend
            .hash_put("k", "f", b"v".to_vec())
            .await
            .expect("hash_put failed");
        backend.set_text("k", "plain", None).await.expect("set failed");
        assert_eq!(
            backend.get_text("k").await.expect("get failed").as_deref(),
            Some("plain")
        );
    }

    #[tokio::test]
    async fn test_keys_matching() {
        let backend = InMemoryBackend::new();
        backend.set_text("user:1", "a", None).await.expect("set failed");
        backend.set_text("user:2", "b", None).await.expect("set failed");
        backend.set_text("order:1", "c", None).await.expect("set failed");

        let keys = backend.keys_matching("user:*").await.expect("keys failed");
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("user:1"));
        assert!(keys.contains("user:2"));

        let all = backend.keys_matching("*").await.expect("keys failed");
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_keys_matching_skips_expired() {
        let backend = InMemoryBackend::new();
        backend
            .set_text("user:1", "a", Some(Duration::from_millis(20)))
            .await
            .expect("set failed");
        backend.set_text("user:2", "b", None).await.expect("set failed");

        tokio::time::sleep(Duration::from_millis(50)).await;

        let keys = backend.keys_matching("user:*").await.expect("keys failed");
        assert_eq!(keys.len(), 1);
        assert!(keys.contains("user:2"));
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("user:*", "user:42"));
        assert!(!glob_match("user:*", "order:42"));
        assert!(glob_match("user:?", "user:1"));
        assert!(!glob_match("user:?", "user:12"));
        assert!(glob_match("*key*", "some-key-1"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactly"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("?", ""));
    }
}
