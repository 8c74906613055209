//! Redis cache backend implementation.
//!
//! Connection topology (standalone, cluster, sentinel) is selected from
//! configuration; everything else about reaching the server (pooling,
//! protocol, redirects) belongs to deadpool-redis and the redis crate.

use super::CacheBackend;
use crate::error::{Error, Result};
use deadpool_redis::redis::{cmd, Cmd, FromRedisValue};
use deadpool_redis::{PoolConfig, Runtime};
use std::collections::HashSet;
use std::time::Duration;

/// Default Redis connection pool size.
/// Override with the REDIS_POOL_SIZE environment variable.
const DEFAULT_MAX_TOTAL: usize = 8;
const DEFAULT_MIN_IDLE: usize = 0;
const DEFAULT_MAX_IDLE: usize = 8;

/// Pool sizing knobs.
///
/// `max_total` bounds the deadpool pool. `min_idle` and `max_idle` are
/// advisory: deadpool does not maintain an idle floor, so they are carried
/// through configuration and logged for operators but not enforced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_total: usize,
    pub min_idle: usize,
    pub max_idle: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        PoolSettings {
            max_total: DEFAULT_MAX_TOTAL,
            min_idle: DEFAULT_MIN_IDLE,
            max_idle: DEFAULT_MAX_IDLE,
        }
    }
}

/// How the backend reaches Redis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Topology {
    /// Single node at the configured host and port.
    Standalone,
    /// Redis Cluster. `nodes` are "host:port" pairs; `max_redirects` bounds
    /// MOVED/ASK chasing (enforced by the driver where supported).
    Cluster {
        nodes: Vec<String>,
        max_redirects: u32,
    },
    /// Sentinel-managed replication. `nodes` are the sentinel addresses;
    /// `master` is the monitored master set name.
    Sentinel {
        master: String,
        nodes: Vec<String>,
    },
}

/// Configuration for the Redis backend.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    /// Logical database index.
    ///
    /// Applied to standalone connections. Redis Cluster has no SELECT, and
    /// deadpool-redis's sentinel configuration carries no database slot, so
    /// cluster and sentinel topologies run on database 0 regardless of this
    /// setting (a driver limitation, not a facade choice).
    pub database: i64,
    pub topology: Topology,
    pub pool: PoolSettings,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            database: 0,
            topology: Topology::Standalone,
            pool: PoolSettings::default(),
        }
    }
}

impl RedisConfig {
    fn node_url(&self, addr: &str, with_db: bool) -> String {
        let auth = match &self.password {
            Some(password) => format!(":{}@", password),
            None => String::new(),
        };
        if with_db {
            format!("redis://{}{}/{}", auth, addr, self.database)
        } else {
            format!("redis://{}{}", auth, addr)
        }
    }

    fn standalone_url(&self) -> String {
        self.node_url(&format!("{}:{}", self.host, self.port), true)
    }
}

#[derive(Clone)]
enum Pool {
    Standalone(deadpool_redis::Pool),
    Cluster(deadpool_redis::cluster::Pool),
    Sentinel(deadpool_redis::sentinel::Pool),
}

/// Redis backend with connection pooling and async operations.
///
/// Pool construction is lazy: no connection is made until the first command,
/// so building a backend never blocks and never fails on an unreachable
/// server; the failure shows up on the first operation instead.
///
/// # Example
///
/// ```no_run
/// # use cache_guard::backend::{RedisBackend, RedisConfig, CacheBackend};
/// # use cache_guard::error::Result;
/// # async fn example() -> Result<()> {
/// let config = RedisConfig {
///     host: "cache.internal".to_string(),
///     ..Default::default()
/// };
///
/// let backend = RedisBackend::new(config)?;
/// backend.set_text("key", "value", None).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool,
}

impl RedisBackend {
    /// Create a new Redis backend from configuration.
    ///
    /// # Errors
    /// Returns `Err` if the configuration is invalid (no nodes, bad URL) or
    /// pool creation fails.
    pub fn new(config: RedisConfig) -> Result<Self> {
        let pool_size = config.pool.max_total;
        let pool = match &config.topology {
            Topology::Standalone => {
                let url = config.standalone_url();
                let mut cfg = deadpool_redis::Config::from_url(url);
                cfg.pool = Some(PoolConfig::new(pool_size));
                let pool = cfg
                    .create_pool(Some(Runtime::Tokio1))
                    .map_err(|e| Error::ConfigError(format!("failed to create pool: {}", e)))?;
                info!(
                    "✓ Redis backend initialized (standalone {}:{}, db {}, pool size: {})",
                    config.host, config.port, config.database, pool_size
                );
                Pool::Standalone(pool)
            }
            Topology::Cluster {
                nodes,
                max_redirects,
            } => {
                if nodes.is_empty() {
                    return Err(Error::ConfigError(
                        "no cluster nodes specified".to_string(),
                    ));
                }
                let urls: Vec<String> = nodes.iter().map(|n| config.node_url(n, false)).collect();
                let mut cfg = deadpool_redis::cluster::Config::from_urls(urls);
                cfg.pool = Some(PoolConfig::new(pool_size));
                let pool = cfg
                    .create_pool(Some(Runtime::Tokio1))
                    .map_err(|e| Error::ConfigError(format!("failed to create pool: {}", e)))?;
                info!(
                    "✓ Redis backend initialized (cluster, {} node(s), max redirects: {}, pool size: {})",
                    nodes.len(),
                    max_redirects,
                    pool_size
                );
                Pool::Cluster(pool)
            }
            Topology::Sentinel { master, nodes } => {
                if nodes.is_empty() {
                    return Err(Error::ConfigError(
                        "no sentinel nodes specified".to_string(),
                    ));
                }
                let urls: Vec<String> = nodes.iter().map(|n| config.node_url(n, false)).collect();
                let mut cfg = deadpool_redis::sentinel::Config::from_urls(
                    urls,
                    master.clone(),
                    deadpool_redis::sentinel::SentinelServerType::Master,
                );
                cfg.pool = Some(PoolConfig::new(pool_size));
                let pool = cfg
                    .create_pool(Some(Runtime::Tokio1))
                    .map_err(|e| Error::ConfigError(format!("failed to create pool: {}", e)))?;
                info!(
                    "✓ Redis backend initialized (sentinel master {:?}, {} node(s), pool size: {})",
                    master,
                    nodes.len(),
                    pool_size
                );
                Pool::Sentinel(pool)
            }
        };

        if config.pool.min_idle != DEFAULT_MIN_IDLE || config.pool.max_idle != DEFAULT_MAX_IDLE {
            debug!(
                "Redis pool idle settings (advisory): min_idle={}, max_idle={}",
                config.pool.min_idle, config.pool.max_idle
            );
        }

        Ok(RedisBackend { pool })
    }

    /// Create a standalone backend from a Redis URL directly.
    ///
    /// Pool size is determined by:
    /// 1. `REDIS_POOL_SIZE` environment variable (if set)
    /// 2. `DEFAULT_MAX_TOTAL` constant (8)
    ///
    /// # Errors
    /// Returns `Err` if the URL is invalid or pool creation fails.
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        let pool_size = std::env::var("REDIS_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_TOTAL);

        let mut cfg = deadpool_redis::Config::from_url(url.into());
        cfg.pool = Some(PoolConfig::new(pool_size));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::ConfigError(format!("failed to create pool: {}", e)))?;

        info!("✓ Redis backend initialized from URL (pool size: {})", pool_size);
        Ok(RedisBackend {
            pool: Pool::Standalone(pool),
        })
    }

    /// Run a command against whichever pool the topology selected.
    async fn query<T: FromRedisValue>(&self, command: Cmd) -> Result<T> {
        match &self.pool {
            Pool::Standalone(pool) => {
                let mut conn = pool.get().await.map_err(|e| {
                    Error::BackendError(format!("failed to get Redis connection: {}", e))
                })?;
                command
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| Error::BackendError(format!("Redis command failed: {}", e)))
            }
            Pool::Cluster(pool) => {
                let mut conn = pool.get().await.map_err(|e| {
                    Error::BackendError(format!("failed to get Redis cluster connection: {}", e))
                })?;
                command
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| Error::BackendError(format!("Redis command failed: {}", e)))
            }
            Pool::Sentinel(pool) => {
                let mut conn = pool.get().await.map_err(|e| {
                    Error::BackendError(format!("failed to get Redis sentinel connection: {}", e))
                })?;
                command
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| Error::BackendError(format!("Redis command failed: {}", e)))
            }
        }
    }
}

/// Build a SET command, folding the expiry into the same command so value and
/// TTL land atomically.
fn set_cmd(key: &str, value: impl deadpool_redis::redis::ToRedisArgs, ttl: Option<Duration>) -> Cmd {
    let mut command = cmd("SET");
    command.arg(key).arg(value);
    if let Some(ttl) = ttl {
        let millis = ttl.as_millis() as u64;
        if millis > 0 {
            command.arg("PX").arg(millis);
        }
    }
    command
}

impl CacheBackend for RedisBackend {
    async fn set_text(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.query::<()>(set_cmd(key, value, ttl)).await?;
        if let Some(d) = ttl {
            debug!("✓ Redis SET {} (TTL: {:?})", key, d);
        } else {
            debug!("✓ Redis SET {}", key);
        }
        Ok(())
    }

    async fn set_structured(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.query::<()>(set_cmd(key, value.as_slice(), ttl)).await?;
        debug!("✓ Redis SET {} (structured)", key);
        Ok(())
    }

    async fn get_text(&self, key: &str) -> Result<Option<String>> {
        let mut command = cmd("GET");
        command.arg(key);
        let value: Option<String> = self.query(command).await?;
        debug!(
            "✓ Redis GET {} -> {}",
            key,
            if value.is_some() { "HIT" } else { "MISS" }
        );
        Ok(value)
    }

    async fn get_structured(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut command = cmd("GET");
        command.arg(key);
        let value: Option<Vec<u8>> = self.query(command).await?;
        debug!(
            "✓ Redis GET {} (structured) -> {}",
            key,
            if value.is_some() { "HIT" } else { "MISS" }
        );
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut command = cmd("DEL");
        command.arg(key);
        self.query::<()>(command).await?;
        debug!("✓ Redis DEL {}", key);
        Ok(())
    }

    async fn hash_put(&self, key: &str, field: &str, value: Vec<u8>) -> Result<()> {
        let mut command = cmd("HSET");
        command.arg(key).arg(field).arg(value.as_slice());
        self.query::<()>(command).await?;
        debug!("✓ Redis HSET {} {}", key, field);
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        let mut command = cmd("HGET");
        command.arg(key).arg(field);
        let value: Option<Vec<u8>> = self.query(command).await?;
        debug!(
            "✓ Redis HGET {} {} -> {}",
            key,
            field,
            if value.is_some() { "HIT" } else { "MISS" }
        );
        Ok(value)
    }

    async fn keys_matching(&self, pattern: &str) -> Result<HashSet<String>> {
        let mut command = cmd("KEYS");
        command.arg(pattern);
        let keys: HashSet<String> = self.query(command).await?;
        debug!("✓ Redis KEYS {} -> {} match(es)", pattern, keys.len());
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_default() {
        let config = RedisConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 6379);
        assert_eq!(config.database, 0);
        assert_eq!(config.password, None);
        assert_eq!(config.topology, Topology::Standalone);
        assert_eq!(config.pool, PoolSettings::default());
    }

    #[test]
    fn test_pool_settings_defaults() {
        let pool = PoolSettings::default();
        assert_eq!(pool.max_total, 8);
        assert_eq!(pool.min_idle, 0);
        assert_eq!(pool.max_idle, 8);
    }

    #[test]
    fn test_standalone_url() {
        let config = RedisConfig {
            database: 3,
            ..Default::default()
        };
        assert_eq!(config.standalone_url(), "redis://localhost:6379/3");

        let config = RedisConfig {
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        assert_eq!(config.standalone_url(), "redis://:hunter2@localhost:6379/0");
    }

    #[test]
    fn test_node_url_without_db() {
        let config = RedisConfig {
            password: Some("s3cret".to_string()),
            database: 5,
            ..Default::default()
        };
        assert_eq!(
            config.node_url("cache1:6379", false),
            "redis://:s3cret@cache1:6379"
        );
    }

    #[test]
    fn test_new_standalone_is_lazy() {
        // Pool creation never touches the network.
        let backend = RedisBackend::new(RedisConfig::default());
        assert!(backend.is_ok());
    }

    #[test]
    fn test_new_cluster_is_lazy() {
        let config = RedisConfig {
            topology: Topology::Cluster {
                nodes: vec!["cache1:6379".to_string(), "cache2:6379".to_string()],
                max_redirects: 3,
            },
            ..Default::default()
        };
        assert!(RedisBackend::new(config).is_ok());
    }

    #[test]
    fn test_new_cluster_without_nodes_fails() {
        let config = RedisConfig {
            topology: Topology::Cluster {
                nodes: Vec::new(),
                max_redirects: 3,
            },
            ..Default::default()
        };
        let err = RedisBackend::new(config).expect_err("expected config error");
        assert!(err.to_string().contains("no cluster nodes"));
    }

    #[test]
    fn test_new_sentinel_without_nodes_fails() {
        let config = RedisConfig {
            topology: Topology::Sentinel {
                master: "mymaster".to_string(),
                nodes: Vec::new(),
            },
            ..Default::default()
        };
        let err = RedisBackend::new(config).expect_err("expected config error");
        assert!(err.to_string().contains("no sentinel nodes"));
    }

    #[test]
    fn test_from_url_is_lazy() {
        let backend = RedisBackend::from_url("redis://localhost:6379/0");
        assert!(backend.is_ok());
    }
}
