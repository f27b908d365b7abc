//! Redis-backed store
//!
//! Requires the `redis` feature. Every key is namespaced under the configured
//! prefix before it reaches the server; payloads travel as bulk strings.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::{Client, Cmd, FromRedisValue};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::backend::{literal_prefix, Backend, BackendStats, Ttl, DEFAULT_TTL};
use crate::config::RedisSettings;
use crate::error::{CacheError, Result};

const SCAN_BATCH: usize = 200;

/// Largest PX the server accepts without overflowing its clock arithmetic.
const MAX_PX_MILLIS: u64 = (i64::MAX as u64) / 2;

// == Redis Store ==
/// Remote store implementing [`Backend`] over a small pool of multiplexed
/// connections.
pub struct RedisStore {
    /// Opened connections, emptied by `close`
    connections: RwLock<Vec<MultiplexedConnection>>,
    /// Round-robin cursor into `connections`
    next: AtomicUsize,
    settings: RedisSettings,
    default_ttl: Duration,
}

impl RedisStore {
    /// Connects `pool_size` connections and pings the server.
    pub async fn connect(settings: RedisSettings, default_ttl: Duration) -> Result<Self> {
        let client = Client::open(connection_url(&settings))
            .map_err(|e| CacheError::BackendUnavailable(format!("redis client error: {}", e)))?;

        let pool_size = settings.pool_size.max(1);
        let mut connections = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let conn = tokio::time::timeout(
                settings.operation_timeout(),
                client.get_multiplexed_async_connection(),
            )
            .await
            .map_err(|_| {
                CacheError::BackendUnavailable(format!("redis connect to {} timed out", settings.addr))
            })?
            .map_err(|e| CacheError::BackendUnavailable(format!("redis connection error: {}", e)))?;
            connections.push(conn);
        }

        let store = Self {
            connections: RwLock::new(connections),
            next: AtomicUsize::new(0),
            default_ttl: if default_ttl.is_zero() {
                DEFAULT_TTL
            } else {
                default_ttl
            },
            settings,
        };

        store
            .ping()
            .await
            .map_err(|e| CacheError::BackendUnavailable(format!("redis ping failed: {}", e)))?;

        info!(
            addr = %store.settings.addr,
            db = store.settings.db,
            pool_size,
            "redis store connected"
        );
        Ok(store)
    }

    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.settings.prefix, key)
    }

    fn connection(&self) -> Result<MultiplexedConnection> {
        let connections = self.connections.read();
        if connections.is_empty() {
            return Err(CacheError::BackendUnavailable(
                "redis store is closed".to_string(),
            ));
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % connections.len();
        Ok(connections[idx].clone())
    }

    /// Runs one command, retrying transient IO failures and bounding each
    /// attempt by the operation timeout.
    async fn exec<T: FromRedisValue>(&self, op: &'static str, cmd: &Cmd) -> Result<T> {
        let timeout = self.settings.operation_timeout();
        let mut attempt = 0;
        loop {
            let mut conn = self.connection()?;
            match tokio::time::timeout(timeout, cmd.query_async(&mut conn)).await {
                Err(_) => return Err(CacheError::Timeout(timeout)),
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if e.is_io_error() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    warn!(op, attempt, error = %e, "redis call failed, retrying");
                }
                Ok(Err(e)) => {
                    return Err(CacheError::Backend(format!("redis {} error: {}", op, e)))
                }
            }
        }
    }

    async fn exec_write<T: FromRedisValue>(&self, op: &'static str, cmd: &Cmd) -> Result<T> {
        self.exec(op, cmd).await.map_err(|e| match e {
            CacheError::Backend(msg) => CacheError::BackendWrite(msg),
            other => other,
        })
    }
}

#[async_trait]
impl Backend for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut cmd = ::redis::cmd("GET");
        cmd.arg(self.prefixed_key(key));
        self.exec("GET", &cmd).await
    }

    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Ttl) -> Result<()> {
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(self.prefixed_key(key)).arg(payload);
        let ttl = match ttl {
            Ttl::Default => Some(self.default_ttl),
            Ttl::Expires(ttl) => Some(ttl),
            Ttl::Never => None,
        };
        if let Some(millis) = ttl.and_then(px_millis) {
            cmd.arg("PX").arg(millis);
        }
        self.exec_write("SET", &cmd).await
    }

    async fn delete(&self, keys: &[&str]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut cmd = ::redis::cmd("DEL");
        for key in keys {
            cmd.arg(self.prefixed_key(key));
        }
        let _: i64 = self.exec_write("DEL", &cmd).await?;
        Ok(())
    }

    async fn delete_by_prefix(&self, pattern: &str) -> Result<u64> {
        if pattern.is_empty() {
            return Ok(0);
        }
        let full_pattern = format!(
            "{}*",
            escape_glob(&self.prefixed_key(literal_prefix(pattern)))
        );

        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let mut scan = ::redis::cmd("SCAN");
            scan.arg(cursor)
                .arg("MATCH")
                .arg(&full_pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH);
            let (next, keys): (u64, Vec<String>) = self.exec("SCAN", &scan).await?;

            if !keys.is_empty() {
                let mut del = ::redis::cmd("DEL");
                del.arg(&keys);
                let deleted: u64 = self.exec_write("DEL", &del).await?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern = %full_pattern, removed, "deleted redis keys by prefix");
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut cmd = ::redis::cmd("EXISTS");
        cmd.arg(self.prefixed_key(key));
        let count: i64 = self.exec("EXISTS", &cmd).await?;
        Ok(count > 0)
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let mut cmd = ::redis::cmd("INCR");
        cmd.arg(self.prefixed_key(key));
        self.exec_write("INCR", &cmd).await
    }

    async fn decrement(&self, key: &str) -> Result<i64> {
        let mut cmd = ::redis::cmd("DECR");
        cmd.arg(self.prefixed_key(key));
        self.exec_write("DECR", &cmd).await
    }

    async fn stats(&self) -> Result<BackendStats> {
        let mut info_cmd = ::redis::cmd("INFO");
        info_cmd.arg("memory");
        let info: String = self.exec("INFO", &info_cmd).await?;
        let db_size: i64 = self.exec("DBSIZE", &::redis::cmd("DBSIZE")).await?;

        let mut stats = BackendStats::new();
        stats.insert("backend".to_string(), json!("redis"));
        stats.insert("db_size".to_string(), json!(db_size));
        stats.insert("prefix".to_string(), json!(self.settings.prefix));
        stats.insert("redis_info".to_string(), json!(info));
        Ok(stats)
    }

    async fn ping(&self) -> Result<()> {
        let _: String = self.exec("PING", &::redis::cmd("PING")).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let dropped = std::mem::take(&mut *self.connections.write());
        if !dropped.is_empty() {
            info!(connections = dropped.len(), "redis store closed");
        }
        Ok(())
    }
}

/// Converts a TTL to a PX argument. Zero is rounded up to one millisecond
/// since PX rejects it; TTLs beyond the server's range persist.
fn px_millis(ttl: Duration) -> Option<u64> {
    match u64::try_from(ttl.as_millis()) {
        Ok(millis) if millis <= MAX_PX_MILLIS => Some(millis.max(1)),
        _ => None,
    }
}

fn connection_url(settings: &RedisSettings) -> String {
    let auth = match &settings.password {
        Some(password) => format!(":{}@", password),
        None => String::new(),
    };
    format!("redis://{}{}/{}", auth, settings.addr, settings.db)
}

/// Escapes glob metacharacters so a key prefix matches literally in SCAN.
fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
