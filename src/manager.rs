//! Cache Manager
//!
//! Owns a backend, a default TTL and a monitor, and runs the typed
//! cache-aside protocol on top of them.
//!
//! Values are JSON-encoded at this boundary; backends only see bytes.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendStats, MemoryStore, Ttl};
use crate::config::{BackendKind, Config};
use crate::error::{CacheError, Result};
use crate::monitor::Monitor;
use crate::ticket::CacheTicket;

// == Query Options ==
/// Per-call settings for [`Manager::query`].
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// TTL for the write-back, zero inherits the manager default
    pub ttl: Duration,
    /// When false the backend is neither read nor written
    pub use_cache: bool,
    /// Validated before any other work
    pub ticket: Option<CacheTicket>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn no_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn ticket(mut self, ticket: CacheTicket) -> Self {
        self.ticket = Some(ticket);
        self
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::ZERO,
            use_cache: true,
            ticket: None,
        }
    }
}

// == Manager ==
/// Cache-aside executor over any [`Backend`].
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Manager {
    backend: Arc<dyn Backend>,
    default_ttl: Duration,
    monitor: Arc<Monitor>,
}

impl Manager {
    // == Constructors ==
    /// Builds the configured backend and checks that it answers a ping.
    ///
    /// Unknown backend types fail with [`CacheError::InvalidConfiguration`];
    /// a backend that cannot be reached fails with
    /// [`CacheError::BackendUnavailable`].
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let default_ttl = config.default_ttl();

        let backend: Arc<dyn Backend> = match config.backend_kind()? {
            BackendKind::Memory => Arc::new(MemoryStore::new(default_ttl)),
            BackendKind::Redis => connect_redis(config).await?,
        };

        backend
            .ping()
            .await
            .map_err(|e| CacheError::BackendUnavailable(e.to_string()))?;

        info!(
            backend = %config.backend_kind()?,
            default_ttl_secs = config.default_ttl,
            "cache manager initialized"
        );
        Ok(Self::with_backend(backend, default_ttl))
    }

    /// Wraps an existing backend.
    pub fn with_backend(backend: Arc<dyn Backend>, default_ttl: Duration) -> Self {
        Self {
            backend,
            default_ttl,
            monitor: Arc::new(Monitor::new()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Maps a caller TTL onto the backend's: zero means the manager default,
    /// and only falls back to the backend default when that is zero too.
    pub(crate) fn resolve_ttl(&self, ttl: Duration) -> Ttl {
        if !ttl.is_zero() {
            Ttl::Expires(ttl)
        } else {
            Ttl::from(self.default_ttl)
        }
    }

    // == Typed Pass-throughs ==
    /// Encodes `value` and stores it. A zero `ttl` uses the manager default.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_vec(value)?;
        self.backend.set(key, payload, self.resolve_ttl(ttl)).await
    }

    /// Stores `value` with no expiry.
    pub async fn set_persistent<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_vec(value)?;
        self.backend.set(key, payload, Ttl::Never).await
    }

    /// Reads and decodes a value. `Ok(None)` on a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.backend.get(key).await? {
            Some(payload) => Ok(Some(serde_json::from_slice(&payload)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, keys: &[&str]) -> Result<()> {
        self.backend.delete(keys).await
    }

    pub async fn delete_by_prefix(&self, pattern: &str) -> Result<u64> {
        self.backend.delete_by_prefix(pattern).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.backend.exists(key).await
    }

    pub async fn increment(&self, key: &str) -> Result<i64> {
        self.backend.increment(key).await
    }

    pub async fn decrement(&self, key: &str) -> Result<i64> {
        self.backend.decrement(key).await
    }

    pub async fn stats(&self) -> Result<BackendStats> {
        self.backend.stats().await
    }

    pub async fn ping(&self) -> Result<()> {
        self.backend.ping().await
    }

    pub async fn close(&self) -> Result<()> {
        self.backend.close().await
    }

    /// Drops expired entries and records them as evictions.
    pub async fn purge_expired(&self) -> Result<u64> {
        let removed = self.backend.purge_expired().await?;
        if removed > 0 {
            self.monitor.record_eviction(removed);
        }
        Ok(removed)
    }

    // == Query ==
    /// Returns the cached value for `key`, or runs `producer` and caches its
    /// result.
    ///
    /// - A ticket, when present, is validated first; failures never reach
    ///   the backend or the producer.
    /// - On a hit the producer is not invoked.
    /// - A producer error is returned unchanged and nothing is cached.
    /// - A failed write-back is logged and otherwise ignored.
    ///
    /// Concurrent misses on the same key each run the producer; the last
    /// write wins.
    pub async fn query<T, E, F, Fut>(
        &self,
        key: &str,
        producer: F,
        options: QueryOptions,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(ticket) = &options.ticket {
            ticket.validate()?;
        }

        if options.use_cache {
            if let Some(cached) = self.lookup::<T>(key).await {
                return Ok(cached);
            }
        }

        let value = producer().await?;

        if options.use_cache {
            self.store_quietly(key, &value, self.resolve_ttl(options.ttl))
                .await;
        }

        Ok(value)
    }

    /// Reads and decodes `key`, recording the outcome. Read-path failures of
    /// any kind count as a miss.
    pub(crate) async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let start = Instant::now();
        let result = self.backend.get(key).await;
        let elapsed = start.elapsed();

        match result {
            Ok(Some(payload)) => match serde_json::from_slice(&payload) {
                Ok(value) => {
                    self.monitor.record_hit(elapsed);
                    debug!(key, "cache hit");
                    Some(value)
                }
                Err(e) => {
                    self.monitor.record_miss(elapsed);
                    warn!(key, error = %e, "cached payload could not be decoded");
                    None
                }
            },
            Ok(None) => {
                self.monitor.record_miss(elapsed);
                debug!(key, "cache miss");
                None
            }
            Err(e) => {
                self.monitor.record_miss(elapsed);
                warn!(key, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Writes a freshly produced value, swallowing any failure.
    pub(crate) async fn store_quietly<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Ttl) {
        let payload = match serde_json::to_vec(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "value could not be encoded for caching");
                return;
            }
        };
        if let Err(e) = self.backend.set(key, payload, ttl).await {
            warn!(key, error = %e, "cache write failed");
        }
    }
}

#[cfg(feature = "redis")]
async fn connect_redis(config: &Config) -> Result<Arc<dyn Backend>> {
    let store =
        crate::backend::RedisStore::connect(config.redis.clone(), config.default_ttl()).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(_config: &Config) -> Result<Arc<dyn Backend>> {
    Err(CacheError::InvalidConfiguration(
        "redis backend requested but the `redis` feature is not enabled".to_string(),
    ))
}
