//! Storage Backend Module
//!
//! Defines the capability contract every cache backend satisfies, plus the
//! in-process TTL store and (behind the `redis` feature) the remote store.
//!
//! Backends only ever see byte payloads. Typed values are encoded and decoded
//! by [`crate::Manager`].

mod entry;
mod memory;
#[cfg(feature = "redis")]
mod remote;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use entry::CacheEntry;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use remote::RedisStore;

// == Public Constants ==
/// Default TTL used by a backend built without one
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Implementation-defined introspection returned by [`Backend::stats`].
pub type BackendStats = BTreeMap<String, serde_json::Value>;

// == Ttl ==
/// Time-to-live requested for a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Use the backend's configured default TTL
    Default,
    /// Expire after the given duration
    Expires(Duration),
    /// Keep until deleted or overwritten
    Never,
}

impl From<Duration> for Ttl {
    /// A zero duration means "use the default", never "no expiry".
    fn from(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Ttl::Default
        } else {
            Ttl::Expires(ttl)
        }
    }
}

// == Backend Trait ==
/// Capability set every cache backend provides.
///
/// Absence is never an error: `get` returns `Ok(None)` for missing or
/// expired keys. Dropping a returned future cancels the call.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the stored payload, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `payload` under `key`, replacing any existing entry.
    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Ttl) -> Result<()>;

    /// Deletes the given keys. Missing keys are ignored.
    async fn delete(&self, keys: &[&str]) -> Result<()>;

    /// Deletes every key starting with the literal part of `pattern`
    /// (a trailing `*` is optional) and returns how many were removed.
    async fn delete_by_prefix(&self, pattern: &str) -> Result<u64>;

    /// Reports whether a live (unexpired) entry exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomically adds one to the counter at `key`, starting from 0.
    async fn increment(&self, key: &str) -> Result<i64>;

    /// Atomically subtracts one from the counter at `key`, starting from 0.
    async fn decrement(&self, key: &str) -> Result<i64>;

    async fn stats(&self) -> Result<BackendStats>;

    /// Liveness check.
    async fn ping(&self) -> Result<()>;

    /// Releases backend resources. Callers quiesce outstanding calls first.
    async fn close(&self) -> Result<()>;

    /// Physically removes expired entries, returning how many were dropped.
    ///
    /// Backends that expire entries on their own keep the default no-op.
    async fn purge_expired(&self) -> Result<u64> {
        Ok(0)
    }
}

/// Strips an optional trailing wildcard, leaving the literal prefix.
pub(crate) fn literal_prefix(pattern: &str) -> &str {
    pattern.strip_suffix('*').unwrap_or(pattern)
}
