//! In-Process TTL Store
//!
//! Reference backend: a HashMap of serialized payloads behind one coarse
//! reader/writer lock, with lazy expiry on read.
//!
//! There is no background reaper of its own. Expired entries stay in memory
//! until a read, delete, overwrite or an explicit [`MemoryStore::purge_expired`]
//! touches them. The single lock is a contention point under heavy write
//! load; it keeps every mutation atomic with respect to all others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{literal_prefix, Backend, BackendStats, CacheEntry, Ttl, DEFAULT_TTL};
use crate::error::{CacheError, Result};

// == Memory Store ==
/// In-process TTL map implementing [`Backend`].
#[derive(Debug)]
pub struct MemoryStore {
    /// Key-payload storage
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// TTL applied for [`Ttl::Default`]
    default_ttl: Duration,
    closed: AtomicBool,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// A zero `default_ttl` is replaced by [`DEFAULT_TTL`], so a default write
    /// always expires.
    pub fn new(default_ttl: Duration) -> Self {
        let default_ttl = if default_ttl.is_zero() {
            DEFAULT_TTL
        } else {
            default_ttl
        };

        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
            closed: AtomicBool::new(false),
        }
    }

    /// TTL applied when a write asks for the default.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Length ==
    /// Number of physically stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::BackendUnavailable(
                "memory store is closed".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve_ttl(&self, ttl: Ttl) -> Option<Duration> {
        match ttl {
            Ttl::Default => Some(self.default_ttl),
            Ttl::Expires(ttl) => Some(ttl),
            Ttl::Never => None,
        }
    }

    /// Looks a key up, evicting it if it has expired.
    async fn live_payload(&self, key: &str) -> Option<Vec<u8>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired() => return Some(entry.payload.clone()),
                Some(_) => {}
            }
        }

        // The entry may have been deleted or refreshed between the two locks
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                debug!(key, "evicted expired entry on read");
                None
            }
            Some(entry) => Some(entry.payload.clone()),
            None => None,
        }
    }

    // == Add Delta ==
    async fn add_delta(&self, key: &str, delta: i64) -> Result<i64> {
        self.ensure_open()?;
        let mut entries = self.entries.write().await;

        let existing = entries.get(key).filter(|entry| !entry.is_expired());
        let current: i64 = existing
            .and_then(|entry| serde_json::from_slice(&entry.payload).ok())
            .unwrap_or(0);
        // Counters keep the original expiry; new counters never expire
        let expires_at = existing.and_then(|entry| entry.expires_at);

        let next = current.saturating_add(delta);
        let payload = serde_json::to_vec(&next)?;
        entries.insert(
            key.to_string(),
            CacheEntry {
                payload,
                expires_at,
            },
        );
        Ok(next)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[async_trait]
impl Backend for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.live_payload(key).await)
    }

    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Ttl) -> Result<()> {
        self.ensure_open()?;
        let entry = CacheEntry::new(payload, self.resolve_ttl(ttl));
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<()> {
        self.ensure_open()?;
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    async fn delete_by_prefix(&self, pattern: &str) -> Result<u64> {
        self.ensure_open()?;
        if pattern.is_empty() {
            return Ok(0);
        }
        let prefix = literal_prefix(pattern);

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = (before - entries.len()) as u64;

        debug!(prefix, removed, "deleted entries by prefix");
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.live_payload(key).await.is_some())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        self.add_delta(key, 1).await
    }

    async fn decrement(&self, key: &str) -> Result<i64> {
        self.add_delta(key, -1).await
    }

    async fn stats(&self) -> Result<BackendStats> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        let total = entries.len();
        let expired = entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .count();

        let mut stats = BackendStats::new();
        stats.insert("backend".to_string(), json!("memory"));
        stats.insert("total_items".to_string(), json!(total));
        stats.insert("expired_items".to_string(), json!(expired));
        stats.insert("active_items".to_string(), json!(total - expired));
        Ok(stats)
    }

    async fn ping(&self) -> Result<()> {
        self.ensure_open()
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.entries.write().await.clear();
            debug!("memory store closed");
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        Ok((before - entries.len()) as u64)
    }
}
