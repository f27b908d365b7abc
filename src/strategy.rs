//! Cache Strategies
//!
//! Small policies layered on the manager: early refresh before TTL expiry,
//! and prefetching the first pages of a resource.

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::manager::Manager;
use crate::pagination::{
    content_hash, derive_key, Filters, PageEnvelopeRef, PaginationParams, DEFAULT_PAGE_SIZE,
};

// == Refresh Strategy ==
/// Signals a refresh once half the TTL has elapsed since the last update.
#[derive(Debug)]
pub struct RefreshStrategy {
    ttl: Duration,
    refresh_interval: Duration,
    last_update: RwLock<Instant>,
}

impl RefreshStrategy {
    /// Uses `ttl / 2` as the refresh interval, or one minute when that is zero.
    pub fn new(ttl: Duration) -> Self {
        let half = ttl / 2;
        Self {
            ttl,
            refresh_interval: if half.is_zero() {
                Duration::from_secs(60)
            } else {
                half
            },
            last_update: RwLock::new(Instant::now()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn should_refresh(&self) -> bool {
        self.last_update.read().elapsed() > self.refresh_interval
    }

    pub fn mark_updated(&self) {
        *self.last_update.write() = Instant::now();
    }
}

// == Prefetch Strategy ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchStrategy {
    pub enabled: bool,
    /// Maximum number of pages written per prefetch
    pub batch_size: usize,
}

impl PrefetchStrategy {
    /// A zero `batch_size` is raised to one page.
    pub fn new(enabled: bool, batch_size: usize) -> Self {
        Self {
            enabled,
            batch_size: batch_size.max(1),
        }
    }
}

impl Manager {
    // == Prefetch ==
    /// Splits `items` into pages and stores up to `batch_size` of them under
    /// the unfiltered keys for `resource`, as if each page had been queried.
    ///
    /// Returns the number of pages written. Individual write failures are
    /// logged and skipped.
    pub async fn prefetch<T: Serialize>(
        &self,
        strategy: &PrefetchStrategy,
        resource: &str,
        items: &[T],
        page_size: usize,
        ttl: Duration,
    ) -> Result<usize> {
        if !strategy.enabled || items.is_empty() {
            return Ok(0);
        }

        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE as usize
        } else {
            page_size
        };
        let total = items.len() as i64;
        let no_filters = Filters::new();

        let mut written = 0;
        for (index, chunk) in items
            .chunks(page_size)
            .take(strategy.batch_size)
            .enumerate()
        {
            let params = PaginationParams::new(index as i64 + 1, page_size as i64);
            let key = derive_key(resource, &no_filters, params);
            let hash = content_hash(chunk)?;
            let envelope = PageEnvelopeRef {
                data: chunk,
                total,
                content_hash: &hash,
            };

            match self.set(&key, &envelope, ttl).await {
                Ok(()) => written += 1,
                Err(e) => warn!(key = %key, error = %e, "prefetch write failed"),
            }
        }

        debug!(resource, pages = written, "prefetched pages");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;
    use crate::error::CacheError;
    use std::sync::Arc;

    fn manager() -> Manager {
        Manager::with_backend(
            Arc::new(MemoryStore::new(Duration::from_secs(60))),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_refresh_interval_is_half_ttl() {
        let strategy = RefreshStrategy::new(Duration::from_secs(10));
        assert_eq!(strategy.refresh_interval(), Duration::from_secs(5));
        assert!(!strategy.should_refresh());

        let zero = RefreshStrategy::new(Duration::ZERO);
        assert_eq!(zero.refresh_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_should_refresh_after_interval() {
        let strategy = RefreshStrategy::new(Duration::from_millis(40));
        std::thread::sleep(Duration::from_millis(30));
        assert!(strategy.should_refresh());

        strategy.mark_updated();
        assert!(!strategy.should_refresh());
    }

    #[test]
    fn test_prefetch_strategy_batch_floor() {
        assert_eq!(PrefetchStrategy::new(true, 0).batch_size, 1);
    }

    #[tokio::test]
    async fn test_prefetch_writes_limited_pages() {
        let manager = manager();
        let items: Vec<u32> = (1..=10).collect();
        let strategy = PrefetchStrategy::new(true, 2);

        let written = manager
            .prefetch(&strategy, "numbers", &items, 3, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(written, 2);

        // A later paginated query for page 2 is served from the prefetch
        let page = manager
            .query_paginated(
                "numbers",
                &Filters::new(),
                PaginationParams::new(2, 3),
                || async { Err::<(Vec<u32>, i64), _>(CacheError::Producer(anyhow::anyhow!("unused"))) },
            )
            .await
            .unwrap();
        assert!(page.from_cache);
        assert_eq!(page.data, vec![4, 5, 6]);
        assert_eq!(page.total, 10);
        assert_eq!(page.total_pages, 4);

        assert!(!manager.exists("numbers:page:3:size:3").await.unwrap());
    }

    #[tokio::test]
    async fn test_prefetch_disabled_is_noop() {
        let manager = manager();
        let written = manager
            .prefetch(&PrefetchStrategy::new(false, 5), "numbers", &[1, 2, 3], 1, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert_eq!(manager.invalidate("numbers").await.unwrap(), 0);
    }
}
