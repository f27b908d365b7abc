//! Pagination Cache Codec
//!
//! Derives stable cache keys for paginated queries, wraps page results with a
//! content hash, and invalidates every cached page of a resource at once.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::manager::Manager;

// == Public Constants ==
pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Filter name to value. Iteration order never affects the derived key.
pub type Filters = HashMap<String, serde_json::Value>;

// == Pagination Params ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    /// 1-based page number
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub page_size: i64,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn default_use_cache() -> bool {
    true
}

impl PaginationParams {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page,
            page_size,
            use_cache: true,
        }
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    // == Normalize ==
    /// Coerces non-positive values to the defaults and clamps `page_size`
    /// to [`MAX_PAGE_SIZE`]. Idempotent.
    pub fn normalize(self) -> Self {
        let page = if self.page <= 0 { DEFAULT_PAGE } else { self.page };
        let page_size = if self.page_size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size.min(MAX_PAGE_SIZE)
        };

        Self {
            page,
            page_size,
            use_cache: self.use_cache,
        }
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_PAGE_SIZE)
    }
}

// == Envelopes ==
/// Stored form of one cached page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub content_hash: String,
}

/// Borrowed form of [`PageEnvelope`] with an identical encoding.
#[derive(Debug, Serialize)]
pub(crate) struct PageEnvelopeRef<'a, T> {
    pub data: &'a [T],
    pub total: i64,
    pub content_hash: &'a str,
}

/// Page returned to callers of [`Manager::query_paginated`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    /// True when served from a stored envelope
    pub from_cache: bool,
    pub cache_key: String,
    /// Hash of `data` alone
    pub content_hash: String,
}

impl<T> PaginatedResponse<T> {
    /// Builds a response, computing `total_pages` from the normalized params.
    pub fn build(
        data: Vec<T>,
        total: i64,
        params: PaginationParams,
        cache_key: String,
        content_hash: String,
        from_cache: bool,
    ) -> Self {
        let params = params.normalize();
        Self {
            data,
            total,
            page: params.page,
            page_size: params.page_size,
            total_pages: total_pages(total, params.page_size),
            from_cache,
            cache_key,
            content_hash,
        }
    }
}

/// `ceil(total / page_size)`, zero for an empty or negative total.
pub fn total_pages(total: i64, page_size: i64) -> i64 {
    if total <= 0 || page_size <= 0 {
        return 0;
    }
    total / page_size + i64::from(total % page_size != 0)
}

// == Key Derivation ==
/// Builds `resource[:name:value]*:page:<n>:size:<m>` with filter names in
/// lexicographic order and values JSON-encoded. `%` and `:` inside filter
/// names are percent-escaped so a name can never span two segments.
pub fn derive_key(resource: &str, filters: &Filters, params: PaginationParams) -> String {
    let params = params.normalize();
    let mut parts: Vec<String> = vec![resource.to_string()];

    let mut names: Vec<&String> = filters.keys().collect();
    names.sort();
    for name in names {
        parts.push(escape_segment(name));
        parts.push(filters[name].to_string());
    }

    parts.push("page".to_string());
    parts.push(params.page.to_string());
    parts.push("size".to_string());
    parts.push(params.page_size.to_string());
    parts.join(":")
}

fn escape_segment(name: &str) -> String {
    name.replace('%', "%25").replace(':', "%3A")
}

// == Content Hash ==
/// Hex SHA-256 of the JSON encoding of `data`.
pub fn content_hash<T: Serialize>(data: &[T]) -> Result<String> {
    let payload = serde_json::to_vec(data)?;
    Ok(hex::encode(Sha256::digest(&payload)))
}

impl Manager {
    // == Query Paginated ==
    /// Cache-aside for one page of `resource`.
    ///
    /// On a hit the stored content hash is returned as-is. On a miss the
    /// producer yields `(data, total)`; the envelope is stored with the
    /// manager default TTL when caching is enabled.
    pub async fn query_paginated<T, E, F, Fut>(
        &self,
        resource: &str,
        filters: &Filters,
        params: PaginationParams,
        producer: F,
    ) -> std::result::Result<PaginatedResponse<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<(Vec<T>, i64), E>>,
    {
        let params = params.normalize();
        let key = derive_key(resource, filters, params);

        if params.use_cache {
            if let Some(cached) = self.lookup::<PageEnvelope<T>>(&key).await {
                return Ok(PaginatedResponse::build(
                    cached.data,
                    cached.total,
                    params,
                    key,
                    cached.content_hash,
                    true,
                ));
            }
        }

        let (data, total) = producer().await?;
        let hash = content_hash(&data)?;

        if params.use_cache {
            let envelope = PageEnvelopeRef {
                data: &data,
                total,
                content_hash: &hash,
            };
            self.store_quietly(&key, &envelope, self.resolve_ttl(Duration::ZERO))
                .await;
        }

        Ok(PaginatedResponse::build(data, total, params, key, hash, false))
    }

    // == Invalidate ==
    /// Drops every cached page and filter variant of `resource`.
    pub async fn invalidate(&self, resource: &str) -> Result<u64> {
        let removed = self.delete_by_prefix(&format!("{}:", resource)).await?;
        debug!(resource, removed, "invalidated cached pages");
        Ok(removed)
    }
}
