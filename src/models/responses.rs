//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::BackendStats;
use crate::monitor::MetricsSnapshot;

/// Response body for `GET /get/:key`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: serde_json::Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for `PUT /set`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub message: String,
    pub key: String,
    /// Effective TTL in seconds; zero means the manager default was used
    pub ttl: u64,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, ttl: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            ttl,
        }
    }
}

/// Response body for `DELETE /del/:key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted", key),
            key,
        }
    }
}

/// Response body for `DELETE /invalidate/:resource`
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub resource: String,
    pub removed: u64,
}

/// Response body for `POST /incr/:key` and `POST /decr/:key`
#[derive(Debug, Clone, Serialize)]
pub struct CounterResponse {
    pub key: String,
    pub value: i64,
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Backend-reported statistics
    pub backend: BackendStats,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_ratio: f64,
    /// Mean latency over the recent lookup window
    pub avg_latency_ms: f64,
    pub last_update: DateTime<Utc>,
}

impl StatsResponse {
    pub fn new(backend: BackendStats, metrics: &MetricsSnapshot) -> Self {
        Self {
            backend,
            hits: metrics.hits,
            misses: metrics.misses,
            evictions: metrics.evictions,
            hit_ratio: metrics.hit_ratio(),
            avg_latency_ms: metrics.avg_latency.as_secs_f64() * 1000.0,
            last_update: metrics.last_update,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            status: "unhealthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Error body, matching what [`CacheError`](crate::error::CacheError)
/// renders for failed requests.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
