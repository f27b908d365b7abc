//! Cache Aside - a cache-aside layer over pluggable TTL backends
//!
//! Provides typed get-or-compute queries, pagination-aware cache keys with
//! content hashes, hit/miss monitoring, and a small admin HTTP surface.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod monitor;
pub mod pagination;
pub mod strategy;
pub mod tasks;
pub mod ticket;

#[cfg(test)]
mod property_tests;

pub use api::{create_router, AppState};
pub use backend::{Backend, BackendStats, MemoryStore, Ttl};
pub use config::{BackendKind, Config, RedisSettings};
pub use error::{CacheError, Result};
pub use manager::{Manager, QueryOptions};
pub use monitor::{MetricsSnapshot, Monitor};
pub use pagination::{Filters, PaginatedResponse, PaginationParams};
pub use strategy::{PrefetchStrategy, RefreshStrategy};
pub use tasks::{spawn_sweep_task, CacheWarmer};
pub use ticket::CacheTicket;

#[cfg(feature = "redis")]
pub use backend::RedisStore;
