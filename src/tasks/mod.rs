//! Background Tasks Module
//!
//! Periodic work that runs alongside the admin server.
//!
//! # Tasks
//! - Sweep: physically removes expired entries (off unless an interval is set)
//! - Warmer: rewrites registered keys from their jobs

mod sweep;
mod warmer;

pub use sweep::spawn_sweep_task;
pub use warmer::{CacheWarmer, JobFuture, WarmupJob};
