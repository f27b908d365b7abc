//! Expired-Entry Sweep Task
//!
//! Optional background task that periodically drops expired entries so that
//! write-once, never-read keys do not accumulate. It does not change what
//! reads observe: an expired entry is already invisible before it is swept.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::manager::Manager;

/// Spawns a background task that calls [`Manager::purge_expired`] every
/// `interval`.
///
/// Returns a JoinHandle for the spawned task, which is aborted during
/// graceful shutdown.
///
/// # Example
/// ```ignore
/// let manager = Arc::new(Manager::from_config(&config).await?);
/// let sweep_handle = spawn_sweep_task(manager.clone(), Duration::from_secs(30));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(manager: Arc<Manager>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting expired-entry sweeper");

        loop {
            tokio::time::sleep(interval).await;

            match manager.purge_expired().await {
                Ok(0) => debug!("sweep: no expired entries found"),
                Ok(removed) => info!(removed, "sweep: removed expired entries"),
                Err(e) => warn!(error = %e, "sweep failed"),
            }
        }
    })
}
