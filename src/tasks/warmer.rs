//! Cache Warmer
//!
//! Periodically runs registered jobs and writes their results through the
//! manager, so hot keys are repopulated before callers miss on them.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::manager::Manager;

/// Boxed future returned by a warmup job.
pub type JobFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>>;

/// A warmup job producing the value to store under its key.
pub type WarmupJob = Arc<dyn Fn() -> JobFuture + Send + Sync>;

// == Cache Warmer ==
pub struct CacheWarmer {
    manager: Arc<Manager>,
    /// Key to job
    jobs: RwLock<HashMap<String, WarmupJob>>,
}

impl CacheWarmer {
    pub fn new(manager: Arc<Manager>) -> Self {
        Self {
            manager,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `job` for `key`, replacing any previous job for that key.
    pub fn add_job<F, Fut>(&self, key: impl Into<String>, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        let job: WarmupJob = Arc::new(move || Box::pin(job()) as JobFuture);
        self.jobs.write().insert(key.into(), job);
    }

    pub fn remove_job(&self, key: &str) {
        self.jobs.write().remove(key);
    }

    pub fn job_count(&self) -> usize {
        self.jobs.read().len()
    }

    // == Warmup ==
    /// Runs every registered job once and returns how many keys were written.
    ///
    /// Failing jobs and failed writes are logged and skipped.
    pub async fn warmup_once(&self) -> usize {
        // Jobs run outside the lock so they can register or remove jobs
        let jobs: Vec<(String, WarmupJob)> = self
            .jobs
            .read()
            .iter()
            .map(|(key, job)| (key.clone(), job.clone()))
            .collect();

        let mut written = 0;
        for (key, job) in jobs {
            let value = match job().await {
                Ok(value) => value,
                Err(e) => {
                    warn!(key = %key, error = %e, "warmup job failed");
                    continue;
                }
            };
            match self.manager.set(&key, &value, Duration::ZERO).await {
                Ok(()) => written += 1,
                Err(e) => warn!(key = %key, error = %e, "warmup write failed"),
            }
        }

        debug!(written, "warmup pass finished");
        written
    }

    /// Spawns a task running [`warmup_once`](Self::warmup_once) every
    /// `interval`. Abort the handle to stop it.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_secs = interval.as_secs(),
                jobs = self.job_count(),
                "starting cache warmer"
            );

            loop {
                tokio::time::sleep(interval).await;
                self.warmup_once().await;
            }
        })
    }
}
