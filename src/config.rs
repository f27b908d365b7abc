//! Configuration Module
//!
//! Handles loading and validating cache configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

// == Backend Kind ==
/// Which storage backend the manager is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// In-process TTL map
    #[default]
    Memory,
    /// Remote key-value store
    Redis,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "memory" => Ok(BackendKind::Memory),
            "redis" => Ok(BackendKind::Redis),
            other => Err(CacheError::InvalidConfiguration(format!(
                "unknown backend type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Redis => write!(f, "redis"),
        }
    }
}

// == Redis Settings ==
/// Connection settings for the remote backend.
#[derive(Debug, Clone)]
pub struct RedisSettings {
    /// `host:port` of the server
    pub addr: String,
    pub password: Option<String>,
    /// Logical database index
    pub db: i64,
    /// Number of multiplexed connections kept open
    pub pool_size: usize,
    /// Retries for transient IO failures
    pub max_retries: u32,
    /// Namespace prepended to every key
    pub prefix: String,
    /// Upper bound on a single driver call, in milliseconds
    pub operation_timeout_ms: u64,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:6379".to_string(),
            password: None,
            db: 0,
            pool_size: 10,
            max_retries: 3,
            prefix: "cache:".to_string(),
            operation_timeout_ms: 2000,
        }
    }
}

impl RedisSettings {
    /// Operation timeout as a `Duration`.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Raw backend type as configured; parsed by [`Config::backend_kind`]
    pub backend: String,
    /// Default TTL in seconds, applied whenever a caller passes a zero TTL
    pub default_ttl: u64,
    /// Admin HTTP server port
    pub server_port: u16,
    /// Expired-entry sweep interval in seconds, 0 disables the sweeper
    pub sweep_interval: u64,
    /// Warmup job interval in seconds
    pub warmup_interval: u64,
    pub redis: RedisSettings,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `memory` or `redis` (default: memory)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds, 0 = off (default: 0)
    /// - `WARMUP_INTERVAL` - Period for embedders spawning a `CacheWarmer`, in seconds (default: 300)
    /// - `REDIS_ADDR`, `REDIS_PASSWORD`, `REDIS_DB`, `REDIS_POOL_SIZE`,
    ///   `REDIS_MAX_RETRIES`, `REDIS_PREFIX`, `REDIS_OPERATION_TIMEOUT_MS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let redis_defaults = defaults.redis.clone();

        Self {
            backend: env::var("CACHE_BACKEND").unwrap_or(defaults.backend),
            default_ttl: parse_env("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            sweep_interval: parse_env("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            warmup_interval: parse_env("WARMUP_INTERVAL").unwrap_or(defaults.warmup_interval),
            redis: RedisSettings {
                addr: env::var("REDIS_ADDR").unwrap_or(redis_defaults.addr),
                password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
                db: parse_env("REDIS_DB").unwrap_or(redis_defaults.db),
                pool_size: parse_env("REDIS_POOL_SIZE").unwrap_or(redis_defaults.pool_size),
                max_retries: parse_env("REDIS_MAX_RETRIES")
                    .unwrap_or(redis_defaults.max_retries),
                prefix: env::var("REDIS_PREFIX").unwrap_or(redis_defaults.prefix),
                operation_timeout_ms: parse_env("REDIS_OPERATION_TIMEOUT_MS")
                    .unwrap_or(redis_defaults.operation_timeout_ms),
            },
        }
    }

    /// Parses the configured backend type.
    pub fn backend_kind(&self) -> Result<BackendKind> {
        self.backend.parse()
    }

    /// Default TTL as a `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    /// Checks settings that would otherwise fail later at construction.
    pub fn validate(&self) -> Result<()> {
        let kind = self.backend_kind()?;
        if self.default_ttl == 0 {
            return Err(CacheError::InvalidConfiguration(
                "default TTL must be greater than zero".to_string(),
            ));
        }
        if kind == BackendKind::Redis && self.redis.pool_size == 0 {
            return Err(CacheError::InvalidConfiguration(
                "redis pool size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory.to_string(),
            default_ttl: 300,
            server_port: 3000,
            sweep_interval: 0,
            warmup_interval: 300,
            redis: RedisSettings::default(),
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
