/// Configuration management for the worker
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: SQLite connection string (default: sqlite://nudgepay.db)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 5)
/// - `SWEEP_INTERVAL_SECS`: Seconds between reminder sweeps (default: 60)
/// - `SWEEP_TENANT_CONCURRENCY`: Organizations swept in parallel (default: 4)
/// - `WORKER_ENABLED`: Set to false to run without the sweep (default: true)
/// - `RUST_LOG`: Log filter (default: nudgepay_worker=debug,nudgepay_shared=info)
///
/// # Example
///
/// ```no_run
/// use nudgepay_worker::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Sweeping every {}s", config.sweep.interval_secs);
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use std::env;
use std::str::FromStr;

use crate::scheduler::SchedulerConfig;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://nudgepay.db";

/// Complete worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Reminder sweep configuration
    pub sweep: SweepConfig,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Reminder sweep configuration
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Whether the periodic sweep runs at all
    pub enabled: bool,

    /// Seconds between sweeps
    pub interval_secs: u64,

    /// Organizations swept in parallel
    pub tenant_concurrency: usize,
}

impl SweepConfig {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval_secs: self.interval_secs,
            tenant_concurrency: self.tenant_concurrency,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an invalid value
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an invalid value
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let max_connections: u32 = parse_var(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?;
        let interval_secs: u64 = parse_var(&lookup, "SWEEP_INTERVAL_SECS", 60)?;
        let tenant_concurrency: usize = parse_var(&lookup, "SWEEP_TENANT_CONCURRENCY", 4)?;
        let enabled = match lookup("WORKER_ENABLED") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("WORKER_ENABLED must be true or false, got {raw:?}"))?,
            None => true,
        };

        if max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        if interval_secs == 0 {
            anyhow::bail!("SWEEP_INTERVAL_SECS must be at least 1");
        }
        if tenant_concurrency == 0 {
            anyhow::bail!("SWEEP_TENANT_CONCURRENCY must be at least 1");
        }

        Ok(Self {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            sweep: SweepConfig {
                enabled,
                interval_secs,
                tenant_concurrency,
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
