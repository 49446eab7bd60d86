//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated
//! configuration.

use std::net::SocketAddr;
use table_tracker::{DatabaseConfig, TablesConfig};

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Optional Prometheus scrape listener address
    pub metrics_bind: Option<SocketAddr>,
    /// Database configuration
    pub database: DatabaseConfig,
    /// The fixed table set and allowed rates
    pub tables: TablesConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or_else(|| {
                "127.0.0.1:8080"
                    .parse()
                    .expect("default bind address is valid")
            });

        let metrics_bind = std::env::var("METRICS_BIND")
            .ok()
            .and_then(|s| s.parse().ok());

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        // Table counts are env-tunable; extra tables start at the default
        // rate for their game type.
        let mut tables = TablesConfig::default();
        let snooker_count = parse_env_or("SNOOKER_TABLE_COUNT", tables.snooker_rates.len());
        let pool_count = parse_env_or("POOL_TABLE_COUNT", tables.pool_rates.len());
        resize_table_set(&mut tables.snooker_rates, snooker_count, 4.0);
        resize_table_set(&mut tables.pool_rates, pool_count, 2.0);

        Ok(ServerConfig {
            bind,
            metrics_bind,
            database,
            tables,
        })
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tables.validate().map_err(|reason| ConfigError::Invalid {
            var: "SNOOKER_TABLE_COUNT/POOL_TABLE_COUNT".to_string(),
            reason,
        })?;

        if self.database.database_url.is_empty() {
            return Err(ConfigError::Invalid {
                var: "DATABASE_URL".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Grow or shrink a table set to `count` entries, ids 1..=count.
fn resize_table_set(
    rates: &mut std::collections::BTreeMap<u32, f64>,
    count: usize,
    default_rate: f64,
) {
    rates.retain(|&id, _| (id as usize) <= count);
    for id in 1..=count as u32 {
        rates.entry(id).or_insert(default_rate);
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
