//! Application configuration management.

use serde::Deserialize;

use crate::types::Money;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Settlement engine configuration.
    #[serde(default)]
    pub settlement: SettlementConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

/// Settlement configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    /// Width of the time bucket folded into idempotency keys, in seconds.
    #[serde(default = "default_idempotency_window")]
    pub idempotency_window_secs: u64,
    /// Largest tolerated non-zero sum of net balances, in minor units.
    #[serde(default)]
    pub imbalance_tolerance_cents: u32,
}

fn default_idempotency_window() -> u64 {
    300 // 5 minutes
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            idempotency_window_secs: default_idempotency_window(),
            imbalance_tolerance_cents: 0,
        }
    }
}

impl SettlementConfig {
    /// Returns the imbalance tolerance as money.
    #[must_use]
    pub fn imbalance_tolerance(&self) -> Money {
        Money::from_minor(i64::from(self.imbalance_tolerance_cents))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "tally=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("TALLY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 6] = [
        "RUN_MODE",
        "TALLY__DATABASE__URL",
        "TALLY__SETTLEMENT__IDEMPOTENCY_WINDOW_SECS",
        "TALLY__SETTLEMENT__IMBALANCE_TOLERANCE_CENTS",
        "TALLY__LOGGING__FILTER",
        "TALLY__LOGGING__JSON",
    ];

    #[test]
    fn test_load_defaults_without_sources() {
        temp_env::with_vars_unset(VARS, || {
            let config = AppConfig::load().unwrap();
            assert_eq!(config.database.url, "sqlite::memory:");
            assert_eq!(config.database.max_connections, 10);
            assert_eq!(config.settlement.idempotency_window_secs, 300);
            assert_eq!(config.settlement.imbalance_tolerance(), Money::ZERO);
            assert_eq!(config.logging.filter, "tally=info");
            assert!(!config.logging.json);
        });
    }

    #[test]
    fn test_load_environment_overrides() {
        temp_env::with_vars(
            [
                ("RUN_MODE", None),
                ("TALLY__DATABASE__URL", Some("postgres://localhost/tally")),
                ("TALLY__SETTLEMENT__IDEMPOTENCY_WINDOW_SECS", Some("60")),
                ("TALLY__SETTLEMENT__IMBALANCE_TOLERANCE_CENTS", Some("2")),
                ("TALLY__LOGGING__FILTER", None),
                ("TALLY__LOGGING__JSON", Some("true")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/tally");
                assert_eq!(config.settlement.idempotency_window_secs, 60);
                assert_eq!(config.settlement.imbalance_tolerance(), Money::from_minor(2));
                assert!(config.logging.json);
            },
        );
    }
}
