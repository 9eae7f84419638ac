//! Configuration management for MedStock
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration file (`config/medstock.toml`, or an explicit path)
//! 3. Environment variable overrides with `MEDSTOCK_` prefix and `__`
//!    as the section separator (e.g. `MEDSTOCK_STOCK__LOW_STOCK_THRESHOLD=5`)

use std::path::Path;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use crate::alerts::AlertThresholds;
use crate::analysis::AnalysisPolicy;

const DEFAULT_CONFIG_FILE: &str = "config/medstock";

/// Main library configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Default tracing filter, overridden by `RUST_LOG`
    pub log_level: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Stock level thresholds
    pub stock: StockConfig,

    /// Expiry windows
    pub expiry: ExpiryConfig,

    /// Consumption analysis and forecasting
    pub analysis: AnalysisConfig,

    /// Account bootstrap
    pub security: SecurityConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StockConfig {
    /// Lots at or below this quantity (and above zero) are low stock
    pub low_stock_threshold: i64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ExpiryConfig {
    /// Days to expiry at or below which a near-expiry alert is critical
    pub critical_days: i64,

    /// Days to expiry at or below which a lot is near expiry
    pub attention_days: i64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Trailing window of consumption history, in days
    pub window_days: i64,

    /// Days of consumption a suggested reorder should cover
    pub restock_horizon_days: i64,

    /// Below this many consumption samples the history is flagged as sparse
    pub sparse_history_samples: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SecurityConfig {
    /// Password given to the seeded `admin` account
    pub default_admin_password: String,
}

impl Config {
    /// Load configuration from the default file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, reading `path` instead of the default file when given
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let environment =
            std::env::var("MEDSTOCK_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment)?
            .set_default("log_level", "medstock_core=info")?
            .set_default("database.path", "medstock.db")?
            .set_default("stock.low_stock_threshold", 10)?
            .set_default("expiry.critical_days", 7)?
            .set_default("expiry.attention_days", 30)?
            .set_default("analysis.window_days", 30)?
            .set_default("analysis.restock_horizon_days", 60)?
            .set_default("analysis.sparse_history_samples", 5)?
            .set_default("security.default_admin_password", "admin123")?
            .add_source(file)
            // Override with environment variables (MEDSTOCK_ prefix)
            .add_source(
                Environment::with_prefix("MEDSTOCK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stock.low_stock_threshold < 0 {
            return Err(ConfigError::Message(
                "stock.low_stock_threshold must not be negative".into(),
            ));
        }
        if self.expiry.critical_days < 0 {
            return Err(ConfigError::Message(
                "expiry.critical_days must not be negative".into(),
            ));
        }
        if self.expiry.critical_days >= self.expiry.attention_days {
            return Err(ConfigError::Message(format!(
                "expiry.critical_days ({}) must be less than expiry.attention_days ({})",
                self.expiry.critical_days, self.expiry.attention_days
            )));
        }
        if self.analysis.window_days <= 0 {
            return Err(ConfigError::Message(
                "analysis.window_days must be positive".into(),
            ));
        }
        if self.analysis.restock_horizon_days <= 0 {
            return Err(ConfigError::Message(
                "analysis.restock_horizon_days must be positive".into(),
            ));
        }
        if self.security.default_admin_password.is_empty() {
            return Err(ConfigError::Message(
                "security.default_admin_password must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Alert thresholds derived from the stock and expiry sections.
    pub fn alert_thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            low_stock: self.stock.low_stock_threshold,
            expiry_critical_days: self.expiry.critical_days,
            expiry_attention_days: self.expiry.attention_days,
        }
    }

    /// Forecasting policy derived from the analysis section.
    pub fn analysis_policy(&self) -> AnalysisPolicy {
        AnalysisPolicy {
            window_days: self.analysis.window_days,
            restock_horizon_days: self.analysis.restock_horizon_days,
            sparse_history_samples: self.analysis.sparse_history_samples,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "medstock_core=info".to_string(),
            database: DatabaseConfig {
                path: "medstock.db".to_string(),
            },
            stock: StockConfig {
                low_stock_threshold: 10,
            },
            expiry: ExpiryConfig {
                critical_days: 7,
                attention_days: 30,
            },
            analysis: AnalysisConfig {
                window_days: 30,
                restock_horizon_days: 60,
                sparse_history_samples: 5,
            },
            security: SecurityConfig {
                default_admin_password: "admin123".to_string(),
            },
        }
    }
}
