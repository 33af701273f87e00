//! Engine configuration
//!
//! Read from a TOML file (optional) and `POWERUP__`-prefixed environment
//! variables, e.g. `POWERUP__BANK__COOLDOWN_TICKS=50`.

use anyhow::Context;
use powerup_economics::EconomicsConfig;
use powerup_storage::BankConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Curve constants and pools
    pub economics: EconomicsConfig,

    /// Token bank settings
    pub bank: BankConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load from `path` if it exists, then apply environment overrides
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path.to_path_buf())
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix("POWERUP").separator("__"))
            .build()
            .with_context(|| format!("reading configuration from {}", path.display()))?;

        let loaded: Self = settings
            .try_deserialize()
            .context("invalid configuration")?;
        loaded.economics.validate()?;
        Ok(loaded)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
