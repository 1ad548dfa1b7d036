//! Daemon settings
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. Optional TOML file (`SEQRELAY_CONFIG`, default `seqrelay.toml`)
//! 3. Environment variables prefixed with `SEQRELAY_`, nested keys split by `__`
//!
//! # Example
//!
//! ```text
//! SEQRELAY_PIPELINE__ITEM_COUNT=5000 \
//! SEQRELAY_PIPELINE__QUEUE_CAPACITY=64 \
//! SEQRELAY_LOG__FORMAT=json \
//!     ./seqrelay
//! ```

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use seqrelay_core::application::PipelineConfig;
use serde::Deserialize;

const CONFIG_PATH_ENV: &str = "SEQRELAY_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "seqrelay.toml";
const ENV_PREFIX: &str = "SEQRELAY";
const DEFAULT_LOG_FILTER: &str = "seqrelay=info";

/// Console output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Development: multi-line with colors
    #[default]
    Pretty,
    /// Single line per event
    Compact,
    /// Production: JSON structured logging
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives, overridden by `RUST_LOG` when set
    pub filter: String,
    /// Additional plain-text log file (`~` is expanded)
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: DEFAULT_LOG_FILTER.to_string(),
            file: None,
        }
    }
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub pipeline: PipelineConfig,
    pub log: LogConfig,
}

impl DaemonConfig {
    /// Load from file and environment
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let builder = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(environment());

        Self::build(builder).with_context(|| format!("Failed to load configuration ({path})"))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: DaemonConfig = builder.build()?.try_deserialize()?;
        config.pipeline.validate()?;
        Ok(config)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
