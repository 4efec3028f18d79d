//! Configuration loading using Figment
//!
//! Configuration is merged from, in increasing priority:
//! 1. `config/spectrum_daq.toml` (or the path given with `--config`)
//! 2. Environment variables prefixed with `SPECTRUM_DAQ_`, with `__` between
//!    table and key (`SPECTRUM_DAQ_ANALYZER__PORT=/dev/ttyUSB1`)
//!
//! Missing files and missing keys fall back to defaults, so an empty
//! environment yields a valid mock-less configuration that only lacks a port.
//!
//! # Example
//! ```no_run
//! use spectrum_daq::config::AppConfig;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = AppConfig::load()?;
//! config.validate()?;
//! println!("Analyzer on {}", config.analyzer.port);
//! # Ok(())
//! # }
//! ```

use anyhow::{bail, Context, Result};
use daq_core::DaqError;
use daq_driver_hp8562e::Hp8562eConfig;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/spectrum_daq.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SPECTRUM_DAQ_";

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Analyzer connection settings
    #[serde(default)]
    pub analyzer: Hp8562eConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_name() -> String {
    "spectrum-daq".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file path and the environment.
    ///
    /// A missing file is not an error; a file that does not parse is.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }

    /// Validate configuration after loading and CLI overrides.
    pub fn validate(&self) -> Result<()> {
        let level = self.application.log_level.to_lowercase();
        if !VALID_LEVELS.contains(&level.as_str()) {
            bail!(DaqError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                VALID_LEVELS.join(", ")
            )));
        }

        let format = self.application.log_format.to_lowercase();
        if !VALID_FORMATS.contains(&format.as_str()) {
            bail!(DaqError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                VALID_FORMATS.join(", ")
            )));
        }

        self.analyzer
            .validate()
            .context("Invalid [analyzer] configuration")?;

        Ok(())
    }

    /// Render as TOML (the `config` subcommand output).
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
