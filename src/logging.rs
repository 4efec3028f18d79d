//! Tracing setup for the `spectrum-daq` binary.
//!
//! Events go to stderr so that trace data printed on stdout stays machine
//! readable. `RUST_LOG` overrides the configured level when set.
//!
//! # Example
//! ```no_run
//! use spectrum_daq::logging::{self, LogFormat, TracingConfig};
//! use tracing::Level;
//!
//! # fn main() -> anyhow::Result<()> {
//! logging::init(TracingConfig::new(Level::DEBUG).with_format(LogFormat::Json))?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

use crate::config::AppConfig;
use anyhow::{anyhow, Result};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored (interactive use)
    Pretty,
    /// Single line per event, no colors
    Compact,
    /// Newline-delimited JSON (log aggregation)
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(anyhow!(
                "Invalid log format '{}'. Must be one of: pretty, compact, json",
                s
            )),
        }
    }
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: Level,
    /// Output format
    pub format: LogFormat,
    /// Whether to emit span NEW/CLOSE events
    pub with_span_events: bool,
    /// Whether to include file and line numbers
    pub with_file_and_line: bool,
    /// Whether to enable ANSI colors (Pretty only)
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            with_span_events: false,
            with_file_and_line: false,
            with_ansi: true,
        }
    }
}

impl TracingConfig {
    /// Build from the `[application]` section.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            level: parse_log_level(&config.application.log_level)?,
            format: config.application.log_format.parse()?,
            ..Default::default()
        })
    }

    /// Defaults at the given level.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Set output format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable span events
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// Enable or disable ANSI colors
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Initialize tracing from the application configuration.
pub fn init_from_config(config: &AppConfig) -> Result<()> {
    init(TracingConfig::from_app_config(config)?)
}

/// Install the global subscriber.
///
/// Idempotent: if a subscriber is already installed this returns `Ok(())`.
pub fn init(config: TracingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string().to_lowercase()));

    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_file(config.with_file_and_line)
        .with_line_number(config.with_file_and_line);

    let fmt_layer = match config.format {
        LogFormat::Pretty => base.pretty().with_ansi(config.with_ansi).boxed(),
        LogFormat::Compact => base.compact().with_ansi(false).boxed(),
        LogFormat::Json => base.json().boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
        .or_else(|e| {
            if e.to_string()
                .contains("a global default trace dispatcher has already been set")
            {
                Ok(())
            } else {
                Err(anyhow!("Failed to initialize tracing: {}", e))
            }
        })
}

/// Parse log level string into tracing Level
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(&level.to_lowercase()).map_err(|_| {
        anyhow!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        )
    })
}
