use crate::error::{Hp8562eError, Result};
use crate::mock::DEFAULT_TRACE_POINTS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prologix GPIB-USB default line rate.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Default per-line read timeout in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 2_000;

/// Configuration for an HP 8562E behind a Prologix bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hp8562eConfig {
    /// Serial device of the bridge (e.g. `/dev/ttyUSB0`, `COM3`)
    #[serde(default)]
    pub port: String,

    /// Line rate (default: 57600)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Bound on each reply line, in milliseconds (default: 2000)
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Talk to the in-process simulator instead of a serial port
    #[serde(default)]
    pub mock: bool,

    /// Points per simulated trace (default: 601)
    #[serde(default = "default_mock_trace_points")]
    pub mock_trace_points: usize,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

fn default_mock_trace_points() -> usize {
    DEFAULT_TRACE_POINTS
}

impl Default for Hp8562eConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            mock: false,
            mock_trace_points: DEFAULT_TRACE_POINTS,
        }
    }
}

impl Hp8562eConfig {
    /// Simulator configuration with default settings.
    pub fn mock() -> Self {
        Self {
            mock: true,
            ..Default::default()
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.mock && self.port.trim().is_empty() {
            return Err(Hp8562eError::Config(
                "'port' must be set unless mock = true".to_string(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(Hp8562eError::Config("'baud_rate' cannot be 0".to_string()));
        }
        if self.read_timeout_ms == 0 {
            return Err(Hp8562eError::Config(
                "'read_timeout_ms' cannot be 0".to_string(),
            ));
        }
        if self.mock && self.mock_trace_points == 0 {
            return Err(Hp8562eError::Config(
                "'mock_trace_points' cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: Hp8562eConfig = toml::from_str(r#"port = "/dev/ttyUSB0""#).unwrap();
        assert_eq!(cfg.baud_rate, 57_600);
        assert_eq!(cfg.read_timeout(), Duration::from_secs(2));
        assert!(!cfg.mock);
        assert_eq!(cfg.mock_trace_points, 601);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn port_required_without_mock() {
        let cfg = Hp8562eConfig::default();
        assert!(matches!(cfg.validate(), Err(Hp8562eError::Config(_))));
        assert!(Hp8562eConfig::mock().validate().is_ok());
    }

    #[test]
    fn rejects_zero_timeout() {
        let cfg = Hp8562eConfig {
            read_timeout_ms: 0,
            ..Hp8562eConfig::mock()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_empty_mock_trace() {
        let cfg = Hp8562eConfig {
            mock_trace_points: 0,
            ..Hp8562eConfig::mock()
        };
        assert!(cfg.validate().is_err());
    }
}
