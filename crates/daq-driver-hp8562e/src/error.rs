//! Error types for HP 8562E operations.

use daq_core::error::{DaqError, DriverError, DriverErrorKind};
use daq_core::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for HP 8562E operations.
pub type Result<T> = std::result::Result<T, Hp8562eError>;

/// Errors raised by the bridge, the instrument command layer and the session.
#[derive(Error, Debug)]
pub enum Hp8562eError {
    /// No reply line arrived within the read timeout.
    #[error("timed out after {timeout:?} waiting for a reply to '{awaiting}'")]
    TransportTimeout { awaiting: String, timeout: Duration },

    /// A reply could not be parsed as the expected type.
    #[error("malformed {context} response: {raw:?}")]
    MalformedResponse { context: String, raw: String },

    /// The byte stream itself failed (write error, port gone, peer closed).
    #[error("transport I/O failure: {0}")]
    TransportIo(String),

    /// An earlier timeout or I/O failure left replies unaccounted for.
    #[error("session desynchronized by an earlier transport failure; reopen the session")]
    Desynchronized,

    /// Sweep request rejected before anything was written.
    #[error("invalid sweep request: {0}")]
    InvalidSweep(String),

    /// Driver configuration rejected.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Hp8562eError {
    pub(crate) fn from_transport(err: TransportError, awaiting: &str) -> Self {
        match err {
            TransportError::Timeout(timeout) => Self::TransportTimeout {
                awaiting: awaiting.to_string(),
                timeout,
            },
            TransportError::Closed => Self::TransportIo("stream closed by peer".to_string()),
            TransportError::Io(e) => Self::TransportIo(e.to_string()),
        }
    }

    pub(crate) fn malformed(context: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::MalformedResponse {
            context: context.into(),
            raw: raw.into(),
        }
    }

    /// True when the positional reply stream can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::TransportTimeout { .. } | Self::TransportIo(_) | Self::Desynchronized
        )
    }

    /// Check if this is a read timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TransportTimeout { .. })
    }
}

impl From<Hp8562eError> for DaqError {
    fn from(err: Hp8562eError) -> Self {
        let kind = match &err {
            Hp8562eError::TransportTimeout { .. } => DriverErrorKind::Timeout,
            Hp8562eError::MalformedResponse { .. } => DriverErrorKind::Protocol,
            Hp8562eError::TransportIo(_) | Hp8562eError::Desynchronized => {
                DriverErrorKind::Communication
            }
            Hp8562eError::InvalidSweep(_) => DriverErrorKind::InvalidParameter,
            Hp8562eError::Config(_) => DriverErrorKind::Configuration,
        };
        DaqError::Driver(DriverError::new("hp8562e", kind, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_transport_timeout() {
        let err = Hp8562eError::from_transport(
            TransportError::Timeout(Duration::from_secs(2)),
            "FA?",
        );
        assert!(err.is_timeout());
        assert!(err.is_fatal());
        assert!(err.to_string().contains("'FA?'"));
    }

    #[test]
    fn malformed_response_is_not_fatal() {
        let err = Hp8562eError::malformed("start frequency", "garbage\r\n");
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("garbage"));
    }

    #[test]
    fn converts_into_driver_error() {
        let err: DaqError = Hp8562eError::TransportIo("port unplugged".into()).into();
        match err {
            DaqError::Driver(driver) => {
                assert_eq!(driver.kind, DriverErrorKind::Communication);
                assert_eq!(driver.driver_type, "hp8562e");
                assert!(driver.is_fatal());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
