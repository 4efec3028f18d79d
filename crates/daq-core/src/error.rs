//! Custom error types for the application.
//!
//! This module defines the primary error type, `DaqError`, for the whole workspace.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! the kinds of errors that can occur, from I/O and configuration issues to
//! instrument-specific problems.
//!
//! ## Error Hierarchy
//!
//! `DaqError` consolidates the error sources the application layer sees:
//!
//! - **`Configuration`**: Semantic errors in the configuration, such as an empty serial
//!   port path or a zero read timeout. These are caught during the validation step.
//! - **`Io`**: Wraps standard `std::io::Error`, covering file and serial I/O issues.
//! - **`Driver`**: A categorised [`DriverError`]. Driver crates keep their own
//!   `thiserror` enums and convert into this variant with `From`, choosing the
//!   [`DriverErrorKind`] that best describes the failure.
//!
//! By using `#[from]`, `DaqError` can be created from underlying error types,
//! simplifying error handling throughout the application with the `?` operator.

use thiserror::Error;

// =============================================================================
// Driver Errors
// =============================================================================

/// Category of a [`DriverError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    Initialization,
    Configuration,
    Communication,
    Protocol,
    Shutdown,
    Timeout,
    InvalidParameter,
    Unknown,
}

impl std::fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DriverErrorKind::Initialization => "initialization",
            DriverErrorKind::Configuration => "configuration",
            DriverErrorKind::Communication => "communication",
            DriverErrorKind::Protocol => "protocol",
            DriverErrorKind::Shutdown => "shutdown",
            DriverErrorKind::Timeout => "timeout",
            DriverErrorKind::InvalidParameter => "invalid_parameter",
            DriverErrorKind::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

#[derive(Error, Debug, Clone)]
#[error("Driver '{driver_type}' {kind} error: {message}")]
pub struct DriverError {
    pub driver_type: String,
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn new(
        driver_type: impl Into<String>,
        kind: DriverErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            driver_type: driver_type.into(),
            kind,
            message: message.into(),
        }
    }

    /// True for failures after which the instrument link can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            DriverErrorKind::Communication | DriverErrorKind::Timeout
        )
    }
}

/// Primary error type for the DAQ application.
///
/// # Error Categories
///
/// 1. **Configuration Errors** - `Configuration`
///    - Occur during startup
///    - Recovery: fix the configuration file or CLI flags
///
/// 2. **Hardware/Communication Errors** - `Io`, `Driver`
///    - Occur during instrument communication
///    - Serial timeouts leave a positional protocol desynchronized, so the
///      recovery is to close the session and open a new one, never to resend
///
/// # Example
///
/// ```rust,ignore
/// use daq_core::error::DaqError;
///
/// fn check_port(port: &str) -> Result<(), DaqError> {
///     if port.is_empty() {
///         return Err(DaqError::Configuration("serial port path is empty".into()));
///     }
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum DaqError {
    /// Configuration failed semantic validation.
    ///
    /// **Error Type**: Permanent - requires fixing the configuration.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Wraps `std::io::Error` from file or serial port access.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structured driver error with category
    #[error("{0}")]
    Driver(#[from] DriverError),
}
