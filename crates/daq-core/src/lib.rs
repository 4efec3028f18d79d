//! `daq-core`
//!
//! Shared building blocks for the spectrum-daq workspace.
//!
//! - [`error`]: workspace-wide [`DaqError`](error::DaqError) plus the
//!   categorised [`DriverError`](error::DriverError) driver crates convert into.
//! - [`transport`]: the [`LineTransport`](transport::LineTransport) trait,
//!   a write-bytes / read-one-line byte stream with a bounded wait.
//! - [`serial`]: async serial helpers and [`SerialTransport`](serial::SerialTransport),
//!   the stream-backed `LineTransport` used for real hardware.

pub mod error;
pub mod serial;
pub mod transport;

pub use error::{DaqError, DriverError, DriverErrorKind};
pub use transport::{LineTransport, TransportError};
