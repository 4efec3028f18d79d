//! # Spectrum DAQ
//!
//! Application layer around the HP 8562E driver: configuration loading,
//! tracing setup and output encoding shared by the `spectrum-daq` binary and
//! the integration tests.
//!
//! ## Crate Structure
//!
//! - **`config`**: `AppConfig`, loaded with figment from TOML and
//!   `SPECTRUM_DAQ_` environment variables.
//! - **`logging`**: `tracing-subscriber` initialization (pretty, compact or JSON).
//! - **`output`**: CSV and JSON encoding of traces and trace parameters.
//!
//! The instrument protocol itself lives in `daq-driver-hp8562e`; shared error
//! and transport types live in `daq-core`.

pub mod config;
pub mod logging;
pub mod output;

pub use daq_core::DaqError;
pub use daq_driver_hp8562e as hp8562e;
