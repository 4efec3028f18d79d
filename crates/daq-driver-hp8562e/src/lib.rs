//! HP 8562E Spectrum Analyzer Driver (Prologix GPIB-USB)
//!
//! The analyzer sits on a GPIB bus behind a Prologix GPIB-USB controller. One
//! serial stream carries two command namespaces:
//!
//! - `++` commands configure the bridge ([`prologix`])
//! - everything else is forwarded to the analyzer ([`commands`], [`instrument`])
//!
//! Protocol Overview:
//! - Baud: 57600 (ignored by the bridge, USB CDC), 8N1, no flow control
//! - Terminator: CRLF on writes, LF on replies
//! - Auto-read disabled: each reply is fetched with `++read eoi`
//! - Queries batched in one write: `FA?;FB?;RL?;RB?;VB?;ST?;LG?;AUNITS?;`
//! - Trace: `TS; TDF M; TRA?` returns display counts, calibrated by
//!   [`CalibratedTrace::calibrate`]
//!
//! # Usage
//!
//! ```rust,ignore
//! use daq_driver_hp8562e::{Hp8562eConfig, Hp8562eSession, SweepRequest};
//!
//! let config = Hp8562eConfig { port: "/dev/ttyUSB0".into(), ..Default::default() };
//! let session = Hp8562eSession::connect(&config).await?;
//!
//! session.configure_sweep(&SweepRequest::new(1_000_000, 3_000_000_000, 1_000_000)?).await?;
//! let trace = session.acquire().await?;
//! for (hz, level) in trace.points() {
//!     println!("{hz},{level}");
//! }
//!
//! session.close().await;
//! ```
//!
//! # Mock Mode
//!
//! For testing without hardware, set `mock = true` in the configuration. The
//! session then talks to [`MockAnalyzer`], which answers the same wire
//! protocol.

pub mod commands;
pub mod config;
pub mod error;
pub mod instrument;
pub mod mock;
pub mod prologix;
pub mod session;
pub mod trace;

pub use commands::{QueryBatch, QueryField, SweepMode, SweepRequest};
pub use config::Hp8562eConfig;
pub use error::{Hp8562eError, Result};
pub use mock::{MockAnalyzer, MockHandle};
pub use session::Hp8562eSession;
pub use trace::{CalibratedTrace, RawTrace, TraceParameters};
