//! HP 8562E command vocabulary
//!
//! Instrument-directed strings only. Bridge-directed `++` commands live in
//! [`crate::prologix`].
//!
//! | Purpose              | Command                 | Replies        |
//! |----------------------|-------------------------|----------------|
//! | Parameter queries    | `FA?;FB?;...;AUNITS?;`  | one line each  |
//! | Span + bandwidth     | `FA <hz>; FB <hz>; RB <hz>` | none       |
//! | Sweep mode           | `SNGLS` / `CONTS`       | none           |
//! | Trace fetch          | `TS; TDF M; TRA?`       | one CSV line   |

use crate::error::{Hp8562eError, Result};
use serde::{Deserialize, Serialize};

/// Take a sweep, select numeric (measurement unit) transfer format, read trace A.
pub const TRACE_FETCH: &str = "TS; TDF M; TRA?";

/// A queryable analyzer setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryField {
    StartFrequency,
    StopFrequency,
    ReferenceLevel,
    ResolutionBandwidth,
    VideoBandwidth,
    SweepTime,
    LogScale,
    AmplitudeUnits,
}

impl QueryField {
    /// Fields needed to calibrate a trace, in reply order.
    pub const TRACE_PARAMETERS: [QueryField; 8] = [
        QueryField::StartFrequency,
        QueryField::StopFrequency,
        QueryField::ReferenceLevel,
        QueryField::ResolutionBandwidth,
        QueryField::VideoBandwidth,
        QueryField::SweepTime,
        QueryField::LogScale,
        QueryField::AmplitudeUnits,
    ];

    pub const fn mnemonic(self) -> &'static str {
        match self {
            QueryField::StartFrequency => "FA",
            QueryField::StopFrequency => "FB",
            QueryField::ReferenceLevel => "RL",
            QueryField::ResolutionBandwidth => "RB",
            QueryField::VideoBandwidth => "VB",
            QueryField::SweepTime => "ST",
            QueryField::LogScale => "LG",
            QueryField::AmplitudeUnits => "AUNITS",
        }
    }

    /// Human-readable name used in error messages.
    pub const fn label(self) -> &'static str {
        match self {
            QueryField::StartFrequency => "start frequency",
            QueryField::StopFrequency => "stop frequency",
            QueryField::ReferenceLevel => "reference level",
            QueryField::ResolutionBandwidth => "resolution bandwidth",
            QueryField::VideoBandwidth => "video bandwidth",
            QueryField::SweepTime => "sweep time",
            QueryField::LogScale => "log scale",
            QueryField::AmplitudeUnits => "amplitude units",
        }
    }

    /// Look a field up by its mnemonic (case-insensitive).
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        let upper = mnemonic.trim().to_ascii_uppercase();
        QueryField::TRACE_PARAMETERS
            .into_iter()
            .find(|field| field.mnemonic() == upper)
    }
}

/// An ordered set of queries sent as one write.
///
/// The instrument answers each query with its own line, so the batch is also
/// the reply count: a transaction built from a `QueryBatch` performs exactly
/// `len()` reads, in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBatch {
    fields: Vec<QueryField>,
}

impl QueryBatch {
    pub fn new(fields: impl IntoIterator<Item = QueryField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// The eight calibration fields.
    pub fn trace_parameters() -> Self {
        Self::new(QueryField::TRACE_PARAMETERS)
    }

    pub fn fields(&self) -> &[QueryField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `FA?;FB?;...;` (without line terminator).
    pub fn command(&self) -> String {
        self.fields
            .iter()
            .map(|field| format!("{}?;", field.mnemonic()))
            .collect()
    }
}

/// Analyzer sweep mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// One trigger, one completed trace.
    Single,
    /// Free-running sweeps (front panel default).
    Continuous,
}

impl SweepMode {
    pub const fn command(self) -> &'static str {
        match self {
            SweepMode::Single => "SNGLS",
            SweepMode::Continuous => "CONTS",
        }
    }
}

/// Requested span and resolution bandwidth, all in integer Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepRequest {
    start_hz: u64,
    stop_hz: u64,
    rbw_hz: u64,
}

impl SweepRequest {
    /// Validate and build a request.
    ///
    /// # Errors
    /// [`Hp8562eError::InvalidSweep`] if `start_hz >= stop_hz` or `rbw_hz == 0`.
    pub fn new(start_hz: u64, stop_hz: u64, rbw_hz: u64) -> Result<Self> {
        if start_hz >= stop_hz {
            return Err(Hp8562eError::InvalidSweep(format!(
                "start frequency {} Hz must be below stop frequency {} Hz",
                start_hz, stop_hz
            )));
        }
        if rbw_hz == 0 {
            return Err(Hp8562eError::InvalidSweep(
                "resolution bandwidth must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            start_hz,
            stop_hz,
            rbw_hz,
        })
    }

    pub fn start_hz(&self) -> u64 {
        self.start_hz
    }

    pub fn stop_hz(&self) -> u64 {
        self.stop_hz
    }

    pub fn rbw_hz(&self) -> u64 {
        self.rbw_hz
    }

    /// `FA <start>; FB <stop>; RB <rbw>` (without line terminator).
    pub fn command(&self) -> String {
        format!(
            "FA {}; FB {}; RB {}",
            self.start_hz, self.stop_hz, self.rbw_hz
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_parameter_batch_command() {
        let batch = QueryBatch::trace_parameters();
        assert_eq!(batch.len(), 8);
        assert_eq!(batch.command(), "FA?;FB?;RL?;RB?;VB?;ST?;LG?;AUNITS?;");
    }

    #[test]
    fn single_field_batch_keeps_trailing_separator() {
        let batch = QueryBatch::new([QueryField::ReferenceLevel]);
        assert_eq!(batch.command(), "RL?;");
    }

    #[test]
    fn mnemonic_lookup_round_trips() {
        for field in QueryField::TRACE_PARAMETERS {
            assert_eq!(QueryField::from_mnemonic(field.mnemonic()), Some(field));
        }
        assert_eq!(QueryField::from_mnemonic("aunits"), Some(QueryField::AmplitudeUnits));
        assert_eq!(QueryField::from_mnemonic("TRA"), None);
    }

    #[test]
    fn sweep_request_formats_integers_with_single_delimiter() {
        let request = SweepRequest::new(1_000_000, 2_500_000_000, 100_000).unwrap();
        assert_eq!(request.command(), "FA 1000000; FB 2500000000; RB 100000");
        assert!(!request.command().contains('\r'));
        assert!(!request.command().contains('\n'));
    }

    #[test]
    fn sweep_request_rejects_inverted_span() {
        let err = SweepRequest::new(2_000, 1_000, 10).unwrap_err();
        assert!(matches!(err, Hp8562eError::InvalidSweep(_)));
        assert!(SweepRequest::new(1_000, 1_000, 10).is_err());
    }

    #[test]
    fn sweep_request_rejects_zero_bandwidth() {
        assert!(SweepRequest::new(1_000, 2_000, 0).is_err());
    }

    #[test]
    fn sweep_mode_commands() {
        assert_eq!(SweepMode::Single.command(), "SNGLS");
        assert_eq!(SweepMode::Continuous.command(), "CONTS");
    }
}
