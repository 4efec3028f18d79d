//! Trace data model and display-count calibration.
//!
//! In `TDF M` (measurement units) transfer format the analyzer returns each
//! trace point as a display count. The graticule is 10 divisions of 60 counts
//! with the reference level on the top line at count 600, so a point converts
//! to amplitude units as
//!
//! ```text
//! power = reference_level + (count - 600) / 60 * log_scale
//! ```
//!
//! and point `i` of `N` sits at `start + (stop - start) / N * i`.

use crate::commands::QueryField;
use crate::error::{Hp8562eError, Result};
use serde::Serialize;

/// Display count of the reference level graticule line.
pub const REFERENCE_COUNTS: f64 = 600.0;

/// Display counts per vertical division.
pub const COUNTS_PER_DIVISION: f64 = 60.0;

/// Analyzer settings needed to calibrate one trace.
///
/// Always read fresh from the instrument; the front panel may change any of
/// these between acquisitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceParameters {
    pub start_frequency: f64,
    pub stop_frequency: f64,
    pub reference_level: f64,
    pub resolution_bandwidth: f64,
    pub view_bandwidth: f64,
    pub sweep_time: f64,
    /// Amplitude units per division.
    pub log_scale: f64,
    pub units: String,
}

impl TraceParameters {
    /// Build from the replies to [`QueryBatch::trace_parameters`](crate::QueryBatch::trace_parameters),
    /// in field order.
    ///
    /// # Errors
    /// [`Hp8562eError::MalformedResponse`] if fewer than eight replies are given,
    /// a numeric field does not parse, or the stop frequency is below the start.
    pub fn from_replies(replies: &[String]) -> Result<Self> {
        let fields = QueryField::TRACE_PARAMETERS;
        if replies.len() < fields.len() {
            return Err(Hp8562eError::malformed(
                "trace parameters",
                format!("{} of {} replies: {:?}", replies.len(), fields.len(), replies),
            ));
        }

        let mut numeric = [0.0f64; 7];
        for (slot, (field, raw)) in numeric.iter_mut().zip(fields.iter().zip(replies)) {
            *slot = parse_numeric_reply(*field, raw)?;
        }
        let [start_frequency, stop_frequency, reference_level, resolution_bandwidth, view_bandwidth, sweep_time, log_scale] =
            numeric;

        if stop_frequency < start_frequency {
            return Err(Hp8562eError::malformed(
                "frequency span",
                format!("FA {} > FB {}", start_frequency, stop_frequency),
            ));
        }

        Ok(Self {
            start_frequency,
            stop_frequency,
            reference_level,
            resolution_bandwidth,
            view_bandwidth,
            sweep_time,
            log_scale,
            units: strip_line_ending(&replies[7]).to_string(),
        })
    }

    pub fn span(&self) -> f64 {
        self.stop_frequency - self.start_frequency
    }
}

/// Parse one numeric query reply (`"-10.00\r\n"` style).
pub fn parse_numeric_reply(field: QueryField, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Hp8562eError::malformed(field.label(), raw))
}

fn strip_line_ending(raw: &str) -> &str {
    raw.trim_end_matches(['\r', '\n'])
}

/// Trace points in display counts, exactly as transferred.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTrace {
    counts: Vec<f64>,
}

impl RawTrace {
    pub fn new(counts: Vec<f64>) -> Self {
        Self { counts }
    }

    /// Parse a `TRA?` reply: one line of comma-separated numbers.
    ///
    /// # Errors
    /// [`Hp8562eError::MalformedResponse`] naming the first token that is not a
    /// number (an empty line fails on its single empty token).
    pub fn parse(line: &str) -> Result<Self> {
        let body = strip_line_ending(line);
        let counts = body
            .split(',')
            .enumerate()
            .map(|(index, token)| {
                token.trim().parse::<f64>().map_err(|_| {
                    Hp8562eError::malformed(
                        format!("trace point {}", index),
                        format!("token {:?} in {:?}", token, line),
                    )
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(Self { counts })
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }
}

/// Frequency and power arrays of one sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibratedTrace {
    frequency: Vec<f64>,
    power: Vec<f64>,
    units: String,
}

impl CalibratedTrace {
    /// Convert display counts to engineering units. Consumes the raw trace.
    pub fn calibrate(parameters: &TraceParameters, raw: RawTrace) -> Self {
        let n = raw.len();
        let step = if n == 0 {
            0.0
        } else {
            parameters.span() / n as f64
        };
        let frequency = (0..n)
            .map(|i| parameters.start_frequency + step * i as f64)
            .collect();
        let power = raw
            .counts
            .into_iter()
            .map(|count| {
                parameters.reference_level
                    + (count - REFERENCE_COUNTS) / COUNTS_PER_DIVISION * parameters.log_scale
            })
            .collect();

        Self {
            frequency,
            power,
            units: parameters.units.clone(),
        }
    }

    /// Frequencies in Hz.
    pub fn frequency(&self) -> &[f64] {
        &self.frequency
    }

    /// Powers in [`units`](Self::units).
    pub fn power(&self) -> &[f64] {
        &self.power
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency.is_empty()
    }

    /// `(frequency, power)` pairs in sweep order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequency.iter().copied().zip(self.power.iter().copied())
    }
}
