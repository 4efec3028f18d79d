//! Trace and parameter printing.
//!
//! Writers take any [`std::io::Write`] so the binary can print to stdout and
//! tests can capture into a `Vec<u8>`. Nothing here touches the filesystem.

use daq_driver_hp8562e::{CalibratedTrace, TraceParameters};
use std::io::Write;
use thiserror::Error;

/// Output encoding selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// Pretty-printed JSON
    Json,
}

/// Errors raised while encoding output.
#[derive(Error, Debug)]
pub enum OutputError {
    /// Underlying write failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding failed
    #[cfg(feature = "output_csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Format compiled out
    #[error("{0} output requires the output_{0} feature")]
    FeatureDisabled(&'static str),
}

/// Write a calibrated trace.
///
/// CSV has one `frequency_hz,power_<units>` row per point. JSON is the
/// trace object with `frequency`, `power` and `units` fields.
pub fn write_trace<W: Write>(
    out: W,
    trace: &CalibratedTrace,
    format: OutputFormat,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Csv => write_trace_csv(out, trace),
        OutputFormat::Json => write_json(out, trace),
    }
}

/// Write trace parameters as `field,value` rows or a JSON object.
pub fn write_parameters<W: Write>(
    out: W,
    parameters: &TraceParameters,
    format: OutputFormat,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Csv => write_parameters_csv(out, parameters),
        OutputFormat::Json => write_json(out, parameters),
    }
}

fn write_json<W: Write, T: serde::Serialize>(mut out: W, value: &T) -> Result<(), OutputError> {
    serde_json::to_writer_pretty(&mut out, value)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

#[cfg(feature = "output_csv")]
fn write_trace_csv<W: Write>(out: W, trace: &CalibratedTrace) -> Result<(), OutputError> {
    let mut writer = csv::Writer::from_writer(out);
    let power_column = format!("power_{}", trace.units().to_lowercase());
    writer.write_record(["frequency_hz", power_column.as_str()])?;
    for (frequency, power) in trace.points() {
        writer.write_record(&[frequency.to_string(), power.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(feature = "output_csv")]
fn write_parameters_csv<W: Write>(out: W, p: &TraceParameters) -> Result<(), OutputError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["field", "value"])?;
    let rows = [
        ("start_frequency", p.start_frequency.to_string()),
        ("stop_frequency", p.stop_frequency.to_string()),
        ("reference_level", p.reference_level.to_string()),
        ("resolution_bandwidth", p.resolution_bandwidth.to_string()),
        ("view_bandwidth", p.view_bandwidth.to_string()),
        ("sweep_time", p.sweep_time.to_string()),
        ("log_scale", p.log_scale.to_string()),
        ("units", p.units.clone()),
    ];
    for (field, value) in rows {
        writer.write_record([field, value.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(not(feature = "output_csv"))]
fn write_trace_csv<W: Write>(_out: W, _trace: &CalibratedTrace) -> Result<(), OutputError> {
    Err(OutputError::FeatureDisabled("csv"))
}

#[cfg(not(feature = "output_csv"))]
fn write_parameters_csv<W: Write>(_out: W, _p: &TraceParameters) -> Result<(), OutputError> {
    Err(OutputError::FeatureDisabled("csv"))
}
