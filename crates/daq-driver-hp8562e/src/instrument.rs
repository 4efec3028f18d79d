//! Instrument command layer
//!
//! Builds HP 8562E command strings, sends them through the [`PrologixLink`] and
//! pairs every query with exactly one `++read eoi` round trip.

use crate::commands::{QueryBatch, SweepMode, SweepRequest, TRACE_FETCH};
use crate::error::Result;
use crate::prologix::PrologixLink;
use crate::trace::{RawTrace, TraceParameters};
use daq_core::transport::{LineTransport, TransportError};
use tracing::instrument;

/// Analyzer-directed command layer.
pub struct InstrumentLink<T> {
    bus: PrologixLink<T>,
}

impl<T: LineTransport> InstrumentLink<T> {
    pub fn new(bus: PrologixLink<T>) -> Self {
        Self { bus }
    }

    /// Access the controller layer (session setup uses it directly).
    pub fn bus(&mut self) -> &mut PrologixLink<T> {
        &mut self.bus
    }

    /// Send all queries in one write, then read one reply per query.
    ///
    /// Replies are returned raw (with line endings), in field order. The batch
    /// length is the read count; a short reply stream surfaces as
    /// `TransportTimeout` on the first missing line.
    #[instrument(skip(self), fields(fields = batch.len()), err)]
    pub async fn query(&mut self, batch: &QueryBatch) -> Result<Vec<String>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        self.bus.write_line(&batch.command()).await?;

        let mut replies = Vec::with_capacity(batch.len());
        for field in batch.fields() {
            let awaiting = format!("{}?", field.mnemonic());
            replies.push(self.bus.read_reply_to(&awaiting).await?);
        }
        Ok(replies)
    }

    /// Write a command that produces no reply.
    pub async fn set(&mut self, command: &str) -> Result<()> {
        self.bus.write_line(command).await
    }

    pub async fn set_sweep_mode(&mut self, mode: SweepMode) -> Result<()> {
        self.set(mode.command()).await
    }

    pub async fn configure_sweep(&mut self, request: &SweepRequest) -> Result<()> {
        self.set(&request.command()).await
    }

    /// Query and parse the eight calibration fields.
    pub async fn trace_parameters(&mut self) -> Result<TraceParameters> {
        let replies = self.query(&QueryBatch::trace_parameters()).await?;
        TraceParameters::from_replies(&replies)
    }

    /// Take a fresh sweep and read trace A in display counts.
    #[instrument(skip(self), err)]
    pub async fn fetch_trace(&mut self) -> Result<RawTrace> {
        self.bus.write_line(TRACE_FETCH).await?;
        let line = self.bus.read_reply_to(TRACE_FETCH).await?;
        let raw = RawTrace::parse(&line)?;
        tracing::debug!("Fetched trace with {} points", raw.len());
        Ok(raw)
    }

    pub async fn release(self) -> std::result::Result<(), TransportError> {
        self.bus.release().await
    }
}
