//! Session lifecycle
//!
//! A session owns the transport from [`open`](Hp8562eSession::open) to
//! [`close`](Hp8562eSession::close):
//!
//! - open: flush stale input, `++auto 0`, `SNGLS`
//! - close: `CONTS` (best effort), then release the transport
//!
//! Every operation holds the session lock for its whole transaction. Replies
//! are correlated by position only, so a timeout or I/O failure in the middle
//! of a transaction leaves the stream in an unknown state: the session is
//! marked desynchronized and every later operation returns
//! [`Hp8562eError::Desynchronized`] until it is closed and reopened.

use crate::commands::{QueryBatch, SweepMode, SweepRequest};
use crate::config::Hp8562eConfig;
use crate::error::{Hp8562eError, Result};
use crate::instrument::InstrumentLink;
use crate::mock::MockAnalyzer;
use crate::prologix::PrologixLink;
use crate::trace::{CalibratedTrace, RawTrace, TraceParameters};
use daq_core::transport::LineTransport;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::instrument;

struct SessionState<T> {
    link: InstrumentLink<T>,
    desynchronized: bool,
}

impl<T> SessionState<T> {
    fn track<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(err) = &result {
            if err.is_fatal() && !self.desynchronized {
                tracing::warn!("HP 8562E: session desynchronized: {}", err);
                self.desynchronized = true;
            }
        }
        result
    }
}

/// An open connection to an HP 8562E in single-sweep mode.
pub struct Hp8562eSession<T: LineTransport = Box<dyn LineTransport>> {
    state: Mutex<SessionState<T>>,
}

impl<T: LineTransport> Hp8562eSession<T> {
    /// Take ownership of `transport` and put bridge and analyzer into a known
    /// state.
    ///
    /// # Errors
    /// Any failure of the initialization writes. The transport has been
    /// released by the time the error is returned.
    pub async fn open(transport: T, read_timeout: Duration) -> Result<Self> {
        let mut link = InstrumentLink::new(PrologixLink::new(transport, read_timeout));

        if let Err(err) = Self::initialize(&mut link).await {
            if let Err(close_err) = link.release().await {
                tracing::warn!("HP 8562E: failed to release transport: {}", close_err);
            }
            return Err(err);
        }

        tracing::info!("HP 8562E: session open (single-sweep mode)");
        Ok(Self {
            state: Mutex::new(SessionState {
                link,
                desynchronized: false,
            }),
        })
    }

    async fn initialize(link: &mut InstrumentLink<T>) -> Result<()> {
        let stale = link.bus().clear_input().await?;
        if stale > 0 {
            tracing::debug!("HP 8562E: flushed {} stale bytes", stale);
        }
        link.bus().disable_auto_read().await?;
        link.set_sweep_mode(SweepMode::Single).await
    }

    async fn lock_synchronized(&self) -> Result<MutexGuard<'_, SessionState<T>>> {
        let state = self.state.lock().await;
        if state.desynchronized {
            return Err(Hp8562eError::Desynchronized);
        }
        Ok(state)
    }

    /// Whether an earlier transport failure has poisoned this session.
    pub async fn is_desynchronized(&self) -> bool {
        self.state.lock().await.desynchronized
    }

    /// Send a query batch and return one raw reply per field.
    pub async fn query(&self, batch: &QueryBatch) -> Result<Vec<String>> {
        let mut state = self.lock_synchronized().await?;
        let result = state.link.query(batch).await;
        state.track(result)
    }

    /// Current calibration settings, read fresh from the analyzer.
    pub async fn trace_parameters(&self) -> Result<TraceParameters> {
        let mut state = self.lock_synchronized().await?;
        let result = state.link.trace_parameters().await;
        state.track(result)
    }

    /// Take one sweep and return it in display counts.
    pub async fn fetch_raw_trace(&self) -> Result<RawTrace> {
        let mut state = self.lock_synchronized().await?;
        let result = state.link.fetch_trace().await;
        state.track(result)
    }

    /// Read the calibration settings, take a sweep and convert it.
    ///
    /// Both transactions run under one lock, so no other operation can change
    /// the settings between the parameter query and the trace fetch.
    #[instrument(skip(self), err)]
    pub async fn acquire(&self) -> Result<CalibratedTrace> {
        let mut state = self.lock_synchronized().await?;

        let parameters = state.link.trace_parameters().await;
        let parameters = state.track(parameters)?;
        let raw = state.link.fetch_trace().await;
        let raw = state.track(raw)?;

        let trace = CalibratedTrace::calibrate(&parameters, raw);
        tracing::debug!(
            "HP 8562E: acquired {} points, {} to {} Hz",
            trace.len(),
            parameters.start_frequency,
            parameters.stop_frequency
        );
        Ok(trace)
    }

    /// Set span and resolution bandwidth.
    #[instrument(skip(self), err)]
    pub async fn configure_sweep(&self, request: &SweepRequest) -> Result<()> {
        let mut state = self.lock_synchronized().await?;
        let result = state.link.configure_sweep(request).await;
        state.track(result)
    }

    pub async fn set_sweep_mode(&self, mode: SweepMode) -> Result<()> {
        let mut state = self.lock_synchronized().await?;
        let result = state.link.set_sweep_mode(mode).await;
        state.track(result)
    }

    /// Restore continuous sweep and release the transport.
    ///
    /// Never fails: a failed `CONTS` write is logged at warn and the transport
    /// is released regardless. Also valid on a desynchronized session.
    pub async fn close(self) {
        let mut state = self.state.into_inner();

        if let Err(err) = state.link.set_sweep_mode(SweepMode::Continuous).await {
            tracing::warn!("HP 8562E: failed to restore continuous sweep: {}", err);
        }
        if let Err(err) = state.link.release().await {
            tracing::warn!("HP 8562E: failed to release transport: {}", err);
        }
        tracing::info!("HP 8562E: session closed");
    }
}

impl Hp8562eSession {
    /// Validate `config`, open its transport and start a session.
    ///
    /// `mock = true` runs against [`MockAnalyzer`]; otherwise the serial port
    /// named by `port` is opened (requires the `instrument_serial` feature).
    pub async fn connect(config: &Hp8562eConfig) -> Result<Self> {
        config.validate()?;

        let transport: Box<dyn LineTransport> = if config.mock {
            tracing::info!("HP 8562E: using mock analyzer");
            Box::new(MockAnalyzer::new(config.mock_trace_points))
        } else {
            open_serial(config).await?
        };

        Self::open(transport, config.read_timeout()).await
    }
}

#[cfg(feature = "instrument_serial")]
async fn open_serial(config: &Hp8562eConfig) -> Result<Box<dyn LineTransport>> {
    use daq_core::serial::{open_serial_async, SerialTransport};

    let port = open_serial_async(&config.port, config.baud_rate, "Prologix GPIB-USB")
        .await
        .map_err(|e| Hp8562eError::TransportIo(format!("{:#}", e)))?;
    tracing::info!(
        "HP 8562E: opened {} at {} baud",
        config.port,
        config.baud_rate
    );
    Ok(Box::new(SerialTransport::new(port)))
}

#[cfg(not(feature = "instrument_serial"))]
async fn open_serial(config: &Hp8562eConfig) -> Result<Box<dyn LineTransport>> {
    Err(Hp8562eError::Config(format!(
        "cannot open '{}': built without the instrument_serial feature (use mock = true)",
        config.port
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn acquire_runs_both_transactions() {
        let mock = MockAnalyzer::new(11);
        let handle = mock.handle();
        let session = Hp8562eSession::open(mock, TIMEOUT).await.unwrap();

        let trace = session.acquire().await.unwrap();
        assert_eq!(trace.len(), 11);
        assert_eq!(trace.units(), "DBM");
        assert_eq!(handle.sweeps(), 1);

        session.close().await;
        assert!(handle.is_released());
    }

    #[tokio::test]
    async fn desynchronized_session_refuses_work_but_closes() {
        let mock = MockAnalyzer::default().with_reply_limit(3);
        let handle = mock.handle();
        let session = Hp8562eSession::open(mock, TIMEOUT).await.unwrap();

        let err = session.trace_parameters().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(session.is_desynchronized().await);

        let err = session.fetch_raw_trace().await.unwrap_err();
        assert!(matches!(err, Hp8562eError::Desynchronized));

        session.close().await;
        assert_eq!(handle.commands().last().map(String::as_str), Some("CONTS"));
        assert!(handle.is_released());
    }

    #[tokio::test]
    async fn malformed_reply_keeps_session_usable() {
        let mock = MockAnalyzer::new(3).with_trace(vec![]);
        let session = Hp8562eSession::open(mock, TIMEOUT).await.unwrap();

        let err = session.fetch_raw_trace().await.unwrap_err();
        assert!(matches!(err, Hp8562eError::MalformedResponse { .. }));
        assert!(!session.is_desynchronized().await);
        assert!(session.trace_parameters().await.is_ok());

        session.close().await;
    }

    #[tokio::test]
    async fn connect_rejects_invalid_config() {
        let config = Hp8562eConfig::default();
        let err = Hp8562eSession::connect(&config).await.err().unwrap();
        assert!(matches!(err, Hp8562eError::Config(_)));
    }

    #[tokio::test]
    async fn connect_mock() {
        let config = Hp8562eConfig {
            mock_trace_points: 21,
            ..Hp8562eConfig::mock()
        };
        let session = Hp8562eSession::connect(&config).await.unwrap();
        assert_eq!(session.acquire().await.unwrap().len(), 21);
        session.close().await;
    }
}
