//! Simulated Prologix bridge + HP 8562E for running without hardware.
//!
//! [`MockAnalyzer`] implements [`LineTransport`] and behaves like the real pair
//! on the wire: instrument replies queue up inside the "bridge" and only become
//! readable after `++read eoi` (or immediately while auto-read is on). It keeps
//! analyzer state so setters affect later queries, and generates a
//! deterministic single-peak trace.
//!
//! Tests keep a [`MockHandle`] to inspect the write log and whether the
//! transport was released after the session took ownership.

use crate::commands::{QueryField, SweepMode};
use crate::prologix::{AUTO_READ_OFF, LINE_TERMINATOR, READ_EOI};
use async_trait::async_trait;
use daq_core::transport::{LineTransport, TransportError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Default number of trace points (HP 8562E display resolution).
pub const DEFAULT_TRACE_POINTS: usize = 601;

/// Analyzer settings held by the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct MockSettings {
    pub start_frequency: f64,
    pub stop_frequency: f64,
    pub reference_level: f64,
    pub resolution_bandwidth: f64,
    pub video_bandwidth: f64,
    pub sweep_time: f64,
    pub log_scale: f64,
    pub units: String,
    pub mode: SweepMode,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            start_frequency: 0.0,
            stop_frequency: 2.9e9,
            reference_level: 0.0,
            resolution_bandwidth: 1.0e6,
            video_bandwidth: 1.0e6,
            sweep_time: 0.05,
            log_scale: 10.0,
            units: "DBM".to_string(),
            mode: SweepMode::Continuous,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    writes: Vec<String>,
    released: bool,
    sweeps: u64,
}

/// Inspection handle onto a [`MockAnalyzer`] that has been moved into a session.
#[derive(Debug, Clone)]
pub struct MockHandle {
    shared: Arc<Mutex<Shared>>,
}

impl MockHandle {
    /// Every line written, terminator stripped, in order.
    pub fn writes(&self) -> Vec<String> {
        self.shared.lock().writes.clone()
    }

    /// Writes that were not `++read eoi`.
    pub fn commands(&self) -> Vec<String> {
        self.shared
            .lock()
            .writes
            .iter()
            .filter(|w| w.as_str() != READ_EOI)
            .cloned()
            .collect()
    }

    pub fn is_released(&self) -> bool {
        self.shared.lock().released
    }

    /// Number of `TS` (take sweep) commands executed.
    pub fn sweeps(&self) -> u64 {
        self.shared.lock().sweeps
    }
}

/// In-process bridge + analyzer.
pub struct MockAnalyzer {
    settings: MockSettings,
    trace_points: usize,
    trace_override: Option<Vec<f64>>,
    auto_read: bool,
    /// Replies the instrument has produced but the bridge has not yet read.
    pending: VecDeque<String>,
    /// Lines sitting in the serial receive buffer.
    readable: VecDeque<String>,
    replies_left: Option<usize>,
    fail_writes_from: Option<usize>,
    shared: Arc<Mutex<Shared>>,
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_POINTS)
    }
}

impl MockAnalyzer {
    pub fn new(trace_points: usize) -> Self {
        Self {
            settings: MockSettings::default(),
            trace_points: trace_points.max(1),
            trace_override: None,
            // Prologix power-on default
            auto_read: true,
            pending: VecDeque::new(),
            readable: VecDeque::new(),
            replies_left: None,
            fail_writes_from: None,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    pub fn with_settings(mut self, settings: MockSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Return these display counts from `TRA?` instead of the generated peak.
    pub fn with_trace(mut self, counts: Vec<f64>) -> Self {
        self.trace_override = Some(counts);
        self
    }

    /// The instrument goes silent after producing `count` replies.
    pub fn with_reply_limit(mut self, count: usize) -> Self {
        self.replies_left = Some(count);
        self
    }

    /// Writes with zero-based index `index` and later fail with `BrokenPipe`.
    pub fn fail_writes_from(mut self, index: usize) -> Self {
        self.fail_writes_from = Some(index);
        self
    }

    /// Put bytes in the receive buffer as if left over from a previous run.
    pub fn with_stale_line(mut self, line: &str) -> Self {
        self.readable.push_back(line.to_string());
        self
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn settings(&self) -> &MockSettings {
        &self.settings
    }

    fn handle_controller(&mut self, command: &str) {
        match command {
            AUTO_READ_OFF => self.auto_read = false,
            "++auto 1" => self.auto_read = true,
            READ_EOI | "++read" => {
                if let Some(reply) = self.pending.pop_front() {
                    self.readable.push_back(reply);
                }
            }
            other => tracing::debug!("Mock bridge ignoring {:?}", other),
        }
    }

    fn handle_instrument(&mut self, line: &str) {
        for command in line.split(';').map(str::trim).filter(|c| !c.is_empty()) {
            self.execute(command);
        }
        if self.auto_read {
            self.readable.extend(self.pending.drain(..));
        }
    }

    fn execute(&mut self, command: &str) {
        let upper = command.to_ascii_uppercase();
        if let Some(mnemonic) = upper.strip_suffix('?') {
            let reply = match mnemonic {
                "TRA" => Some(self.trace_reply()),
                _ => QueryField::from_mnemonic(mnemonic).map(|field| self.field_reply(field)),
            };
            match reply {
                Some(reply) => self.produce(reply),
                None => tracing::warn!("Mock analyzer: unknown query {:?}", command),
            }
            return;
        }

        let mut parts = upper.split_whitespace();
        let head = parts.next().unwrap_or_default();
        let argument = parts.next().and_then(|v| v.parse::<f64>().ok());
        match (head, argument) {
            ("SNGLS", _) => self.settings.mode = SweepMode::Single,
            ("CONTS", _) => self.settings.mode = SweepMode::Continuous,
            ("TS", _) => self.shared.lock().sweeps += 1,
            ("TDF", _) => {}
            ("FA", Some(hz)) => self.settings.start_frequency = hz,
            ("FB", Some(hz)) => self.settings.stop_frequency = hz,
            ("RB", Some(hz)) => self.settings.resolution_bandwidth = hz,
            ("VB", Some(hz)) => self.settings.video_bandwidth = hz,
            ("RL", Some(level)) => self.settings.reference_level = level,
            _ => tracing::warn!("Mock analyzer: unknown command {:?}", command),
        }
    }

    fn produce(&mut self, reply: String) {
        if let Some(left) = self.replies_left.as_mut() {
            if *left == 0 {
                return;
            }
            *left -= 1;
        }
        self.pending.push_back(format!("{}{}", reply, LINE_TERMINATOR));
    }

    fn field_reply(&self, field: QueryField) -> String {
        let s = &self.settings;
        match field {
            QueryField::StartFrequency => format!("{:E}", s.start_frequency),
            QueryField::StopFrequency => format!("{:E}", s.stop_frequency),
            QueryField::ReferenceLevel => format!("{:.2}", s.reference_level),
            QueryField::ResolutionBandwidth => format!("{:E}", s.resolution_bandwidth),
            QueryField::VideoBandwidth => format!("{:E}", s.video_bandwidth),
            QueryField::SweepTime => format!("{:E}", s.sweep_time),
            QueryField::LogScale => format!("{:.0}", s.log_scale),
            QueryField::AmplitudeUnits => s.units.clone(),
        }
    }

    fn trace_reply(&self) -> String {
        let counts = match &self.trace_override {
            Some(counts) => counts.clone(),
            None => peak_trace(self.trace_points),
        };
        counts
            .iter()
            .map(|c| format!("{}", c))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Noise floor near the bottom graticule with one peak at the reference level.
fn peak_trace(points: usize) -> Vec<f64> {
    let center = (points / 2) as f64;
    let width = (points as f64 / 50.0).max(1.0);
    (0..points)
        .map(|i| {
            let x = (i as f64 - center) / width;
            let ripple = ((i * 7919) % 13) as f64;
            (120.0 + ripple + 480.0 / (1.0 + x * x)).round().min(600.0)
        })
        .collect()
}

#[async_trait]
impl LineTransport for MockAnalyzer {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        {
            let mut shared = self.shared.lock();
            if shared.released {
                return Err(std::io::Error::from(std::io::ErrorKind::NotConnected).into());
            }
            if self
                .fail_writes_from
                .is_some_and(|index| shared.writes.len() >= index)
            {
                return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
            }
        }

        let text = String::from_utf8_lossy(bytes);
        for line in text.split(LINE_TERMINATOR).filter(|l| !l.is_empty()) {
            self.shared.lock().writes.push(line.to_string());
            if line.starts_with("++") {
                self.handle_controller(line);
            } else {
                self.handle_instrument(line);
            }
        }
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<String, TransportError> {
        if self.shared.lock().released {
            return Err(std::io::Error::from(std::io::ErrorKind::NotConnected).into());
        }
        match self.readable.pop_front() {
            Some(line) => Ok(line),
            None => {
                tokio::time::sleep(timeout).await;
                Err(TransportError::Timeout(timeout))
            }
        }
    }

    async fn clear_input(&mut self) -> Result<usize, TransportError> {
        let discarded = self.readable.drain(..).map(|line| line.len()).sum();
        Ok(discarded)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.shared.lock().released = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn replies_wait_for_read_eoi_once_auto_read_is_off() {
        let mut mock = MockAnalyzer::default();
        mock.write(b"++auto 0\r\n").await.unwrap();
        mock.write(b"RL?;\r\n").await.unwrap();

        assert!(mock.read_line(WAIT).await.is_err());

        mock.write(b"++read eoi\r\n").await.unwrap();
        assert_eq!(mock.read_line(WAIT).await.unwrap(), "0.00\r\n");
    }

    #[tokio::test]
    async fn auto_read_releases_replies_immediately() {
        let mut mock = MockAnalyzer::default();
        mock.write(b"AUNITS?;\r\n").await.unwrap();
        assert_eq!(mock.read_line(WAIT).await.unwrap(), "DBM\r\n");
    }

    #[tokio::test]
    async fn setters_change_later_replies() {
        let mut mock = MockAnalyzer::default();
        mock.write(b"++auto 0\r\n").await.unwrap();
        mock.write(b"FA 1000000; FB 2000000; RB 3000\r\n").await.unwrap();

        assert_eq!(mock.settings().start_frequency, 1.0e6);
        assert_eq!(mock.settings().stop_frequency, 2.0e6);
        assert_eq!(mock.settings().resolution_bandwidth, 3000.0);

        mock.write(b"FA?;\r\n++read eoi\r\n").await.unwrap();
        let reply = mock.read_line(WAIT).await.unwrap();
        assert_eq!(reply.trim().parse::<f64>().unwrap(), 1.0e6);
    }

    #[tokio::test]
    async fn trace_fetch_counts_sweeps() {
        let mut mock = MockAnalyzer::new(5).with_trace(vec![600.0, 540.0]);
        let handle = mock.handle();
        mock.write(b"++auto 0\r\n").await.unwrap();
        mock.write(b"TS; TDF M; TRA?\r\n++read eoi\r\n").await.unwrap();

        assert_eq!(mock.read_line(WAIT).await.unwrap(), "600,540\r\n");
        assert_eq!(handle.sweeps(), 1);
    }

    #[test]
    fn generated_trace_peaks_at_reference_count() {
        let trace = peak_trace(601);
        assert_eq!(trace.len(), 601);
        let max = trace.iter().cloned().fold(f64::MIN, f64::max);
        assert_eq!(max, 600.0);
        assert!(trace.iter().all(|c| (100.0..=600.0).contains(c)));
    }

    #[tokio::test]
    async fn released_mock_rejects_io() {
        let mut mock = MockAnalyzer::default();
        let handle = mock.handle();
        mock.close().await.unwrap();
        assert!(handle.is_released());
        assert!(mock.write(b"SNGLS\r\n").await.is_err());
    }
}
