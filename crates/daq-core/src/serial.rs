//! Serial Port Abstractions for Driver Crates
//!
//! This module provides shared types and utilities for async serial communication
//! that can be used by driver crates without duplicating definitions.
//!
//! # Feature Flag
//!
//! Opening real ports requires the `serial` feature:
//!
//! ```toml
//! [dependencies]
//! daq-core = { path = "../daq-core", features = ["serial"] }
//! ```
//!
//! # Types
//!
//! - [`SerialPortIO`]: Trait alias combining AsyncRead + AsyncWrite for serial ports
//! - [`DynSerial`]: Type-erased boxed serial port
//! - [`SerialTransport`]: Buffered [`LineTransport`] over any `SerialPortIO`
//!
//! # Utilities
//!
//! - [`open_serial_async`]: Open a serial port with spawn_blocking
//! - [`drain_serial_buffer`]: Drain stale data from a serial port
//!
//! # Example
//!
//! ```rust,ignore
//! use daq_core::serial::{open_serial_async, SerialTransport};
//!
//! let port = open_serial_async("/dev/ttyUSB0", 57600, "Prologix").await?;
//! let mut transport = SerialTransport::new(Box::new(port));
//! transport.clear_input().await?;
//! ```

use crate::transport::{LineTransport, TransportError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

/// How long [`SerialTransport::clear_input`] listens for stale bytes.
pub const DEFAULT_DRAIN_MS: u64 = 50;

// =============================================================================
// Serial Port Trait
// =============================================================================

/// Trait alias for async serial port I/O.
///
/// Any type implementing `AsyncRead + AsyncWrite + Unpin + Send` can be used
/// as a serial port. This includes:
/// - `tokio_serial::SerialStream` (real hardware)
/// - `tokio::io::DuplexStream` (testing)
pub trait SerialPortIO: AsyncRead + AsyncWrite + Unpin + Send {}

// Blanket implementation for all types meeting the requirements
impl<T: AsyncRead + AsyncWrite + Unpin + Send> SerialPortIO for T {}

/// Type-erased boxed serial port.
pub type DynSerial = Box<dyn SerialPortIO>;

// =============================================================================
// Serial Port Utilities
// =============================================================================

/// Open a serial port asynchronously using spawn_blocking.
///
/// Standard settings are applied: 8N1, no flow control.
///
/// # Parameters
///
/// - `port_path`: Path to the serial port (e.g., "/dev/ttyUSB0")
/// - `baud_rate`: Baud rate (e.g., 9600, 57600)
/// - `device_name`: Human-readable device name for error messages
///
/// # Errors
///
/// Returns an error if the port cannot be opened or spawn_blocking fails.
#[cfg(feature = "serial")]
pub async fn open_serial_async(
    port_path: &str,
    baud_rate: u32,
    device_name: &str,
) -> anyhow::Result<tokio_serial::SerialStream> {
    use anyhow::Context;
    use tokio::task::spawn_blocking;
    use tokio_serial::SerialPortBuilderExt;

    let port_path_owned = port_path.to_string();
    let device_name_owned = device_name.to_string();

    spawn_blocking(move || {
        tokio_serial::new(&port_path_owned, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .context(format!(
                "Failed to open {} serial port: {}",
                device_name_owned, port_path_owned
            ))
    })
    .await
    .context("spawn_blocking for serial port opening failed")?
}

/// Drain stale data from a serial port buffer.
///
/// Reads and discards data until nothing more arrives before the deadline.
///
/// # Returns
///
/// Total number of bytes discarded.
pub async fn drain_serial_buffer<R: AsyncRead + Unpin>(port: &mut R, timeout_ms: u64) -> usize {
    let mut discard = [0u8; 256];
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    let mut total_discarded = 0usize;

    loop {
        if tokio::time::Instant::now() >= deadline {
            break;
        }

        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match tokio::time::timeout(remaining, port.read(&mut discard)).await {
            Ok(Ok(0)) => break, // EOF or no more data
            Ok(Ok(n)) => {
                total_discarded += n;
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Ok(Err(_)) => break, // Real I/O error, abort drain
            Err(_) => break,     // Timeout, no more immediate data
        }
    }

    total_discarded
}

// =============================================================================
// SerialTransport
// =============================================================================

/// Buffered line transport over a serial-like stream.
pub struct SerialTransport<S = DynSerial> {
    port: BufReader<S>,
    drain_ms: u64,
}

impl<S: SerialPortIO> SerialTransport<S> {
    pub fn new(port: S) -> Self {
        Self {
            port: BufReader::new(port),
            drain_ms: DEFAULT_DRAIN_MS,
        }
    }

    /// Set how long `clear_input` listens for stale bytes.
    pub fn with_drain_ms(mut self, drain_ms: u64) -> Self {
        self.drain_ms = drain_ms;
        self
    }
}

#[async_trait]
impl<S: SerialPortIO> LineTransport for SerialTransport<S> {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let port = self.port.get_mut();
        port.write_all(bytes).await?;
        port.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<String, TransportError> {
        let mut line = Vec::new();
        match tokio::time::timeout(timeout, self.port.read_until(b'\n', &mut line)).await {
            Ok(Ok(0)) => Err(TransportError::Closed),
            Ok(Ok(_)) => Ok(String::from_utf8_lossy(&line).into_owned()),
            Ok(Err(e)) => Err(TransportError::Io(e)),
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }

    async fn clear_input(&mut self) -> Result<usize, TransportError> {
        // BufReader may already hold bytes the stream handed over earlier
        let buffered = self.port.buffer().len();
        if buffered > 0 {
            self.port.consume(buffered);
        }
        let drained = drain_serial_buffer(self.port.get_mut(), self.drain_ms).await;
        let total = buffered + drained;
        if total > 0 {
            tracing::debug!("Discarded {} stale bytes", total);
        }
        Ok(total)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.port.get_mut().shutdown().await?;
        Ok(())
    }
}
