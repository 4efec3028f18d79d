//! Prologix GPIB-USB controller dialect
//!
//! The bridge shares one serial stream between its own configuration commands
//! (prefixed with `++`) and bytes forwarded to the addressed GPIB instrument.
//! Everything written here is terminated with CR LF.
//!
//! With auto-read disabled the bridge only talks to the instrument when told
//! to: `++read eoi` fetches one reply, ending at the instrument's EOI line.
//! Each expected reply therefore costs exactly one `++read eoi` plus one line
//! read; issuing more blocks until timeout, issuing fewer leaves stale lines
//! for the next transaction.

use crate::error::{Hp8562eError, Result};
use daq_core::transport::{LineTransport, TransportError};
use std::time::Duration;

/// Command terminator on the bridge side.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Stop the bridge from reading after every write.
pub const AUTO_READ_OFF: &str = "++auto 0";

/// Read one reply from the instrument, stopping at EOI.
pub const READ_EOI: &str = "++read eoi";

/// Default bound on a single reply line.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Controller command layer: owns the transport and frames every write.
pub struct PrologixLink<T> {
    transport: T,
    read_timeout: Duration,
}

impl<T: LineTransport> PrologixLink<T> {
    pub fn new(transport: T, read_timeout: Duration) -> Self {
        Self {
            transport,
            read_timeout,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Write one command line (terminator appended).
    pub async fn write_line(&mut self, command: &str) -> Result<()> {
        let framed = format!("{}{}", command, LINE_TERMINATOR);
        tracing::debug!("Prologix write: {:?}", command);
        self.transport
            .write(framed.as_bytes())
            .await
            .map_err(|e| Hp8562eError::from_transport(e, command))
    }

    /// `++auto 0`. Issue once, before any instrument traffic.
    pub async fn disable_auto_read(&mut self) -> Result<()> {
        self.write_line(AUTO_READ_OFF).await
    }

    /// `++read eoi`, then one line read. Returns the line with its delimiter.
    ///
    /// # Errors
    /// [`Hp8562eError::TransportTimeout`] if no line arrives within the read timeout.
    pub async fn read_one_line(&mut self) -> Result<String> {
        self.read_reply_to(READ_EOI).await
    }

    /// Like [`read_one_line`](Self::read_one_line), naming the instrument
    /// command the reply belongs to in any error.
    pub(crate) async fn read_reply_to(&mut self, awaiting: &str) -> Result<String> {
        self.write_line(READ_EOI).await?;
        let line = self
            .transport
            .read_line(self.read_timeout)
            .await
            .map_err(|e| Hp8562eError::from_transport(e, awaiting))?;
        tracing::debug!("Prologix read ({}): {:?}", awaiting, line);
        Ok(line)
    }

    /// Drop anything left in the receive path from an earlier session.
    pub async fn clear_input(&mut self) -> Result<usize> {
        self.transport
            .clear_input()
            .await
            .map_err(|e| Hp8562eError::from_transport(e, "input flush"))
    }

    /// Close the transport and drop it.
    pub async fn release(mut self) -> std::result::Result<(), TransportError> {
        self.transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daq_core::serial::SerialTransport;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn disable_auto_read_frames_with_crlf() {
        let (host, device) = tokio::io::duplex(64);
        let mut link = PrologixLink::new(SerialTransport::new(device), DEFAULT_READ_TIMEOUT);

        link.disable_auto_read().await.unwrap();

        let mut host = BufReader::new(host);
        let mut line = String::new();
        host.read_line(&mut line).await.unwrap();
        assert_eq!(line, "++auto 0\r\n");
    }

    #[tokio::test]
    async fn read_one_line_requests_then_reads() {
        let (host, device) = tokio::io::duplex(64);
        let mut link = PrologixLink::new(SerialTransport::new(device), DEFAULT_READ_TIMEOUT);
        let mut host = BufReader::new(host);

        // Instrument reply is already waiting in the bridge.
        host.get_mut().write_all(b"-10.00\r\n").await.unwrap();

        let reply = link.read_one_line().await.unwrap();
        assert_eq!(reply, "-10.00\r\n");

        let mut sent = String::new();
        host.read_line(&mut sent).await.unwrap();
        assert_eq!(sent, "++read eoi\r\n");
    }

    #[tokio::test]
    async fn read_one_line_times_out() {
        let (_host, device) = tokio::io::duplex(64);
        let mut link = PrologixLink::new(SerialTransport::new(device), Duration::from_millis(20));

        let err = link.read_one_line().await.unwrap_err();
        assert!(err.is_timeout());
    }
}
