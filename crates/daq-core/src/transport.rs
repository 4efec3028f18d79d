//! Line-oriented byte stream abstraction.
//!
//! Instrument drivers that speak ASCII request/response protocols only need two
//! things from the wire: write some bytes, and read back one delimited line
//! within a bounded wait. [`LineTransport`] captures exactly that, so a driver can
//! run against a real serial port ([`SerialTransport`](crate::serial::SerialTransport))
//! or an in-process simulator without knowing which.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure of the underlying byte stream.
#[derive(Error, Debug)]
pub enum TransportError {
    /// No complete line arrived within the bounded wait.
    #[error("no line received within {0:?}")]
    Timeout(Duration),

    /// The peer closed the stream (read returned EOF).
    #[error("stream closed by peer")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bidirectional byte stream with write and bounded line-read operations.
///
/// Implementations must not interpret the bytes they carry: framing (command
/// terminators) is the caller's job, and `read_line` returns the line including
/// its trailing delimiter.
#[async_trait]
pub trait LineTransport: Send {
    /// Write all bytes to the stream.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Read one line terminated by `\n`, waiting at most `timeout`.
    async fn read_line(&mut self, timeout: Duration) -> Result<String, TransportError>;

    /// Discard any bytes already buffered or immediately available.
    ///
    /// Returns the number of bytes discarded.
    async fn clear_input(&mut self) -> Result<usize, TransportError>;

    /// Release the underlying resource. Further calls may fail.
    async fn close(&mut self) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: LineTransport + ?Sized> LineTransport for Box<T> {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes).await
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<String, TransportError> {
        (**self).read_line(timeout).await
    }

    async fn clear_input(&mut self) -> Result<usize, TransportError> {
        (**self).clear_input().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        (**self).close().await
    }
}
