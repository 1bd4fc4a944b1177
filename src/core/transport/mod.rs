//! Transport layer for the device link
//!
//! The reader loop only needs a blocking line-oriented byte stream; the
//! [`LineTransport`] trait captures that surface so sessions can run over a
//! physical serial port or an in-memory test transport.

mod serial;

pub use serial::{list_ports, SerialConfig, SerialLineTransport};

use thiserror::Error;

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Disconnected
    #[error("Disconnected")]
    Disconnected,
}

/// Blocking line-oriented duplex connection
///
/// Implementations exchange 7-bit ASCII text. Reads are bounded by the
/// transport's configured timeout; a timed-out read yields an empty line so
/// the caller can poll its own stop condition between reads.
pub trait LineTransport: Send {
    /// Write one line, terminated by a carriage return.
    fn send_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Read one line, blocking up to the configured timeout.
    ///
    /// Returns an empty string when the timeout elapses with no complete
    /// line available. Line terminators are stripped.
    fn read_line(&mut self) -> Result<String, TransportError>;

    /// Close the connection. Further reads or writes fail.
    fn shutdown(&mut self) -> Result<(), TransportError>;

    /// Get connection info string
    fn connection_info(&self) -> String {
        "unknown".to_string()
    }
}
