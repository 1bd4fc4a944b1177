//! Serial port transport implementation

use super::{LineTransport, TransportError};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::{Duration, Instant};

/// Default line speed for VCP sensor devices
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default bound on one blocking line read
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Serial port configuration
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port name (e.g., COM3, /dev/ttyUSB0)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Upper bound on one blocking line read
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Create a new serial configuration with default settings
    pub fn new(port: &str) -> Self {
        Self {
            port: port.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Set baud rate
    #[must_use]
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set read timeout
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// Line-oriented transport over a physical serial port
///
/// Bytes arriving ahead of a line terminator are buffered across timed-out
/// reads, so a frame split over several poll intervals still assembles.
pub struct SerialLineTransport {
    port: Option<Box<dyn SerialPort + Send>>,
    info: String,
    read_timeout: Duration,
    pending: Vec<u8>,
}

impl SerialLineTransport {
    /// Open the configured port at 8N1, no flow control.
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => {
                    TransportError::PortNotFound(config.port.clone())
                }
                serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                    TransportError::PermissionDenied(config.port.clone())
                }
                _ => TransportError::ConnectionFailed(e.to_string()),
            })?;

        Ok(Self {
            port: Some(port),
            info: format!("{} @ {} baud", config.port, config.baud_rate),
            read_timeout: config.read_timeout,
            pending: Vec::with_capacity(256),
        })
    }

    /// Pop the next complete line out of the pending buffer, skipping the
    /// empty remnants CRLF terminators leave behind.
    fn take_line(&mut self) -> Option<String> {
        while let Some(pos) = self
            .pending
            .iter()
            .position(|&b| b == b'\r' || b == b'\n')
        {
            let line: Vec<u8> = self.pending.drain(..=pos).take(pos).collect();
            if !line.is_empty() {
                return Some(String::from_utf8_lossy(&line).into_owned());
            }
        }
        None
    }
}

impl LineTransport for SerialLineTransport {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Disconnected)?;
        port.write_all(line.as_bytes())?;
        port.write_all(b"\r")?;
        port.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        let deadline = Instant::now() + self.read_timeout;
        let mut buf = [0u8; 256];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }
            if Instant::now() >= deadline {
                return Ok(String::new());
            }

            let port = self.port.as_mut().ok_or(TransportError::Disconnected)?;
            match port.read(&mut buf) {
                Ok(0) => return Err(TransportError::Disconnected),
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                // No data within the port timeout; report an empty line so
                // the caller can re-check its stop condition.
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Ok(String::new())
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn shutdown(&mut self) -> Result<(), TransportError> {
        // Dropping the handle releases the OS port.
        self.port = None;
        Ok(())
    }

    fn connection_info(&self) -> String {
        self.info.clone()
    }
}

/// List available serial ports
pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>, TransportError> {
    serialport::available_ports().map_err(|e| TransportError::Io(e.into()))
}
