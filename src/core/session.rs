//! Device session management
//!
//! A [`Device`] owns the transport and a dedicated reader thread that
//! continuously decodes telemetry frames into the shared latest-value state.
//! Consumer threads poll that state through blocking accessors; frame-level
//! rejections never surface to them. The session favors availability of the
//! most recent good value over reporting transient wire noise.

use crate::core::protocol::{decode, Rejection};
use crate::core::telemetry::{Channel, SharedTelemetry};
use crate::core::transport::{LineTransport, SerialConfig, SerialLineTransport, TransportError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, trace};

/// Errors surfaced by the telemetry accessors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// No valid frame for the channel arrived within the deadline
    #[error("Timed out waiting for telemetry data")]
    Timeout,

    /// The background reader stopped on a fatal transport error
    #[error("Telemetry reader failed: {0}")]
    ReaderFailed(String),
}

/// Device session configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Serial link parameters
    pub serial: SerialConfig,
    /// Expected product identifier; `None` accepts any
    pub product: Option<String>,
    /// Expected serial id; `None` accepts any
    pub serial_id: Option<String>,
}

impl DeviceConfig {
    /// Configuration for a device on `port` with default link settings and
    /// no identity filtering.
    pub fn new(port: &str) -> Self {
        Self {
            serial: SerialConfig::new(port),
            product: None,
            serial_id: None,
        }
    }

    /// Set baud rate
    #[must_use]
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.serial = self.serial.baud_rate(baud_rate);
        self
    }

    /// Set the transport read timeout (also the reader's stop-poll interval)
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.serial = self.serial.read_timeout(timeout);
        self
    }

    /// Only accept frames from the given product
    #[must_use]
    pub fn product(mut self, product: &str) -> Self {
        self.product = Some(product.to_string());
        self
    }

    /// Only accept frames from the given serial id
    #[must_use]
    pub fn serial_id(mut self, serial_id: &str) -> Self {
        self.serial_id = Some(serial_id.to_string());
        self
    }
}

/// An open device session
///
/// Holds the reader thread handle and the shared telemetry state. The
/// transport is moved into the reader at startup and handed back on join, so
/// no consumer thread ever touches it and no read can race a closed port.
pub struct Device {
    shared: Arc<SharedTelemetry>,
    reader_error: Arc<Mutex<Option<TransportError>>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<Box<dyn LineTransport>>>,
    info: String,
}

impl Device {
    /// Open a serial connection to the device and start the reader.
    pub fn open(config: DeviceConfig) -> Result<Self, TransportError> {
        let transport = SerialLineTransport::open(&config.serial)?;
        Ok(Self::with_transport(
            Box::new(transport),
            config.product,
            config.serial_id,
        ))
    }

    /// Start a session over an already-open transport.
    ///
    /// Used by tests and virtual ports; `open` is the serial-port shorthand.
    pub fn with_transport(
        transport: Box<dyn LineTransport>,
        product: Option<String>,
        serial_id: Option<String>,
    ) -> Self {
        let shared = Arc::new(SharedTelemetry::default());
        let reader_error = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let info = transport.connection_info();

        let worker = {
            let shared = shared.clone();
            let reader_error = reader_error.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                reader_loop(transport, product, serial_id, &shared, &reader_error, &stop)
            })
        };

        Self {
            shared,
            reader_error,
            stop,
            worker: Some(worker),
            info,
        }
    }

    /// Latest atmospheric pressure in pascal.
    ///
    /// Blocks until a frame carrying a pressure value has ever arrived, or
    /// `timeout` elapses.
    pub fn pressure(&self, timeout: Duration) -> Result<i64, TelemetryError> {
        self.wait_ready(Channel::Pressure, timeout)?;
        self.shared
            .state
            .lock()
            .pressure_pa
            .ok_or(TelemetryError::Timeout)
    }

    /// Latest temperature in degrees Celsius.
    pub fn temperature(&self, timeout: Duration) -> Result<f64, TelemetryError> {
        self.wait_ready(Channel::Temperature, timeout)?;
        self.shared
            .state
            .lock()
            .temperature_c
            .ok_or(TelemetryError::Timeout)
    }

    /// Latest relative humidity in percent.
    pub fn humidity(&self, timeout: Duration) -> Result<f64, TelemetryError> {
        self.wait_ready(Channel::Humidity, timeout)?;
        self.shared
            .state
            .lock()
            .humidity_pct
            .ok_or(TelemetryError::Timeout)
    }

    /// Latest CO2 concentration in ppm.
    pub fn co2(&self, timeout: Duration) -> Result<f64, TelemetryError> {
        self.wait_ready(Channel::Co2, timeout)?;
        self.shared
            .state
            .lock()
            .co2_ppm
            .ok_or(TelemetryError::Timeout)
    }

    /// Get connection info string
    pub fn connection_info(&self) -> &str {
        &self.info
    }

    /// Stop the reader, join it, then shut the transport down.
    ///
    /// Returns the sticky reader error if the worker died on a fatal
    /// transport failure. Consuming `self` makes a second close
    /// unrepresentable; early-exit paths are covered by `Drop`.
    pub fn close(mut self) -> Result<(), TransportError> {
        self.stop_and_join()
    }

    fn wait_ready(&self, channel: Channel, timeout: Duration) -> Result<(), TelemetryError> {
        if self.shared.latch(channel).wait(timeout) {
            return Ok(());
        }
        // The latch never latched; distinguish a dead reader from plain
        // absence of data.
        if let Some(e) = self.reader_error.lock().as_ref() {
            return Err(TelemetryError::ReaderFailed(e.to_string()));
        }
        Err(TelemetryError::Timeout)
    }

    fn stop_and_join(&mut self) -> Result<(), TransportError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        self.stop.store(true, Ordering::Relaxed);
        let mut transport = worker
            .join()
            .map_err(|_| TransportError::ConnectionFailed("reader thread panicked".to_string()))?;
        transport.shutdown()?;

        if let Some(e) = self.reader_error.lock().take() {
            return Err(e);
        }
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        // Best-effort teardown for sessions dropped without an explicit
        // close (early returns, panics in the consumer scope).
        let _ = self.stop_and_join();
    }
}

/// Reader main loop. Runs on the dedicated worker thread, owns the transport
/// for the life of the session and hands it back for shutdown.
fn reader_loop(
    mut transport: Box<dyn LineTransport>,
    product: Option<String>,
    serial_id: Option<String>,
    shared: &SharedTelemetry,
    reader_error: &Mutex<Option<TransportError>>,
    stop: &AtomicBool,
) -> Box<dyn LineTransport> {
    debug!(info = %transport.connection_info(), "telemetry reader started");

    while !stop.load(Ordering::Relaxed) {
        // A timed-out read yields an empty line; that bounds how long a stop
        // request can go unobserved.
        let line = match transport.read_line() {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "telemetry reader terminated");
                *reader_error.lock() = Some(e);
                break;
            }
        };

        match decode(&line, product.as_deref(), serial_id.as_deref()) {
            Ok(update) => shared.apply(&update),
            Err(Rejection::Empty) => {}
            Err(rejection) => trace!(%rejection, %line, "frame discarded"),
        }
    }

    debug!("telemetry reader stopped");
    transport
}
