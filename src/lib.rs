//! # Vcplink
//!
//! Background telemetry reader for VCP atmospheric sensors over a serial
//! link (virtual COM port). A session opens the port, runs a reader thread
//! that validates and decodes the device's comma-delimited frames, and
//! publishes the latest value of each measurement channel — pressure,
//! temperature, relative humidity and CO₂ — to any number of consumer
//! threads through blocking accessors.
//!
//! Frames failing the CRC-16/XMODEM check, carrying an unexpected device
//! identity, or using a reserved line type are silently discarded; consumers
//! only ever see the latest good value or a timeout.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use vcplink::{Device, DeviceConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let device = Device::open(DeviceConfig::new("/dev/ttyUSB0"))?;
//!
//!     let pressure = device.pressure(Duration::from_secs(2))?;
//!     let temperature = device.temperature(Duration::from_secs(2))?;
//!     println!("p={pressure} Pa, T={temperature:.2} °C");
//!
//!     device.close()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;

// Re-exports for convenience
pub use crate::core::protocol::{crc16_xmodem, decode, seal, ObservationUpdate, Rejection};
pub use crate::core::session::{Device, DeviceConfig, TelemetryError};
pub use crate::core::telemetry::{Channel, Latch, SharedTelemetry, TelemetryState};
pub use crate::core::transport::{
    list_ports, LineTransport, SerialConfig, SerialLineTransport, TransportError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
