//! Telemetry wire protocol
//!
//! Line framing, checksum verification and field decoding for the sensor's
//! comma-delimited ASCII protocol.

pub mod checksum;
mod frame;

pub use checksum::crc16_xmodem;
pub use frame::{decode, seal, ObservationUpdate, Rejection, DATA_LINE_TYPE};
