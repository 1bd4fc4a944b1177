//! Core module containing the main functionality of vcplink
//!
//! This module provides:
//! - Transport layer for the serial device link
//! - Telemetry frame decoding with CRC-16/XMODEM integrity checks
//! - Shared latest-value telemetry state with per-channel readiness latches
//! - Device session management with a background reader thread

pub mod protocol;
pub mod session;
pub mod telemetry;
pub mod transport;
