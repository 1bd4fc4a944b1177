//! Telemetry frame decoder
//!
//! Decodes one raw line of the device's line-oriented protocol:
//!
//! ```text
//! <type>,<product>,<serial_id>,<message>,<value_1>,<unit_1>,...,<reserved>,*<CCCC>
//! ```
//!
//! where `<CCCC>` is 4 hex digits of CRC-16/XMODEM over every preceding byte
//! of the line, delimiters included. Decoding is pure: no I/O, no state.

use super::checksum::crc16_xmodem;
use thiserror::Error;

/// Line type tag carried in the first field. Only `D` (data) frames carry
/// measurements; other tags are reserved for protocol extensions.
pub const DATA_LINE_TYPE: &str = "D";

/// Width of the checksum tail on the wire: `,*CCCC`
const CHECKSUM_TAIL_LEN: usize = 5;

/// Minimum viable frame: type, product, id, message, reserved, checksum
const MIN_TOKENS: usize = 6;

/// Reasons a frame is discarded
///
/// None of these are fatal; the reader loop drops the frame and keeps going.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Empty line (normal artifact of timed line reads)
    #[error("empty line")]
    Empty,

    /// Structurally invalid line
    #[error("malformed frame: {0}")]
    Malformed(&'static str),

    /// Payload does not match the transmitted checksum
    #[error("checksum mismatch: expected {expected:#06X}, got {got:#06X}")]
    ChecksumMismatch {
        /// Checksum transmitted in the frame
        expected: u16,
        /// Checksum recomputed over the payload
        got: u16,
    },

    /// Frame originates from a different device than configured
    #[error("identity mismatch")]
    IdentityMismatch,

    /// Valid frame of a non-data line type
    #[error("unsupported frame type: {0}")]
    UnsupportedFrameType(String),
}

/// Decoded measurements from one valid data frame
///
/// Channels absent from the frame stay `None`; a frame never partially
/// applies (a bad value for any recognized unit rejects the whole line).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObservationUpdate {
    /// Atmospheric pressure in pascal
    pub pressure_pa: Option<i64>,
    /// Temperature in degrees Celsius
    pub temperature_c: Option<f64>,
    /// Relative humidity in percent
    pub humidity_pct: Option<f64>,
    /// CO2 concentration in ppm
    pub co2_ppm: Option<f64>,
}

impl ObservationUpdate {
    /// True if the frame carried none of the recognized units
    pub fn is_empty(&self) -> bool {
        self.pressure_pa.is_none()
            && self.temperature_c.is_none()
            && self.humidity_pct.is_none()
            && self.co2_ppm.is_none()
    }
}

/// Decode one raw telemetry line.
///
/// Identity filters are matched against the frame's product and serial id
/// fields; `None` accepts any device. The checksum is verified before the
/// identity and line-type checks, so a corrupt line is never attributed to
/// the wrong device.
pub fn decode(
    raw_line: &str,
    expected_product: Option<&str>,
    expected_serial_id: Option<&str>,
) -> Result<ObservationUpdate, Rejection> {
    if raw_line.is_empty() {
        return Err(Rejection::Empty);
    }

    let tokens: Vec<&str> = raw_line.split(',').collect();
    if tokens.len() < MIN_TOKENS {
        return Err(Rejection::Malformed("too few fields"));
    }

    let line_type = tokens[0];
    let product = tokens[1];
    let serial_id = tokens[2];
    // tokens[3] is a free-form message field, ignored.

    let checksum_token = tokens[tokens.len() - 1];
    let received = checksum_token
        .strip_prefix('*')
        .and_then(|hex| u16::from_str_radix(hex, 16).ok())
        .ok_or(Rejection::Malformed("bad checksum marker"))?;

    // The checksum tail has a fixed width on the wire: ",*" plus 4 hex digits.
    if raw_line.len() < CHECKSUM_TAIL_LEN {
        return Err(Rejection::Malformed("line shorter than checksum tail"));
    }
    let payload = &raw_line.as_bytes()[..raw_line.len() - CHECKSUM_TAIL_LEN];
    let computed = crc16_xmodem(payload);
    if computed != received {
        return Err(Rejection::ChecksumMismatch {
            expected: received,
            got: computed,
        });
    }

    if expected_product.is_some_and(|p| p != product) {
        return Err(Rejection::IdentityMismatch);
    }
    if expected_serial_id.is_some_and(|s| s != serial_id) {
        return Err(Rejection::IdentityMismatch);
    }

    if line_type != DATA_LINE_TYPE {
        return Err(Rejection::UnsupportedFrameType(line_type.to_string()));
    }

    // Measurements are interleaved (value, unit) pairs between the header
    // fields and the checksum token. A trailing unpaired token is dropped,
    // which is how the device's reserved slot before the checksum falls out.
    let mut update = ObservationUpdate::default();
    for pair in tokens[4..tokens.len() - 1].chunks_exact(2) {
        let (value, unit) = (pair[0], pair[1]);
        match unit {
            "Pa" => {
                update.pressure_pa = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| Rejection::Malformed("bad pressure value"))?,
                );
            }
            "C" => {
                update.temperature_c = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| Rejection::Malformed("bad temperature value"))?,
                );
            }
            "%" => {
                update.humidity_pct = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| Rejection::Malformed("bad humidity value"))?,
                );
            }
            "ppm" => {
                update.co2_ppm = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| Rejection::Malformed("bad CO2 value"))?,
                );
            }
            // Units this library does not track are skipped, not rejected.
            _ => {}
        }
    }

    Ok(update)
}

/// Append the protocol's checksum tail to a payload, producing a full line.
///
/// Test and simulation helper; the library itself only consumes frames.
pub fn seal(payload: &str) -> String {
    format!("{payload},*{:04X}", crc16_xmodem(payload.as_bytes()))
}
