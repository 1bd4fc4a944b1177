//! Frame integrity checksum
//!
//! The telemetry protocol protects each line with CRC-16/XMODEM computed over
//! all bytes preceding the checksum tail.

/// CRC-16/XMODEM
/// Polynomial: 0x1021, Init: 0x0000, RefIn: false, RefOut: false
pub fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0x0000;

    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_xmodem() {
        // Test vector: "123456789" should give 0x31C3
        let data = b"123456789";
        assert_eq!(crc16_xmodem(data), 0x31C3);
    }

    #[test]
    fn test_crc16_xmodem_empty() {
        assert_eq!(crc16_xmodem(b""), 0x0000);
    }

    #[test]
    fn test_single_byte_changes_crc() {
        let a = crc16_xmodem(b"D,PTH420,12345,MSG,101325,Pa");
        let b = crc16_xmodem(b"D,PTH420,12345,MSG,101326,Pa");
        assert_ne!(a, b);
    }
}
