//! # UBX Checksum
//!
//! 8-bit Fletcher checksum used by the UBX protocol.
//!
//! For every byte: `ck_a += byte; ck_b += ck_a`, both modulo 256.
//! The same accumulator is used for inbound verification and outbound
//! generation.

/// Fold one byte into the running checksum pair
#[inline]
pub fn update_byte(byte: u8, ck_a: u8, ck_b: u8) -> (u8, u8) {
    let ck_a = ck_a.wrapping_add(byte);
    (ck_a, ck_b.wrapping_add(ck_a))
}

/// Fold a byte span into the running checksum pair
///
/// # Arguments
///
/// * `data` - Bytes to accumulate
/// * `ck_a` - Current first accumulator
/// * `ck_b` - Current second accumulator
///
/// # Returns
///
/// * `(u8, u8)` - Updated `(ck_a, ck_b)`
///
/// # Examples
///
/// ```
/// use ubx_nav::ubx::checksum::update;
///
/// // CFG-MSG enabling NMEA GGA
/// let data = [0x06, 0x01, 0x03, 0x00, 0xF0, 0x00, 0x01];
/// assert_eq!(update(&data, 0, 0), (0xFB, 0x11));
/// ```
pub fn update(data: &[u8], ck_a: u8, ck_b: u8) -> (u8, u8) {
    data.iter()
        .fold((ck_a, ck_b), |(a, b), &byte| update_byte(byte, a, b))
}

/// Checksum of a complete span (class through payload)
pub fn ubx_checksum(data: &[u8]) -> (u8, u8) {
    update(data, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(ubx_checksum(&[]), (0x00, 0x00));
    }

    #[test]
    fn test_checksum_known_vector() {
        // CFG-MSG (NMEA GGA, rate 1), checksum verified against u-center
        let data = [0x06, 0x01, 0x03, 0x00, 0xF0, 0x00, 0x01];
        assert_eq!(ubx_checksum(&data), (0xFB, 0x11));
    }

    #[test]
    fn test_checksum_poll_mon_ver() {
        // MON-VER poll: B5 62 0A 04 00 00 0E 34
        assert_eq!(ubx_checksum(&[0x0A, 0x04, 0x00, 0x00]), (0x0E, 0x34));
    }

    #[test]
    fn test_checksum_wraps_at_8_bits() {
        let data = [0xFF; 4];
        // ck_a: FF, FE, FD, FC; ck_b: FF, FD, FA, F6
        assert_eq!(ubx_checksum(&data), (0xFC, 0xF6));
    }

    #[test]
    fn test_checksum_is_resumable() {
        let data = [0x01, 0x02, 0x10, 0x20, 0x99, 0xAB, 0x00, 0x7F];
        let whole = ubx_checksum(&data);

        for split in 0..=data.len() {
            let (a, b) = update(&data[..split], 0, 0);
            assert_eq!(update(&data[split..], a, b), whole, "split at {}", split);
        }
    }

    #[test]
    fn test_checksum_changes_with_data() {
        let data1 = [0x01, 0x02, 0x00, 0x04];
        let data2 = [0x01, 0x02, 0x00, 0x05];
        assert_ne!(ubx_checksum(&data1), ubx_checksum(&data2));
    }

    #[test]
    fn test_checksum_is_order_sensitive() {
        // ck_a alone is a plain sum; ck_b catches reordering
        let (a1, b1) = ubx_checksum(&[0x01, 0x02]);
        let (a2, b2) = ubx_checksum(&[0x02, 0x01]);
        assert_eq!(a1, a2);
        assert_ne!(b1, b2);
    }
}
