//! CRC-4 over the MS5607 PROM (Measurement Specialties AN520).
//!
//! The low nibble of word 7 holds the CRC; it is masked out while the
//! remainder is computed.

/// Compute the 4-bit CRC of the eight PROM words.
pub fn crc4(prom: &[u16; 8]) -> u8 {
    let mut words = *prom;
    words[7] &= 0xFF00;

    let mut rem: u16 = 0;
    for cnt in 0..16 {
        let word = words[cnt >> 1];
        rem ^= if cnt % 2 == 1 { word & 0x00FF } else { word >> 8 };
        for _ in 0..8 {
            rem = if rem & 0x8000 != 0 {
                (rem << 1) ^ 0x3000
            } else {
                rem << 1
            };
        }
    }
    ((rem >> 12) & 0x000F) as u8
}

/// CRC nibble stored by the factory.
pub fn stored_crc(prom: &[u16; 8]) -> u8 {
    (prom[7] & 0x000F) as u8
}
