// ABOUTME: Decoder for the Bluetooth Heart Rate Measurement characteristic (0x2A37)
// ABOUTME: Reads the 8-bit or little-endian 16-bit value selected by flag bit 0

use wearable_core::constants::ble::HR_FLAG_VALUE_U16;

/// Decode a Heart Rate Measurement payload into beats per minute
///
/// Byte 0 carries the flags. Payloads shorter than two bytes decode to 0.
/// A 16-bit payload missing its high byte decodes the single low byte.
#[must_use]
pub fn decode_heart_rate(payload: &[u8]) -> u16 {
    let [flags, low, rest @ ..] = payload else {
        return 0;
    };

    if flags & HR_FLAG_VALUE_U16 == 0 {
        return u16::from(*low);
    }
    let high = rest.first().copied().unwrap_or(0);
    u16::from_le_bytes([*low, high])
}
