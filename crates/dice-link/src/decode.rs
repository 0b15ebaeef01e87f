use dicebox_core::Side;

/// Decode a raw device payload into a rolled side.
///
/// Old firmware sends the side as `<Letter><Digit>` (e.g. `"A1"`), new
/// firmware sends the bare digit. Leading non-digit characters are
/// stripped and only the digit is kept, so the die's identity comes from
/// its hardware address rather than from the firmware. This is a parsing
/// rule, not a device-type branch: any future format that ends in a
/// stripped digit keeps working.
///
/// Payloads longer than two bytes are non-side telemetry and decode to
/// `None`, as does anything without a valid 1..=6 digit.
pub fn decode_side(raw: &[u8]) -> Option<Side> {
    if raw.len() > 2 {
        return None;
    }
    let text = std::str::from_utf8(raw).ok()?;
    let digits = text.trim_start_matches(|c: char| !c.is_ascii_digit());
    let value: u8 = digits.parse().ok()?;
    Side::new(value)
}
