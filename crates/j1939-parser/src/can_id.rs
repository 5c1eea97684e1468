//! PGN derivation from 29-bit CAN identifiers.
//!
//! The PGN is taken as the fixed 16-bit window `(id >> 8) & 0xFFFF`. Full J1939
//! PGNs are 18 bits wide (data page and reserved bits included, and PDU1
//! messages carry a destination address in the low byte), so this matches the
//! J1939 definition only for PDU2 traffic on data page 0. Existing log tooling
//! depends on the window, so it is kept as-is.

use std::fmt;

use serde::Serialize;

/// Highest identifier representable in the 29-bit extended frame format.
pub const MAX_CAN_ID: u64 = 0x1FFF_FFFF;

/// A PGN in both of the forms vendor logs use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PgnId {
    pub decimal: u32,
    /// Four (or more) uppercase hex digits, no prefix.
    pub hex: String,
}

impl PgnId {
    pub fn new(decimal: u32) -> Self {
        Self {
            decimal,
            hex: format!("{decimal:04X}"),
        }
    }
}

impl fmt::Display for PgnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{})", self.decimal, self.hex)
    }
}

/// A CAN identifier as it shows up in a log: already numeric, or still text.
#[derive(Debug, Clone, Copy)]
pub enum CanIdInput<'a> {
    Int(i64),
    Text(&'a str),
}

impl From<i64> for CanIdInput<'_> {
    fn from(value: i64) -> Self {
        CanIdInput::Int(value)
    }
}

impl From<u32> for CanIdInput<'_> {
    fn from(value: u32) -> Self {
        CanIdInput::Int(i64::from(value))
    }
}

impl<'a> From<&'a str> for CanIdInput<'a> {
    fn from(value: &'a str) -> Self {
        CanIdInput::Text(value)
    }
}

/// Resolves a CAN identifier (hex or decimal, optional `0x`/`0h`/`h`/`x`
/// prefix) to an integer within the 29-bit range.
pub fn parse_can_id<'a>(input: impl Into<CanIdInput<'a>>) -> Option<u32> {
    let value = match input.into() {
        CanIdInput::Int(value) => value,
        CanIdInput::Text(text) => parse_can_id_text(text)?,
    };
    if value < 0 || value as u64 > MAX_CAN_ID {
        return None;
    }
    u32::try_from(value).ok()
}

fn parse_can_id_text(text: &str) -> Option<i64> {
    let upper = text.trim().to_ascii_uppercase();
    let cleaned = strip_id_prefix(&upper).trim();
    if cleaned.is_empty() {
        return None;
    }

    if cleaned.chars().any(|c| matches!(c, 'A'..='F')) || cleaned.len() > 8 {
        return parse_hex(cleaned);
    }

    let decimal = cleaned.parse::<i64>().ok()?;
    if decimal as i128 > MAX_CAN_ID as i128 {
        return parse_hex(cleaned);
    }
    Some(decimal)
}

fn strip_id_prefix(upper: &str) -> &str {
    for prefix in ["0X", "0H", "H", "X"] {
        if let Some(rest) = upper.strip_prefix(prefix) {
            return rest;
        }
    }
    upper
}

fn parse_hex(digits: &str) -> Option<i64> {
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    i64::from_str_radix(digits, 16).ok()
}

/// Extracts the PGN window from a CAN identifier. Returns `None` when the
/// identifier cannot be parsed or falls outside `0..=0x1FFFFFFF`.
pub fn extract_pgn<'a>(can_id: impl Into<CanIdInput<'a>>) -> Option<PgnId> {
    let id = parse_can_id(can_id)?;
    Some(PgnId::new((id >> 8) & 0xFFFF))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_pgn_from_extended_identifier() {
        let pgn = extract_pgn(0x18FE_F100u32).expect("pgn");
        assert_eq!(pgn.decimal, 0xFEF1);
        assert_eq!(pgn.decimal, 65265);
        assert_eq!(pgn.hex, "FEF1");
    }

    #[test]
    fn text_identifiers_accept_prefixes() {
        for text in ["0x18FEF100", "18fef100", " 0h18FEF100 ", "h18FEF100", "X18FEF100"] {
            assert_eq!(extract_pgn(text).map(|p| p.decimal), Some(0xFEF1), "{text}");
        }
    }

    #[test]
    fn hex_letters_force_hex_interpretation() {
        let pgn = extract_pgn("FEF1").expect("pgn");
        assert_eq!(pgn.decimal, 0xFE);
        assert_eq!(pgn.hex, "00FE");
    }

    #[test]
    fn pure_decimal_within_range_is_decimal() {
        assert_eq!(parse_can_id("65261"), Some(65261));
        let pgn = extract_pgn("65261").expect("pgn");
        assert_eq!(pgn.decimal, (65261 >> 8) & 0xFFFF);
    }

    #[test]
    fn long_digit_strings_are_hex() {
        assert_eq!(parse_can_id("012345678"), Some(0x0123_4567 * 16 + 8));
        assert_eq!(parse_can_id("600000000"), None);
        assert_eq!(parse_can_id("10000000"), Some(10_000_000));
    }

    #[test]
    fn out_of_range_and_garbage_are_rejected() {
        assert!(extract_pgn(-1i64).is_none());
        assert!(extract_pgn(0x2000_0000i64).is_none());
        assert!(extract_pgn("-42").is_none());
        assert!(extract_pgn("").is_none());
        assert!(extract_pgn("0x").is_none());
        assert!(extract_pgn("CAN0").is_none());
        assert!(extract_pgn("12.5").is_none());
    }
}
