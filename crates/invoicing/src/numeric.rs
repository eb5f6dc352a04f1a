//! Defensive numeric extraction for amounts found in supplier XML.
//!
//! Amounts may carry currency symbols, spaces or thousands separators. Only
//! digits, `.` and `-` survive; anything still unparseable becomes zero.

use core::str::FromStr;

use rust_decimal::Decimal;

fn strip(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect()
}

/// Parse an amount, returning `None` when nothing numeric remains.
pub fn parse_optional_amount(raw: &str) -> Option<Decimal> {
    let cleaned = strip(raw);
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Parse an amount; garbage parses to zero.
pub fn parse_amount(raw: &str) -> Decimal {
    parse_optional_amount(raw).unwrap_or(Decimal::ZERO)
}
