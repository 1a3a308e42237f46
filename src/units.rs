//! Conversion between cakes (micro-units) and ARCs (macro-units)

use crate::constants::units::{ARC_SUFFIX, CAKE_SUFFIX};
use crate::error::ParseError;

/// Split a cake amount into whole ARCs and the remaining cakes.
/// Truncating division, so both parts carry the sign of `micro`.
pub fn to_macro(micro: i64, scale: i64) -> (i64, i64) {
    (micro / scale, micro % scale)
}

pub fn to_micro(whole: i64, scale: i64) -> i64 {
    whole * scale
}

/// Human readable ARC amount, e.g. `"1 ARC"`, `"2.5 ARCs"`
pub fn format_arcs(micro: i64, scale: i64) -> String {
    let (whole, fraction) = to_macro(micro, scale);
    let sign = if micro < 0 { "-" } else { "" };
    let whole = whole.unsigned_abs();
    let fraction = fraction.unsigned_abs();

    let number = if fraction == 0 {
        whole.to_string()
    } else {
        let width = scale.unsigned_abs().saturating_sub(1).to_string().len();
        let digits = format!("{fraction:0width$}");
        format!("{whole}.{}", digits.trim_end_matches('0'))
    };

    let unit = if micro.unsigned_abs() == scale.unsigned_abs() { "ARC" } else { "ARCs" };
    format!("{sign}{number} {unit}")
}

/// Parse an amount token (`150`, `150ck` or `2A`) into cakes
pub fn parse_amount(token: &str, scale: i64) -> Result<i64, ParseError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(digits) = token.strip_suffix(ARC_SUFFIX) {
        let whole = parse_digits(digits).ok_or_else(|| ParseError::Invalid(token.to_string()))?;
        return whole
            .checked_mul(scale)
            .ok_or_else(|| ParseError::Overflow(token.to_string()));
    }

    let digits = token.strip_suffix(CAKE_SUFFIX).unwrap_or(token);
    parse_digits(digits).ok_or_else(|| ParseError::Invalid(token.to_string()))
}

/// Optional `-` followed by ASCII digits only
fn parse_digits(digits: &str) -> Option<i64> {
    let unsigned = digits.strip_prefix('-').unwrap_or(digits);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
