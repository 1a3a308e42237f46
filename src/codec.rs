//! Raw settings string codec
//!
//! Wire format: `key=token,key=token` where a token is `<digits>`,
//! `<digits>ck` (cakes) or `<digits>A` (ARCs). Only overrides are written;
//! a key that is absent means its default is in effect.
//!
//! Decoding never fails. A token that does not parse leaves the factor at
//! its default and is reported back in [`Decoded::rejected`] so the caller
//! can log it.

use std::collections::HashMap;

use crate::constants::settings::{KEY_VALUE_SEPARATOR, PAIR_SEPARATOR};
use crate::constants::units::{ARC_SUFFIX, CAKE_SUFFIX};
use crate::table::PolicyTable;
use crate::units::parse_amount;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Parsed value for every known key present in the raw string
    pub values: HashMap<String, i64>,
    /// `(key, token)` pairs for known keys whose token was malformed
    pub rejected: Vec<(String, String)>,
}

/// Split `raw` into key/token pairs. Later duplicates win.
fn split_pairs(raw: &str) -> HashMap<&str, &str> {
    raw.split(PAIR_SEPARATOR)
        .filter_map(|pair| {
            let (key, token) = pair.split_once(KEY_VALUE_SEPARATOR)?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key, token.trim()))
        })
        .collect()
}

pub fn decode_report(raw: &str, defaults: &PolicyTable, scale: i64) -> Decoded {
    let pairs = split_pairs(raw);
    let mut decoded = Decoded::default();

    for entry in defaults.entries() {
        let key = entry.key();
        let Some(&token) = pairs.get(key) else {
            continue;
        };
        match parse_amount(token, scale) {
            Ok(value) => {
                decoded.values.insert(key.to_string(), value);
            }
            Err(_) => decoded.rejected.push((key.to_string(), token.to_string())),
        }
    }

    decoded
}

/// Parsed values for the known keys present in `raw`
pub fn decode(raw: &str, defaults: &PolicyTable, scale: i64) -> HashMap<String, i64> {
    decode_report(raw, defaults, scale).values
}

/// Encode one amount, preferring whole ARCs when exact
pub fn encode_value(value: i64, scale: i64) -> String {
    if value % scale == 0 {
        format!("{}{ARC_SUFFIX}", value / scale)
    } else {
        format!("{value}{CAKE_SUFFIX}")
    }
}

/// Encode every overridden entry of `table`, in table order
pub fn encode(table: &PolicyTable, scale: i64) -> String {
    let mut raw = String::new();
    for entry in table.entries().filter(|entry| entry.is_overridden()) {
        if !raw.is_empty() {
            raw.push(PAIR_SEPARATOR);
        }
        raw.push_str(entry.key());
        raw.push(KEY_VALUE_SEPARATOR);
        raw.push_str(&encode_value(entry.current_value, scale));
    }
    raw
}
