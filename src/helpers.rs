use chrono::DateTime;
use cosmwasm_std::{Binary, Uint128};

use crate::error::MarketError;
use crate::state::NewGigDraft;

/// On-chain category codes are indices into this list.
pub const KNOWN_CATEGORIES: [&str; 5] = ["development", "design", "writing", "marketing", "support"];
pub const FALLBACK_CATEGORY: &str = "other";

const CLEAR_VALUE_WORD: usize = 32;
const EMPLOYER_PREFIX_CHARS: usize = 8;

// Category codec

/// Position of `name` in the known list. Unknown names are left to the form
/// layer and yield `None`.
pub fn name_to_code(name: &str) -> Option<u8> {
    KNOWN_CATEGORIES
        .iter()
        .position(|known| *known == name)
        .map(|index| index as u8)
}

pub fn code_to_name(code: u64) -> &'static str {
    usize::try_from(code)
        .ok()
        .and_then(|index| KNOWN_CATEGORIES.get(index))
        .copied()
        .unwrap_or(FALLBACK_CATEGORY)
}

// Lenient numeric input

/// Reads the leading integer of a form field the way a browser `parseInt`
/// does, then clamps to the unsigned range. Anything unreadable is 0.
pub fn parse_int_or_zero(input: &str) -> u64 {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if negative || digits.is_empty() {
        return 0;
    }
    digits.parse::<u64>().unwrap_or(u64::MAX)
}

/// Coerces a loosely typed RPC field to an integer with a zero default.
/// Accepts JSON numbers, decimal strings and `0x` hex strings.
pub fn coerce_u64(value: Option<&serde_json::Value>) -> u64 {
    match value {
        Some(serde_json::Value::Number(number)) => number
            .as_u64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.trunc() as u64)
            })
            .unwrap_or(0),
        Some(serde_json::Value::String(text)) => parse_numeric_string(text)
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0),
        _ => 0,
    }
}

/// Like `coerce_u64` but keeps the full width budgets are stored with.
pub fn coerce_uint128(value: Option<&serde_json::Value>) -> Uint128 {
    match value {
        Some(serde_json::Value::String(text)) => {
            Uint128::new(parse_numeric_string(text).unwrap_or(0))
        }
        other => Uint128::from(coerce_u64(other)),
    }
}

fn parse_numeric_string(text: &str) -> Option<u128> {
    let text = text.trim();
    if let Some(hex_digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u128::from_str_radix(hex_digits, 16).ok();
    }
    text.parse::<u128>().ok()
}

// Draft validation

pub fn validate_draft(draft: &NewGigDraft) -> Result<(), MarketError> {
    if !draft.is_submittable() {
        return Err(MarketError::InvalidInput {
            error: "Title, budget and deadline are required".to_string(),
        });
    }
    if name_to_code(&draft.category).is_none() {
        return Err(MarketError::InvalidInput {
            error: format!("Unknown category: {}", draft.category),
        });
    }
    Ok(())
}

// Clear value encoding

/// Packs clear values as consecutive 32-byte big-endian words.
pub fn encode_clear_values(values: &[Uint128]) -> Binary {
    let mut out = Vec::with_capacity(values.len() * CLEAR_VALUE_WORD);
    for value in values {
        out.extend_from_slice(&[0u8; CLEAR_VALUE_WORD - 16]);
        out.extend_from_slice(&value.u128().to_be_bytes());
    }
    Binary::from(out)
}

pub fn decode_clear_values(encoded: &Binary) -> Result<Vec<Uint128>, MarketError> {
    let bytes = encoded.as_slice();
    if bytes.len() % CLEAR_VALUE_WORD != 0 {
        return Err(MarketError::Decryption {
            msg: format!("encoded clear values have odd length {}", bytes.len()),
        });
    }
    bytes
        .chunks(CLEAR_VALUE_WORD)
        .map(|word| {
            let (high, low) = word.split_at(CLEAR_VALUE_WORD - 16);
            if high.iter().any(|b| *b != 0) {
                return Err(MarketError::Decryption {
                    msg: format!("clear value 0x{} exceeds 128 bits", hex::encode(word)),
                });
            }
            let mut buf = [0u8; 16];
            buf.copy_from_slice(low);
            Ok(Uint128::new(u128::from_be_bytes(buf)))
        })
        .collect()
}

// Display helpers

pub fn format_epoch_date(seconds: u64) -> String {
    i64::try_from(seconds)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn truncate_address(address: &str) -> String {
    let prefix: String = address.chars().take(EMPLOYER_PREFIX_CHARS).collect();
    format!("{}...", prefix)
}
