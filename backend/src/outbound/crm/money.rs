//! Conversion between integer cents and the CRM's decimal amounts.

use serde_json::Value;

/// Direction of a money conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Direction {
    /// Domain cents to wire amounts.
    Outgoing,
    /// Wire amounts to domain cents.
    Incoming,
}

/// Decimal amount for `cents`, e.g. `4500` becomes `45.00`.
pub(super) fn amount_from_cents(cents: i64) -> Value {
    let sign = if cents < 0 { "-" } else { "" };
    let magnitude = cents.unsigned_abs();
    let text = format!("{sign}{}.{:02}", magnitude.div_euclid(100), magnitude.rem_euclid(100));
    serde_json::from_str(&text).unwrap_or(Value::Null)
}

/// Cents for a decimal amount; extra fraction digits are truncated.
pub(super) fn cents_from_amount(value: &Value) -> Option<i64> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_owned(),
        _ => return None,
    };
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut fraction_digits: String = fraction.chars().take(2).collect();
    while fraction_digits.len() < 2 {
        fraction_digits.push('0');
    }
    let fraction: i64 = fraction_digits.parse().ok()?;
    let cents = whole.checked_mul(100)?.checked_add(fraction)?;
    Some(if negative { -cents } else { cents })
}

/// Convert every `fields` entry of `value`, descending into arrays and
/// objects.
pub(super) fn convert(value: &mut Value, fields: &[String], direction: Direction) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if fields.iter().any(|field| field == key) && !entry.is_object() && !entry.is_array() {
                    *entry = match direction {
                        Direction::Outgoing => match entry.as_i64() {
                            Some(cents) => amount_from_cents(cents),
                            None => entry.clone(),
                        },
                        Direction::Incoming => {
                            cents_from_amount(entry).map_or_else(|| entry.clone(), Value::from)
                        }
                    };
                } else {
                    convert(entry, fields, direction);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                convert(item, fields, direction);
            }
        }
        _ => {}
    }
}
