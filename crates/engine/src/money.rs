//! Money codec.
//!
//! Balances and ledger amounts live in the database as canonical decimal
//! strings of the form `[-]D+.DD` (scale 2) and in memory as signed integer
//! **cents** (`i64`). This module is the only place that converts between
//! the two; nothing in the balance path touches floating point.

use crate::EngineError;

/// Formats cents as the canonical decimal string, e.g. `-1025` → `"-10.25"`.
#[must_use]
pub fn encode(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Parses a decimal string into cents (strict: at most 2 decimals).
///
/// Accepts surrounding whitespace and an optional leading `+`/`-`. An empty
/// integer part defaults to `0`, an empty fractional part to `00`, and a
/// one-digit fraction is right-padded with `0`.
pub fn decode(s: &str) -> Result<i64, EngineError> {
    let empty = || EngineError::InvalidAmount("empty amount".to_string());
    let invalid = || EngineError::InvalidAmount("invalid amount".to_string());

    let raw = s.trim();
    if raw.is_empty() {
        return Err(empty());
    }

    let (sign, raw) = if let Some(stripped) = raw.strip_prefix('-') {
        (-1i64, stripped.trim())
    } else if let Some(stripped) = raw.strip_prefix('+') {
        (1i64, stripped.trim())
    } else {
        (1i64, raw)
    };
    if raw.is_empty() {
        return Err(invalid());
    }

    let mut parts = raw.split('.');
    let int_part = parts.next().unwrap_or_default();
    let frac_part = parts.next();
    if parts.next().is_some() {
        return Err(invalid());
    }

    let int_part = if int_part.is_empty() { "0" } else { int_part };
    if int_part.starts_with('+') || int_part.starts_with('-') {
        return Err(invalid());
    }
    let whole: i64 = int_part.parse().map_err(|_| invalid())?;
    if whole < 0 {
        return Err(invalid());
    }

    let frac: i64 = match frac_part {
        None => 0,
        Some(fp) => {
            if fp.starts_with('+') || fp.starts_with('-') {
                return Err(invalid());
            }
            if fp.len() > 2 {
                return Err(EngineError::InvalidAmount(
                    "amount has more than 2 decimals".to_string(),
                ));
            }
            match fp.len() {
                0 => 0,
                1 => fp.parse::<i64>().map_err(|_| invalid())? * 10,
                _ => fp.parse().map_err(|_| invalid())?,
            }
        }
    };

    Ok(sign * (whole * 100 + frac))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn encode_pads_two_digits() {
        assert_eq!(encode(0), "0.00");
        assert_eq!(encode(1), "0.01");
        assert_eq!(encode(10), "0.10");
        assert_eq!(encode(100), "1.00");
        assert_eq!(encode(-1025), "-10.25");
        assert_eq!(encode(123456789), "1234567.89");
    }

    #[test]
    fn decode_accepts_canonical_and_loose_forms() {
        assert_eq!(decode("0.00").unwrap(), 0);
        assert_eq!(decode("10.25").unwrap(), 1025);
        assert_eq!(decode("-10.25").unwrap(), -1025);
        assert_eq!(decode("+1.00").unwrap(), 100);
        assert_eq!(decode("  2.30 ").unwrap(), 230);
        assert_eq!(decode("5").unwrap(), 500);
        assert_eq!(decode("5.").unwrap(), 500);
        assert_eq!(decode(".50").unwrap(), 50);
        assert_eq!(decode("1.5").unwrap(), 150);
        assert_eq!(decode("- 3.10").unwrap(), -310);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode("").is_err());
        assert!(decode("   ").is_err());
        assert!(decode("-").is_err());
        assert!(decode("+").is_err());
        assert!(decode("1.234").is_err());
        assert!(decode("1.2.3").is_err());
        assert!(decode("abc").is_err());
        assert!(decode("1.-5").is_err());
        assert!(decode("+-5").is_err());
        assert!(decode("1,00").is_err());
    }

    #[test]
    fn round_trip_within_decimal_15_2_range() {
        for cents in [
            0i64,
            1,
            -1,
            99,
            -99,
            100,
            123_456_789,
            -123_456_789,
            9_000_000_000_000_000,
            -9_000_000_000_000_000,
        ] {
            assert_eq!(decode(&encode(cents)).unwrap(), cents);
        }
    }

    #[test]
    fn encode_handles_extreme_values_without_overflow() {
        // unsigned_abs keeps i64::MIN from panicking even though the stored
        // range never reaches it.
        assert_eq!(encode(i64::MIN), "-92233720368547758.08");
    }
}
