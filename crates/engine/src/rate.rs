//! Exchange rate as an integer rational.
//!
//! The configured USD→EUR rate is held as `(num, den)` with `den = 10^6`,
//! so conversion stays in integer arithmetic end to end. Rounding is half-up
//! via `+den/2` (resp. `+num/2`) before the truncating division. The float
//! form of the rate exists only for display on the wire.

use crate::{Currency, EngineError};

const RATE_SCALE: i64 = 1_000_000;

/// USD→EUR exchange rate, reduced to an integer fraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExchangeRate {
    num: i64,
    den: i64,
}

impl Default for ExchangeRate {
    /// The fallback rate, 0.92 USD→EUR.
    fn default() -> Self {
        Self { num: 92, den: 100 }
    }
}

impl ExchangeRate {
    /// Parses a decimal string such as `"0.92"` into a fraction scaled by
    /// 10^6. Empty, unparseable, zero, or negative inputs fall back to the
    /// default rate.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }
        let Ok(value) = trimmed.parse::<f64>() else {
            return Self::default();
        };
        if value <= 0.0 || !value.is_finite() {
            return Self::default();
        }
        let num = (value * RATE_SCALE as f64 + 0.5) as i64;
        if num <= 0 {
            return Self::default();
        }
        Self {
            num,
            den: RATE_SCALE,
        }
    }

    /// Numerator/denominator pair, mainly for assertions.
    #[must_use]
    pub const fn as_fraction(self) -> (i64, i64) {
        (self.num, self.den)
    }

    /// Converts `amount_cents` between the two supported currencies.
    ///
    /// Returns the rate that was applied (as reported to clients) and the
    /// converted amount in cents.
    pub fn convert(
        self,
        amount_cents: i64,
        from: Currency,
        to: Currency,
    ) -> Result<(f64, i64), EngineError> {
        match (from, to) {
            (Currency::Usd, Currency::Eur) => {
                let converted = (amount_cents * self.num + self.den / 2) / self.den;
                Ok((self.num as f64 / self.den as f64, converted))
            }
            (Currency::Eur, Currency::Usd) => {
                let converted = (amount_cents * self.den + self.num / 2) / self.num;
                Ok((self.den as f64 / self.num as f64, converted))
            }
            _ => Err(EngineError::InvalidCurrency(format!("{from}->{to}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parse_scales_by_one_million() {
        assert_eq!(ExchangeRate::parse("0.92").as_fraction(), (920_000, 1_000_000));
        assert_eq!(ExchangeRate::parse("1").as_fraction(), (1_000_000, 1_000_000));
        assert_eq!(
            ExchangeRate::parse("0.123456").as_fraction(),
            (123_456, 1_000_000)
        );
    }

    #[test]
    fn parse_falls_back_on_bad_input() {
        assert_eq!(ExchangeRate::parse("").as_fraction(), (92, 100));
        assert_eq!(ExchangeRate::parse("abc").as_fraction(), (92, 100));
        assert_eq!(ExchangeRate::parse("0").as_fraction(), (92, 100));
        assert_eq!(ExchangeRate::parse("-1").as_fraction(), (92, 100));
    }

    #[test]
    fn usd_to_eur_rounds_half_up() {
        let rate = ExchangeRate::default();
        let (reported, converted) = rate
            .convert(10_000, Currency::Usd, Currency::Eur)
            .unwrap();
        assert_eq!(converted, 9_200);
        assert!((reported - 0.92).abs() < 1e-9);

        // (2 * 92 + 50) / 100 = 2
        let (_, converted) = rate.convert(2, Currency::Usd, Currency::Eur).unwrap();
        assert_eq!(converted, 2);

        // (1 * 92 + 50) / 100 = 1
        let (_, converted) = rate.convert(1, Currency::Usd, Currency::Eur).unwrap();
        assert_eq!(converted, 1);
    }

    #[test]
    fn eur_to_usd_uses_the_reciprocal() {
        let rate = ExchangeRate::default();
        let (reported, converted) = rate.convert(9_200, Currency::Eur, Currency::Usd).unwrap();
        assert_eq!(converted, 10_000);
        assert!((reported - 100.0 / 92.0).abs() < 1e-9);
    }

    #[test]
    fn conversion_is_monotonic() {
        let rate = ExchangeRate::default();
        let mut previous = 0;
        for cents in 0..500 {
            let (_, converted) = rate.convert(cents, Currency::Usd, Currency::Eur).unwrap();
            assert!(converted >= previous);
            previous = converted;
        }
    }

    #[test]
    fn round_trip_differs_by_at_most_one_cent() {
        let rate = ExchangeRate::default();
        for cents in [1i64, 2, 99, 100, 101, 9_999, 10_000, 123_457] {
            let (_, eur) = rate.convert(cents, Currency::Usd, Currency::Eur).unwrap();
            let (_, back) = rate.convert(eur, Currency::Eur, Currency::Usd).unwrap();
            assert!((back - cents).abs() <= 1, "{cents} -> {eur} -> {back}");
        }
    }
}
