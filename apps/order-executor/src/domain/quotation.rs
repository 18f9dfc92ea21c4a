//! Venue price representation and tick quantization.
//!
//! Prices cross the venue boundary as a whole part plus a count of
//! billionths (`units` + `nano`). Both parts carry the sign of the value,
//! so `-1.5` is `{ units: -1, nano: -500_000_000 }`.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of nano parts in one unit.
pub const NANO_PER_UNIT: i64 = 1_000_000_000;

/// Scale of the `nano` part as a decimal exponent.
const NANO_SCALE: u32 = 9;

/// Exact decimal price split into integer units and nano parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quotation {
    /// Whole part.
    pub units: i64,
    /// Fractional part in billionths, same sign as `units`.
    pub nano: i32,
}

impl Quotation {
    /// Zero price.
    pub const ZERO: Self = Self { units: 0, nano: 0 };

    /// Create a quotation from raw parts.
    #[must_use]
    pub const fn new(units: i64, nano: i32) -> Self {
        Self { units, nano }
    }

    /// Convert a decimal into a quotation.
    ///
    /// Digits beyond nine fractional places are truncated. Values outside the
    /// `i64` range saturate.
    #[must_use]
    pub fn from_decimal(value: Decimal) -> Self {
        let whole = value.trunc();
        let fraction = value - whole;

        let units = whole.to_i64().unwrap_or(if value.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        });
        let nano = (fraction * Decimal::from(NANO_PER_UNIT))
            .trunc()
            .to_i32()
            .unwrap_or(0);

        Self { units, nano }
    }

    /// Convert back into an exact decimal.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.units) + Decimal::new(i64::from(self.nano), NANO_SCALE)
    }

    /// Returns true if the price is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.units > 0 || (self.units == 0 && self.nano > 0)
    }
}

impl From<Decimal> for Quotation {
    fn from(value: Decimal) -> Self {
        Self::from_decimal(value)
    }
}

impl From<Quotation> for Decimal {
    fn from(value: Quotation) -> Self {
        value.to_decimal()
    }
}

impl fmt::Display for Quotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal().normalize())
    }
}

/// Snap `price` to the nearest multiple of `min_increment`.
///
/// Midpoints round away from zero. A non-positive increment is a caller
/// bug; the price is then returned unsnapped (truncated to nano precision).
#[must_use]
pub fn quantize(price: Decimal, min_increment: Quotation) -> Quotation {
    let step = min_increment.to_decimal();
    if step <= Decimal::ZERO {
        return Quotation::from_decimal(price);
    }

    let snapped = price
        .checked_div(step)
        .map(|ratio| ratio.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|steps| steps.checked_mul(step));

    match snapped {
        Some(value) => Quotation::from_decimal(value),
        None => {
            tracing::warn!(%price, %step, "Price out of range for quantization, left unsnapped");
            Quotation::from_decimal(price)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test]
    fn test_from_decimal_splits_units_and_nano() {
        let q = Quotation::from_decimal(dec!(99.99));
        assert_eq!(q, Quotation::new(99, 990_000_000));
    }

    #[test]
    fn test_negative_values_share_sign() {
        let q = Quotation::from_decimal(dec!(-1.5));
        assert_eq!(q, Quotation::new(-1, -500_000_000));
        assert_eq!(q.to_decimal(), dec!(-1.5));
    }

    #[test]
    fn test_sub_nano_digits_are_truncated() {
        let q = Quotation::from_decimal(dec!(0.0000000019));
        assert_eq!(q, Quotation::new(0, 1));
    }

    #[test]
    fn test_display_is_normalized() {
        assert_eq!(Quotation::new(105, 0).to_string(), "105");
        assert_eq!(Quotation::new(0, 10_000_000).to_string(), "0.01");
    }

    #[test]
    fn test_is_positive() {
        assert!(Quotation::new(0, 1).is_positive());
        assert!(!Quotation::ZERO.is_positive());
        assert!(!Quotation::new(0, -1).is_positive());
    }

    const CENT: Quotation = Quotation::new(0, 10_000_000);

    const fn q(units: i64, nano: i32) -> Quotation {
        Quotation::new(units, nano)
    }

    #[test_case(dec!(99.99), CENT => q(99, 990_000_000); "already on tick")]
    #[test_case(dec!(99.994), CENT => q(99, 990_000_000); "rounds down")]
    #[test_case(dec!(99.996), CENT => q(100, 0); "rounds up into next unit")]
    #[test_case(dec!(99.995), CENT => q(100, 0); "midpoint away from zero")]
    #[test_case(dec!(-0.025), CENT => q(0, -30_000_000); "negative midpoint away from zero")]
    #[test_case(dec!(251.3), q(0, 500_000_000) => q(251, 500_000_000); "half unit tick")]
    #[test_case(dec!(1234), q(5, 0) => q(1235, 0); "whole unit tick midpoint")]
    #[test_case(dec!(0.12344), q(0, 200_000) => q(0, 123_400_000); "fine tick")]
    fn test_quantize_tick_table(price: Decimal, step: Quotation) -> Quotation {
        quantize(price, step)
    }

    #[test]
    fn test_quantize_zero_increment_returns_price() {
        assert_eq!(
            quantize(dec!(10.123), Quotation::ZERO),
            Quotation::new(10, 123_000_000)
        );
    }
}
