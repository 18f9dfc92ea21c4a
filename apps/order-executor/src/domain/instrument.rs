//! Static per-instrument trading parameters.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::quotation::{Quotation, quantize};

/// Immutable trading parameters for one instrument.
///
/// Built once at startup and shared read-only by the executors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Venue instrument identifier.
    pub id: String,
    /// Order size in lots.
    pub quantity: i64,
    /// Units per lot.
    pub lot: i64,
    /// Settlement currency code (e.g. "rub").
    pub currency: String,
    /// Smallest legal price step.
    pub min_price_increment: Quotation,
}

impl InstrumentConfig {
    /// Create a new instrument config.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        quantity: i64,
        lot: i64,
        currency: impl Into<String>,
        min_price_increment: Quotation,
    ) -> Self {
        Self {
            id: id.into(),
            quantity,
            lot,
            currency: currency.into(),
            min_price_increment,
        }
    }

    /// Snap a price onto this instrument's tick grid.
    #[must_use]
    pub fn quantize(&self, price: Decimal) -> Quotation {
        quantize(price, self.min_price_increment)
    }

    /// Cash needed to buy the configured quantity at `price`, or `None` if
    /// the product does not fit in a `Decimal`.
    #[must_use]
    pub fn required_funds(&self, price: Decimal) -> Option<Decimal> {
        price
            .checked_mul(Decimal::from(self.quantity))?
            .checked_mul(Decimal::from(self.lot))
    }

    /// Whole lots contained in a unit balance, truncating toward zero.
    #[must_use]
    pub const fn lots_in(&self, balance: i64) -> i64 {
        if self.lot <= 0 { 0 } else { balance / self.lot }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sber() -> InstrumentConfig {
        InstrumentConfig::new("sber-uid", 10, 10, "rub", Quotation::new(0, 10_000_000))
    }

    #[test]
    fn test_required_funds_multiplies_quantity_and_lot() {
        assert_eq!(sber().required_funds(dec!(250.5)), Some(dec!(25050.0)));
    }

    #[test]
    fn test_required_funds_overflow_is_none() {
        assert_eq!(sber().required_funds(Decimal::MAX), None);
    }

    #[test]
    fn test_lots_in_truncates_toward_zero() {
        let instrument = sber();
        assert_eq!(instrument.lots_in(25), 2);
        assert_eq!(instrument.lots_in(-25), -2);
        assert_eq!(instrument.lots_in(9), 0);
    }

    #[test]
    fn test_lots_in_guards_non_positive_lot() {
        let instrument = InstrumentConfig::new("x", 1, 0, "rub", Quotation::new(1, 0));
        assert_eq!(instrument.lots_in(100), 0);
    }

    #[test]
    fn test_quantize_uses_configured_increment() {
        assert_eq!(sber().quantize(dec!(250.555)), Quotation::new(250, 560_000_000));
    }
}
