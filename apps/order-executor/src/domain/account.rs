//! Account snapshot: cash and instrument balances at a point in time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cash held in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBalance {
    /// Currency code.
    pub currency: String,
    /// Free to spend.
    pub available: Decimal,
    /// Reserved by resting orders.
    pub blocked: Decimal,
}

/// Balance of one security, future or option, in units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentBalance {
    /// Instrument identifier.
    pub instrument_id: String,
    /// Signed balance in units; negative for a short.
    pub balance: i64,
    /// Units reserved by resting orders.
    pub blocked: i64,
}

/// Latest known state of an account.
///
/// Snapshots are replaced wholesale, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Account identifier.
    pub account_id: String,
    /// Cash balances by currency.
    pub money: Vec<CashBalance>,
    /// Security balances.
    pub securities: Vec<InstrumentBalance>,
    /// Futures balances.
    pub futures: Vec<InstrumentBalance>,
    /// Options balances.
    pub options: Vec<InstrumentBalance>,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

impl AccountSnapshot {
    /// Snapshot with no balances.
    #[must_use]
    pub fn empty(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            money: Vec::new(),
            securities: Vec::new(),
            futures: Vec::new(),
            options: Vec::new(),
            taken_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Available cash in `currency`, zero if the currency is absent.
    ///
    /// Currency codes compare case-insensitively.
    #[must_use]
    pub fn available_cash(&self, currency: &str) -> Decimal {
        self.cash(currency).map_or(Decimal::ZERO, |c| c.available)
    }

    /// Cash entry for `currency`.
    #[must_use]
    pub fn cash(&self, currency: &str) -> Option<&CashBalance> {
        self.money
            .iter()
            .rev()
            .find(|c| c.currency.eq_ignore_ascii_case(currency))
    }

    /// Security balance for `instrument_id`.
    #[must_use]
    pub fn security(&self, instrument_id: &str) -> Option<&InstrumentBalance> {
        self.securities
            .iter()
            .find(|s| s.instrument_id == instrument_id)
    }
}

impl Default for AccountSnapshot {
    fn default() -> Self {
        Self::empty("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cash(currency: &str, available: Decimal) -> CashBalance {
        CashBalance {
            currency: currency.to_string(),
            available,
            blocked: Decimal::ZERO,
        }
    }

    #[test]
    fn test_available_cash_defaults_to_zero() {
        let snapshot = AccountSnapshot::empty("acc");
        assert_eq!(snapshot.available_cash("rub"), Decimal::ZERO);
    }

    #[test]
    fn test_available_cash_matches_currency_case_insensitively() {
        let mut snapshot = AccountSnapshot::empty("acc");
        snapshot.money = vec![cash("usd", dec!(5)), cash("RUB", dec!(1000))];
        assert_eq!(snapshot.available_cash("rub"), dec!(1000));
        assert_eq!(snapshot.available_cash("usd"), dec!(5));
    }

    #[test]
    fn test_security_lookup() {
        let mut snapshot = AccountSnapshot::empty("acc");
        snapshot.securities = vec![InstrumentBalance {
            instrument_id: "sber".to_string(),
            balance: 20,
            blocked: 0,
        }];
        assert_eq!(snapshot.security("sber").map(|s| s.balance), Some(20));
        assert!(snapshot.security("gazp").is_none());
    }
}
