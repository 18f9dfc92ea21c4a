//! Paper venue seed data.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Quotation;
use crate::executor::LastPrices;
use crate::infrastructure::PaperVenue;
use crate::ports::ShareInfo;

/// Initial state of the paper venue.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaperConfig {
    /// Available cash by currency.
    #[serde(default)]
    pub cash: HashMap<String, Decimal>,
    /// Security balances in units.
    #[serde(default)]
    pub securities: HashMap<String, i64>,
    /// Market fill prices.
    #[serde(default)]
    pub market_prices: HashMap<String, Decimal>,
    /// Share catalog.
    #[serde(default)]
    pub shares: Vec<PaperShare>,
}

/// Catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperShare {
    /// Instrument uid.
    pub uid: String,
    /// Exchange code.
    pub exchange: String,
    /// Units per lot.
    pub lot: i64,
    /// Settlement currency.
    pub currency: String,
    /// Minimum price increment.
    pub min_price_increment: Decimal,
}

impl PaperConfig {
    /// Seed a venue with this state.
    pub fn seed(&self, venue: &PaperVenue) {
        for (currency, amount) in &self.cash {
            venue.set_cash(currency, *amount);
        }
        for (instrument_id, balance) in &self.securities {
            venue.set_security(instrument_id, *balance);
        }
        for (instrument_id, price) in &self.market_prices {
            venue.set_market_price(instrument_id, *price);
        }
        venue.set_shares(
            self.shares
                .iter()
                .map(|share| ShareInfo {
                    uid: share.uid.clone(),
                    exchange: share.exchange.clone(),
                    lot: share.lot,
                    currency: share.currency.clone(),
                    min_price_increment: Quotation::from_decimal(share.min_price_increment),
                })
                .collect(),
        );
    }

    /// Last traded prices as seen by the market executor, starting at the
    /// seeded market prices.
    #[must_use]
    pub fn last_prices(&self) -> LastPrices {
        Arc::new(RwLock::new(self.market_prices.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{InstrumentCatalog, PositionService};
    use rust_decimal_macros::dec;

    fn paper() -> PaperConfig {
        PaperConfig {
            cash: HashMap::from([("rub".to_string(), dec!(5000))]),
            securities: HashMap::from([("sber".to_string(), 30)]),
            market_prices: HashMap::from([("sber".to_string(), dec!(250.5))]),
            shares: vec![PaperShare {
                uid: "sber".to_string(),
                exchange: "MOEX".to_string(),
                lot: 10,
                currency: "rub".to_string(),
                min_price_increment: dec!(0.01),
            }],
        }
    }

    #[tokio::test]
    async fn test_seed_populates_venue() {
        let venue = PaperVenue::new();
        paper().seed(&venue);

        let positions = venue.get_positions("acc").await.unwrap();
        assert_eq!(positions.money.len(), 1);
        assert_eq!(positions.money[0].value, dec!(5000));
        assert_eq!(positions.securities.len(), 1);
        assert_eq!(positions.securities[0].balance, 30);

        let shares = venue.shares().await.unwrap();
        assert_eq!(shares[0].min_price_increment, Quotation::new(0, 10_000_000));
    }

    #[test]
    fn test_last_prices_start_from_market_prices() {
        let last = paper().last_prices();
        assert_eq!(last.read().get("sber"), Some(&dec!(250.5)));
    }
}
