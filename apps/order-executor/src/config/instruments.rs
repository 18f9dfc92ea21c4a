//! Managed instrument configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{InstrumentConfig, Quotation};

/// Instruments the executor trades.
///
/// Explicit entries are used as-is. With `selection` set, the binary also
/// pulls shares from the venue catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InstrumentsConfig {
    /// Explicitly configured instruments.
    #[serde(default)]
    pub list: Vec<InstrumentEntry>,
    /// Catalog-driven selection.
    #[serde(default)]
    pub selection: Option<SelectionConfig>,
}

/// One configured instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentEntry {
    /// Venue instrument id.
    pub id: String,
    /// Order size in lots.
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// Units per lot.
    #[serde(default = "default_lot")]
    pub lot: i64,
    /// Settlement currency.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Minimum price increment.
    pub min_price_increment: Decimal,
}

impl InstrumentEntry {
    /// Build the executor-side instrument config.
    #[must_use]
    pub fn to_instrument_config(&self) -> InstrumentConfig {
        InstrumentConfig::new(
            self.id.as_str(),
            self.quantity,
            self.lot,
            self.currency.as_str(),
            Quotation::from_decimal(self.min_price_increment),
        )
    }
}

/// Pick shares from the venue catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Exchange code to filter on.
    #[serde(default = "default_exchange")]
    pub exchange: String,
    /// Maximum number of shares.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Order size in lots for every selected share.
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            exchange: default_exchange(),
            limit: default_limit(),
            quantity: default_quantity(),
        }
    }
}

impl InstrumentsConfig {
    /// Executor-side configs for the explicit entries.
    #[must_use]
    pub fn to_instrument_configs(&self) -> Vec<InstrumentConfig> {
        self.list
            .iter()
            .map(InstrumentEntry::to_instrument_config)
            .collect()
    }
}

const fn default_quantity() -> i64 {
    1
}

const fn default_lot() -> i64 {
    1
}

fn default_currency() -> String {
    "rub".to_string()
}

fn default_exchange() -> String {
    "MOEX".to_string()
}

const fn default_limit() -> usize {
    30
}
