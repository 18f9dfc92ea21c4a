//! Account position query port.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::InstrumentBalance;

use super::BrokerError;

/// Amount of money in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyValue {
    /// Currency code.
    pub currency: String,
    /// Amount.
    pub value: Decimal,
}

impl MoneyValue {
    /// Create a money value.
    #[must_use]
    pub fn new(currency: impl Into<String>, value: Decimal) -> Self {
        Self {
            currency: currency.into(),
            value,
        }
    }
}

/// Raw position listing as returned by the venue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionsResponse {
    /// Available cash per currency.
    pub money: Vec<MoneyValue>,
    /// Blocked cash per currency.
    pub blocked: Vec<MoneyValue>,
    /// Security balances.
    pub securities: Vec<InstrumentBalance>,
    /// Futures balances.
    pub futures: Vec<InstrumentBalance>,
    /// Options balances.
    pub options: Vec<InstrumentBalance>,
}

/// Venue operations service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PositionService: Send + Sync {
    /// Fetch the current positions of an account.
    async fn get_positions(&self, account_id: &str) -> Result<PositionsResponse, BrokerError>;
}
