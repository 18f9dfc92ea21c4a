//! Order payloads exchanged with the venue.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::quotation::Quotation;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Buy order.
    Buy,
    /// Sell order.
    Sell,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Limit order at a given price.
    Limit,
    /// Market order.
    Market,
}

/// Venue-reported execution status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Accepted, nothing executed yet.
    New,
    /// Partially executed.
    PartiallyFilled,
    /// Fully executed.
    Fill,
    /// Rejected by the venue.
    Rejected,
    /// Cancelled.
    Cancelled,
}

/// Order submission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Account placing the order.
    pub account_id: String,
    /// Instrument identifier.
    pub instrument_id: String,
    /// Quantity in lots.
    pub quantity: i64,
    /// Limit price; ignored for market orders.
    pub price: Option<Quotation>,
    /// Order type.
    pub order_type: OrderType,
    /// Client-generated idempotency key.
    pub order_id: String,
}

impl OrderRequest {
    /// Create a limit order request.
    #[must_use]
    pub fn limit(
        account_id: impl Into<String>,
        instrument_id: impl Into<String>,
        quantity: i64,
        price: Quotation,
        order_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            instrument_id: instrument_id.into(),
            quantity,
            price: Some(price),
            order_type: OrderType::Limit,
            order_id: order_id.into(),
        }
    }

    /// Create a market order request.
    #[must_use]
    pub fn market(
        account_id: impl Into<String>,
        instrument_id: impl Into<String>,
        quantity: i64,
        order_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            instrument_id: instrument_id.into(),
            quantity,
            price: None,
            order_type: OrderType::Market,
            order_id: order_id.into(),
        }
    }
}

/// Venue acknowledgement of a submitted or replaced order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    /// Venue order identifier.
    pub order_id: String,
    /// Execution status at response time.
    pub execution_status: ExecutionStatus,
    /// Average executed price per unit, when anything executed.
    pub executed_price: Option<Decimal>,
}

/// Request to replace a resting order with a new price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceOrderRequest {
    /// Account owning the order.
    pub account_id: String,
    /// Order being replaced.
    pub order_id: String,
    /// Idempotency key for the replacement.
    pub idempotency_key: String,
    /// Quantity in lots.
    pub quantity: i64,
    /// New limit price, in currency units.
    pub price: Quotation,
}

/// Venue acknowledgement of a cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAck {
    /// Time the venue processed the cancel.
    pub time: DateTime<Utc>,
}

/// Execution report pushed by the trade stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Venue order identifier the trade belongs to.
    pub order_id: String,
    /// Account the trade was booked to.
    pub account_id: String,
    /// Instrument identifier.
    pub instrument_id: String,
    /// Trade side.
    pub direction: OrderDirection,
    /// Executed price per unit.
    pub price: Decimal,
    /// Executed quantity in units.
    pub quantity: i64,
    /// Execution time.
    pub executed_at: DateTime<Utc>,
}
