//! Per-instrument order lifecycle.
//!
//! ```text
//! Idle --buy_limit--> PendingBuy --fill--> Holding --sell_limit--> PendingSell --fill--> Idle
//!   ^                     |                   ^                        |
//!   +------cancel---------+                   +---------cancel---------+
//! ```
//!
//! Fills from the trade stream are applied from any state.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::order::OrderDirection;

/// Where an instrument sits in its buy/sell cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Nothing held, nothing resting.
    #[default]
    Idle,
    /// Position held, nothing resting.
    Holding,
    /// Buy order resting at the venue.
    PendingBuy,
    /// Sell order resting at the venue.
    PendingSell,
}

impl Lifecycle {
    /// Returns true if an order is resting at the venue.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::PendingBuy | Self::PendingSell)
    }

    /// Stable name for logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Holding => "holding",
            Self::PendingBuy => "pending_buy",
            Self::PendingSell => "pending_sell",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle plus the venue id of the resting order, if any.
///
/// The pending order id is present exactly when the lifecycle is pending;
/// the constructors are the only way to build a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct InstrumentState {
    lifecycle: Lifecycle,
    pending_order_id: Option<String>,
}

impl InstrumentState {
    /// Nothing held or resting.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            lifecycle: Lifecycle::Idle,
            pending_order_id: None,
        }
    }

    /// Position held.
    #[must_use]
    pub const fn holding() -> Self {
        Self {
            lifecycle: Lifecycle::Holding,
            pending_order_id: None,
        }
    }

    /// Buy order `order_id` resting.
    #[must_use]
    pub fn pending_buy(order_id: impl Into<String>) -> Self {
        Self {
            lifecycle: Lifecycle::PendingBuy,
            pending_order_id: Some(order_id.into()),
        }
    }

    /// Sell order `order_id` resting.
    #[must_use]
    pub fn pending_sell(order_id: impl Into<String>) -> Self {
        Self {
            lifecycle: Lifecycle::PendingSell,
            pending_order_id: Some(order_id.into()),
        }
    }

    /// Current lifecycle.
    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Venue id of the resting order.
    #[must_use]
    pub fn pending_order_id(&self) -> Option<&str> {
        self.pending_order_id.as_deref()
    }

    /// State after an execution in `direction`.
    #[must_use]
    pub const fn after_fill(direction: OrderDirection) -> Self {
        match direction {
            OrderDirection::Buy => Self::holding(),
            OrderDirection::Sell => Self::idle(),
        }
    }

    /// State after the resting order is cancelled, or `None` if nothing rests.
    #[must_use]
    pub const fn after_cancel(&self) -> Option<Self> {
        match self.lifecycle {
            Lifecycle::PendingBuy => Some(Self::idle()),
            Lifecycle::PendingSell => Some(Self::holding()),
            Lifecycle::Idle | Lifecycle::Holding => None,
        }
    }

    /// Same pending lifecycle with a replacement order id, or `None` if
    /// nothing rests.
    #[must_use]
    pub fn with_order_id(&self, order_id: impl Into<String>) -> Option<Self> {
        match self.lifecycle {
            Lifecycle::PendingBuy => Some(Self::pending_buy(order_id)),
            Lifecycle::PendingSell => Some(Self::pending_sell(order_id)),
            Lifecycle::Idle | Lifecycle::Holding => None,
        }
    }
}

impl fmt::Display for InstrumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pending_order_id {
            Some(order_id) => write!(f, "{}({order_id})", self.lifecycle),
            None => write!(f, "{}", self.lifecycle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_constructors_carry_order_id() {
        let buy = InstrumentState::pending_buy("o-1");
        assert_eq!(buy.lifecycle(), Lifecycle::PendingBuy);
        assert_eq!(buy.pending_order_id(), Some("o-1"));

        let sell = InstrumentState::pending_sell("o-2");
        assert_eq!(sell.lifecycle(), Lifecycle::PendingSell);
        assert_eq!(sell.pending_order_id(), Some("o-2"));
    }

    #[test]
    fn test_settled_constructors_have_no_order_id() {
        assert_eq!(InstrumentState::idle().pending_order_id(), None);
        assert_eq!(InstrumentState::holding().pending_order_id(), None);
        assert_eq!(InstrumentState::default(), InstrumentState::idle());
    }

    #[test]
    fn test_cancel_resolves_pending_states() {
        assert_eq!(
            InstrumentState::pending_buy("o").after_cancel(),
            Some(InstrumentState::idle())
        );
        assert_eq!(
            InstrumentState::pending_sell("o").after_cancel(),
            Some(InstrumentState::holding())
        );
        assert_eq!(InstrumentState::idle().after_cancel(), None);
        assert_eq!(InstrumentState::holding().after_cancel(), None);
    }

    #[test]
    fn test_fill_clears_pending_id() {
        assert_eq!(
            InstrumentState::after_fill(OrderDirection::Buy),
            InstrumentState::holding()
        );
        assert_eq!(
            InstrumentState::after_fill(OrderDirection::Sell),
            InstrumentState::idle()
        );
    }

    #[test]
    fn test_with_order_id_keeps_lifecycle() {
        let replaced = InstrumentState::pending_sell("old").with_order_id("new");
        assert_eq!(replaced, Some(InstrumentState::pending_sell("new")));
        assert_eq!(InstrumentState::holding().with_order_id("new"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(InstrumentState::pending_buy("o-9").to_string(), "pending_buy(o-9)");
        assert_eq!(InstrumentState::holding().to_string(), "holding");
    }
}
