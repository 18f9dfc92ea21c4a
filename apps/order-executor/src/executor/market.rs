//! Market-order executor with a minimum-profit exit gate.
//!
//! Buys at market when cash allows and remembers the fill price; sells only
//! when the last traded price clears the entry by more than the configured
//! percentage.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{ExecutionStatus, InstrumentConfig, OrderRequest};
use crate::error::ExecutorError;
use crate::ports::{OrderService, PositionService};

use super::bootstrap::fetch_account_snapshot;
use super::liquidation::liquidate_positions;

/// Last traded price per instrument, written by a market-data consumer and
/// only read here.
pub type LastPrices = Arc<RwLock<HashMap<String, Decimal>>>;

#[derive(Debug, Clone, Copy, Default)]
struct BookEntry {
    in_stock: bool,
    entry_price: Decimal,
}

/// Executor trading whole configured quantities at market.
pub struct MarketExecutor {
    account_id: String,
    instruments: HashMap<String, InstrumentConfig>,
    orders: Arc<dyn OrderService>,
    positions: Arc<dyn PositionService>,
    last_prices: LastPrices,
    min_profit_pct: Decimal,
    book: Mutex<HashMap<String, BookEntry>>,
}

impl MarketExecutor {
    /// Create a market executor.
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        instruments: impl IntoIterator<Item = InstrumentConfig>,
        orders: Arc<dyn OrderService>,
        positions: Arc<dyn PositionService>,
        last_prices: LastPrices,
        min_profit_pct: Decimal,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            instruments: instruments
                .into_iter()
                .map(|instrument| (instrument.id.clone(), instrument))
                .collect(),
            orders,
            positions,
            last_prices,
            min_profit_pct,
            book: Mutex::new(HashMap::new()),
        }
    }

    /// Buy the configured quantity at market unless already holding.
    pub async fn buy(&self, instrument_id: &str) -> Result<(), ExecutorError> {
        let instrument = self.instrument(instrument_id)?;
        if self.entry(instrument_id).in_stock {
            return Ok(());
        }
        if !self.possible_to_buy(instrument).await {
            return Ok(());
        }

        let request = OrderRequest::market(
            self.account_id.as_str(),
            instrument_id,
            instrument.quantity,
            Uuid::new_v4().to_string(),
        );
        let response = self.orders.submit_buy(request).await?;

        if response.execution_status == ExecutionStatus::Fill {
            let entry_price = response
                .executed_price
                .or_else(|| self.last_price(instrument_id))
                .unwrap_or(Decimal::ZERO);
            self.book.lock().insert(
                instrument_id.to_string(),
                BookEntry {
                    in_stock: true,
                    entry_price,
                },
            );
        }

        tracing::info!(
            instrument_id,
            order_id = %response.order_id,
            status = ?response.execution_status,
            executed_price = ?response.executed_price,
            "Market buy"
        );
        Ok(())
    }

    /// Sell the configured quantity at market if holding and profitable.
    ///
    /// Returns the per-unit profit of a filled sell, zero otherwise.
    pub async fn sell(&self, instrument_id: &str) -> Result<Decimal, ExecutorError> {
        let instrument = self.instrument(instrument_id)?;
        let entry = self.entry(instrument_id);
        if !entry.in_stock || !self.is_profitable(instrument_id) {
            return Ok(Decimal::ZERO);
        }

        let request = OrderRequest::market(
            self.account_id.as_str(),
            instrument_id,
            instrument.quantity,
            Uuid::new_v4().to_string(),
        );
        let response = self.orders.submit_sell(request).await?;

        let mut profit = Decimal::ZERO;
        if response.execution_status == ExecutionStatus::Fill {
            let executed = response.executed_price.unwrap_or(entry.entry_price);
            profit = executed - entry.entry_price;
            self.book.lock().insert(instrument_id.to_string(), BookEntry::default());
        }

        tracing::info!(
            instrument_id,
            order_id = %response.order_id,
            status = ?response.execution_status,
            %profit,
            "Market sell"
        );
        Ok(profit)
    }

    /// Whether the last price beats the entry price by more than the minimum
    /// profit percentage.
    #[must_use]
    pub fn is_profitable(&self, instrument_id: &str) -> bool {
        let entry_price = self.entry(instrument_id).entry_price;
        if entry_price.is_zero() {
            return false;
        }
        let Some(last) = self.last_price(instrument_id) else {
            return false;
        };

        let gain_pct = last
            .checked_sub(entry_price)
            .and_then(|gain| gain.checked_div(entry_price))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
        match gain_pct {
            Some(pct) => pct > self.min_profit_pct,
            None => {
                tracing::warn!(
                    instrument_id,
                    %last,
                    %entry_price,
                    "Profit percentage out of range, holding"
                );
                false
            }
        }
    }

    /// Returns true if the executor believes it holds the instrument.
    #[must_use]
    pub fn in_stock(&self, instrument_id: &str) -> bool {
        self.entry(instrument_id).in_stock
    }

    /// Entry price of the current holding, if any.
    #[must_use]
    pub fn entry_price(&self, instrument_id: &str) -> Option<Decimal> {
        let entry = self.entry(instrument_id);
        entry.in_stock.then_some(entry.entry_price)
    }

    /// Flatten every managed security position with market orders.
    pub async fn liquidate_all(&self) -> Result<usize, ExecutorError> {
        liquidate_positions(
            &self.account_id,
            &self.instruments,
            self.positions.as_ref(),
            self.orders.as_ref(),
        )
        .await
    }

    async fn possible_to_buy(&self, instrument: &InstrumentConfig) -> bool {
        let Some(last) = self.last_price(&instrument.id) else {
            tracing::warn!(instrument_id = %instrument.id, "No last price, skipping buy");
            return false;
        };
        let Some(required) = instrument.required_funds(last) else {
            tracing::warn!(
                instrument_id = %instrument.id,
                %last,
                "Order cost out of range, skipping buy"
            );
            return false;
        };

        let snapshot = fetch_account_snapshot(self.positions.as_ref(), &self.account_id).await;
        let available = match snapshot {
            Ok(snapshot) => snapshot.available_cash(&instrument.currency),
            Err(e) => {
                tracing::error!(
                    instrument_id = %instrument.id,
                    error = %e,
                    "Position fetch failed"
                );
                Decimal::ZERO
            }
        };

        if available > required {
            true
        } else {
            tracing::warn!(
                instrument_id = %instrument.id,
                %available,
                %required,
                "Insufficient funds, skipping buy"
            );
            false
        }
    }

    fn instrument(&self, instrument_id: &str) -> Result<&InstrumentConfig, ExecutorError> {
        self.instruments
            .get(instrument_id)
            .ok_or_else(|| ExecutorError::UnknownInstrument(instrument_id.to_string()))
    }

    fn entry(&self, instrument_id: &str) -> BookEntry {
        self.book.lock().get(instrument_id).copied().unwrap_or_default()
    }

    fn last_price(&self, instrument_id: &str) -> Option<Decimal> {
        self.last_prices.read().get(instrument_id).copied()
    }
}

impl std::fmt::Debug for MarketExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketExecutor")
            .field("account_id", &self.account_id)
            .field("instruments", &self.instruments.len())
            .field("min_profit_pct", &self.min_profit_pct)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderResponse, OrderType, Quotation};
    use crate::ports::{
        BrokerError, MockOrderService, MockPositionService, MoneyValue, PositionsResponse,
    };
    use rust_decimal_macros::dec;

    fn gazp() -> InstrumentConfig {
        InstrumentConfig::new("gazp", 2, 10, "rub", Quotation::new(0, 10_000_000))
    }

    fn prices(last: Decimal) -> LastPrices {
        Arc::new(RwLock::new(HashMap::from([("gazp".to_string(), last)])))
    }

    fn cash(rub: Decimal) -> MockPositionService {
        let mut positions = MockPositionService::new();
        positions.expect_get_positions().returning(move |_| {
            Ok(PositionsResponse {
                money: vec![MoneyValue::new("rub", rub)],
                ..PositionsResponse::default()
            })
        });
        positions
    }

    fn fill(order_id: &str, price: Decimal) -> OrderResponse {
        OrderResponse {
            order_id: order_id.into(),
            execution_status: ExecutionStatus::Fill,
            executed_price: Some(price),
        }
    }

    fn executor(
        orders: MockOrderService,
        positions: MockPositionService,
        last: &LastPrices,
    ) -> MarketExecutor {
        MarketExecutor::new(
            "acc",
            [gazp()],
            Arc::new(orders),
            Arc::new(positions),
            Arc::clone(last),
            dec!(1),
        )
    }

    #[tokio::test]
    async fn test_buy_fill_records_entry_price() {
        let mut orders = MockOrderService::new();
        orders
            .expect_submit_buy()
            .withf(|r| r.order_type == OrderType::Market && r.quantity == 2)
            .times(1)
            .returning(|_| Ok(fill("b-1", dec!(150.5))));

        let last = prices(dec!(150));
        let executor = executor(orders, cash(dec!(3001)), &last);

        executor.buy("gazp").await.unwrap();
        assert!(executor.in_stock("gazp"));
        assert_eq!(executor.entry_price("gazp"), Some(dec!(150.5)));

        // Already in stock: no second order.
        executor.buy("gazp").await.unwrap();
    }

    #[tokio::test]
    async fn test_buy_skipped_when_cash_equals_cost() {
        let mut orders = MockOrderService::new();
        orders.expect_submit_buy().never();

        let last = prices(dec!(150));
        let executor = executor(orders, cash(dec!(3000)), &last);

        executor.buy("gazp").await.unwrap();
        assert!(!executor.in_stock("gazp"));
    }

    #[tokio::test]
    async fn test_buy_treats_fetch_failure_as_no_cash() {
        let mut orders = MockOrderService::new();
        orders.expect_submit_buy().never();
        let mut positions = MockPositionService::new();
        positions
            .expect_get_positions()
            .returning(|_| Err(BrokerError::Connection("down".into())));

        let last = prices(dec!(150));
        let executor = executor(orders, positions, &last);

        executor.buy("gazp").await.unwrap();
        assert!(!executor.in_stock("gazp"));
    }

    #[tokio::test]
    async fn test_buy_without_fill_does_not_mark_in_stock() {
        let mut orders = MockOrderService::new();
        orders.expect_submit_buy().returning(|_| {
            Ok(OrderResponse {
                order_id: "b-1".into(),
                execution_status: ExecutionStatus::New,
                executed_price: None,
            })
        });

        let last = prices(dec!(150));
        let executor = executor(orders, cash(dec!(10_000)), &last);

        executor.buy("gazp").await.unwrap();
        assert!(!executor.in_stock("gazp"));
    }

    #[tokio::test]
    async fn test_profit_gate_and_sell_profit() {
        let mut orders = MockOrderService::new();
        orders.expect_submit_buy().returning(|_| Ok(fill("b-1", dec!(100))));
        orders
            .expect_submit_sell()
            .times(1)
            .returning(|_| Ok(fill("s-1", dec!(102))));

        let last = prices(dec!(100));
        let executor = executor(orders, cash(dec!(10_000)), &last);
        executor.buy("gazp").await.unwrap();

        // Exactly 1% above entry does not clear a 1% gate.
        last.write().insert("gazp".into(), dec!(101));
        assert!(!executor.is_profitable("gazp"));
        assert_eq!(executor.sell("gazp").await.unwrap(), Decimal::ZERO);
        assert!(executor.in_stock("gazp"));

        last.write().insert("gazp".into(), dec!(101.5));
        assert!(executor.is_profitable("gazp"));
        assert_eq!(executor.sell("gazp").await.unwrap(), dec!(2));
        assert!(!executor.in_stock("gazp"));
    }

    #[tokio::test]
    async fn test_buy_skipped_when_cost_overflows() {
        let mut orders = MockOrderService::new();
        orders.expect_submit_buy().never();
        let mut positions = MockPositionService::new();
        positions.expect_get_positions().never();

        let last = prices(Decimal::MAX);
        let executor = executor(orders, positions, &last);

        executor.buy("gazp").await.unwrap();
        assert!(!executor.in_stock("gazp"));
    }

    #[tokio::test]
    async fn test_profit_gate_holds_when_percentage_overflows() {
        let mut orders = MockOrderService::new();
        orders
            .expect_submit_buy()
            .returning(|_| Ok(fill("b-1", Decimal::new(1, 28))));
        orders.expect_submit_sell().never();

        let last = prices(dec!(1));
        let executor = executor(orders, cash(dec!(10_000)), &last);
        executor.buy("gazp").await.unwrap();
        assert_eq!(executor.entry_price("gazp"), Some(Decimal::new(1, 28)));

        last.write().insert("gazp".into(), Decimal::MAX);
        assert!(!executor.is_profitable("gazp"));
        assert_eq!(executor.sell("gazp").await.unwrap(), Decimal::ZERO);
        assert!(executor.in_stock("gazp"));
    }

    #[tokio::test]
    async fn test_sell_when_not_in_stock_returns_zero() {
        let mut orders = MockOrderService::new();
        orders.expect_submit_sell().never();

        let last = prices(dec!(150));
        let executor = executor(orders, cash(dec!(0)), &last);

        assert_eq!(executor.sell("gazp").await.unwrap(), Decimal::ZERO);
        assert!(!executor.is_profitable("gazp"));
    }

    #[tokio::test]
    async fn test_unknown_instrument() {
        let last = prices(dec!(150));
        let executor = executor(MockOrderService::new(), MockPositionService::new(), &last);

        assert_eq!(
            executor.buy("sber").await,
            Err(ExecutorError::UnknownInstrument("sber".into()))
        );
        assert_eq!(
            executor.sell("sber").await,
            Err(ExecutorError::UnknownInstrument("sber".into()))
        );
    }
}
