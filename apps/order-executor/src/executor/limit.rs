//! Limit-order executor.
//!
//! Strategy code calls the operations here; the stream ingestor keeps the
//! two stores current in the background. Within one instrument the caller
//! is expected to serialise its own calls.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    AccountSnapshot, InstrumentConfig, InstrumentState, Lifecycle, OrderRequest,
    ReplaceOrderRequest,
};
use crate::error::ExecutorError;
use crate::store::{InstrumentStateStore, PositionStore};

use super::VenueClients;
use super::ingestor::{StreamHealth, StreamIngestor};
use super::liquidation::liquidate_positions;

/// Places, cancels and replaces tick-aligned limit orders for a fixed set of
/// instruments on one account.
#[derive(Debug)]
pub struct OrderExecutor {
    account_id: String,
    instruments: HashMap<String, InstrumentConfig>,
    clients: VenueClients,
    positions: Arc<PositionStore>,
    states: Arc<InstrumentStateStore>,
    ingestor: StreamIngestor,
}

impl OrderExecutor {
    /// Create an executor. Streams are not consumed until [`Self::start`].
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        instruments: impl IntoIterator<Item = InstrumentConfig>,
        clients: VenueClients,
    ) -> Self {
        let account_id = account_id.into();
        let positions = Arc::new(PositionStore::new(account_id.clone()));
        let states = Arc::new(InstrumentStateStore::new());
        let ingestor = StreamIngestor::new(
            account_id.clone(),
            Arc::clone(&positions),
            Arc::clone(&states),
        );

        Self {
            account_id,
            instruments: instruments
                .into_iter()
                .map(|instrument| (instrument.id.clone(), instrument))
                .collect(),
            clients,
            positions,
            states,
            ingestor,
        }
    }

    /// Start ingesting the positions and trades streams.
    pub fn start(&self) {
        self.ingestor.start(
            Arc::clone(&self.clients.positions),
            Arc::clone(&self.clients.streams),
        );
    }

    /// Place a limit buy at the tick nearest `price`.
    ///
    /// Does nothing (and returns `Ok`) if available cash does not strictly
    /// exceed the cost of the order.
    pub async fn buy_limit(
        &self,
        instrument_id: &str,
        price: Decimal,
    ) -> Result<(), ExecutorError> {
        let instrument = self.instrument(instrument_id)?;
        let limit_price = instrument.quantize(price);

        if !self.possible_to_buy(instrument_id, limit_price.to_decimal()) {
            return Ok(());
        }

        let request = OrderRequest::limit(
            self.account_id.as_str(),
            instrument_id,
            instrument.quantity,
            limit_price,
            Uuid::new_v4().to_string(),
        );
        let response = self.clients.orders.submit_buy(request).await?;

        tracing::info!(
            instrument_id,
            order_id = %response.order_id,
            price = %limit_price,
            quantity = instrument.quantity,
            "Limit buy placed"
        );
        self.states
            .update(instrument_id, InstrumentState::pending_buy(response.order_id));
        Ok(())
    }

    /// Place a limit sell at the tick nearest `price`.
    ///
    /// Only acts when the instrument is held; otherwise logs and returns `Ok`.
    pub async fn sell_limit(
        &self,
        instrument_id: &str,
        price: Decimal,
    ) -> Result<(), ExecutorError> {
        let instrument = self.instrument(instrument_id)?;

        match self.states.get(instrument_id) {
            None => {
                tracing::warn!(instrument_id, "No state recorded, not selling");
                return Ok(());
            }
            Some(state) if state.lifecycle() != Lifecycle::Holding => {
                tracing::warn!(instrument_id, state = %state, "Not holding, not selling");
                return Ok(());
            }
            Some(_) => {}
        }

        let limit_price = instrument.quantize(price);
        let request = OrderRequest::limit(
            self.account_id.as_str(),
            instrument_id,
            instrument.quantity,
            limit_price,
            Uuid::new_v4().to_string(),
        );
        let response = self.clients.orders.submit_sell(request).await?;

        tracing::info!(
            instrument_id,
            order_id = %response.order_id,
            price = %limit_price,
            quantity = instrument.quantity,
            "Limit sell placed"
        );
        self.states
            .update(instrument_id, InstrumentState::pending_sell(response.order_id));
        Ok(())
    }

    /// Cancel the resting order for an instrument.
    pub async fn cancel_limit(&self, instrument_id: &str) -> Result<(), ExecutorError> {
        let (state, order_id) = self.resting_order(instrument_id, "cancel_limit")?;
        let Some(next) = state.after_cancel() else {
            return Err(invalid_state(instrument_id, "cancel_limit", &state));
        };

        let ack = self
            .clients
            .orders
            .cancel_order(&self.account_id, &order_id)
            .await?;

        tracing::info!(
            instrument_id,
            order_id = %order_id,
            cancelled_at = %ack.time,
            state = %next,
            "Limit order cancelled"
        );
        self.states.update(instrument_id, next);
        Ok(())
    }

    /// Move the resting order for an instrument to the tick nearest `price`.
    pub async fn replace_limit(
        &self,
        instrument_id: &str,
        price: Decimal,
    ) -> Result<(), ExecutorError> {
        let instrument = self.instrument(instrument_id)?;
        let (state, order_id) = self.resting_order(instrument_id, "replace_limit")?;

        let limit_price = instrument.quantize(price);
        let request = ReplaceOrderRequest {
            account_id: self.account_id.clone(),
            order_id: order_id.clone(),
            idempotency_key: Uuid::new_v4().to_string(),
            quantity: instrument.quantity,
            price: limit_price,
        };
        let response = self.clients.orders.replace_order(request).await?;

        let Some(next) = state.with_order_id(response.order_id) else {
            return Err(invalid_state(instrument_id, "replace_limit", &state));
        };
        tracing::info!(
            instrument_id,
            old_order_id = %order_id,
            state = %next,
            price = %limit_price,
            "Limit order replaced"
        );
        self.states.update(instrument_id, next);
        Ok(())
    }

    /// Whether available cash strictly exceeds `price × quantity × lot`.
    ///
    /// Reads the cached snapshot. Unknown instruments are never affordable.
    #[must_use]
    pub fn possible_to_buy(&self, instrument_id: &str, price: Decimal) -> bool {
        let Some(instrument) = self.instruments.get(instrument_id) else {
            tracing::warn!(instrument_id, "Funds check for unknown instrument");
            return false;
        };

        let Some(required) = instrument.required_funds(price) else {
            tracing::warn!(instrument_id, %price, "Order cost out of range, skipping buy");
            return false;
        };
        let available = self.positions.get().available_cash(&instrument.currency);

        if available > required {
            true
        } else {
            tracing::warn!(
                instrument_id,
                currency = %instrument.currency,
                %available,
                %required,
                "Insufficient funds, skipping buy"
            );
            false
        }
    }

    /// Flatten every managed security position with market orders.
    pub async fn liquidate_all(&self) -> Result<usize, ExecutorError> {
        liquidate_positions(
            &self.account_id,
            &self.instruments,
            self.clients.positions.as_ref(),
            self.clients.orders.as_ref(),
        )
        .await
    }

    /// Stop stream ingestion and wait for it to finish.
    pub async fn shutdown(&self) {
        self.ingestor.shutdown().await;
    }

    /// Current lifecycle state of an instrument.
    #[must_use]
    pub fn instrument_state(&self, instrument_id: &str) -> Option<InstrumentState> {
        self.states.get(instrument_id)
    }

    /// Latest account snapshot.
    #[must_use]
    pub fn positions(&self) -> Arc<AccountSnapshot> {
        self.positions.get()
    }

    /// Stream loop liveness.
    #[must_use]
    pub fn stream_health(&self) -> Arc<StreamHealth> {
        self.ingestor.health()
    }

    /// Managed account id.
    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Configuration of a managed instrument.
    #[must_use]
    pub fn instrument_config(&self, instrument_id: &str) -> Option<&InstrumentConfig> {
        self.instruments.get(instrument_id)
    }

    fn instrument(&self, instrument_id: &str) -> Result<&InstrumentConfig, ExecutorError> {
        self.instruments
            .get(instrument_id)
            .ok_or_else(|| ExecutorError::UnknownInstrument(instrument_id.to_string()))
    }

    fn resting_order(
        &self,
        instrument_id: &str,
        operation: &'static str,
    ) -> Result<(InstrumentState, String), ExecutorError> {
        let Some(state) = self.states.get(instrument_id) else {
            return Err(ExecutorError::InvalidState {
                instrument_id: instrument_id.to_string(),
                operation,
                state: "missing".to_string(),
            });
        };
        match state.pending_order_id().map(str::to_string) {
            Some(order_id) => Ok((state, order_id)),
            None => Err(invalid_state(instrument_id, operation, &state)),
        }
    }
}

fn invalid_state(
    instrument_id: &str,
    operation: &'static str,
    state: &InstrumentState,
) -> ExecutorError {
    ExecutorError::InvalidState {
        instrument_id: instrument_id.to_string(),
        operation,
        state: state.lifecycle().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CancelAck, CashBalance, ExecutionStatus, OrderResponse, OrderType, Quotation,
    };
    use crate::infrastructure::paper::PaperVenue;
    use crate::ports::{BrokerError, MockOrderService};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sber() -> InstrumentConfig {
        InstrumentConfig::new("sber", 10, 1, "rub", Quotation::new(0, 10_000_000))
    }

    fn executor_with(orders: MockOrderService) -> OrderExecutor {
        let venue = Arc::new(PaperVenue::new());
        let clients = VenueClients::new(Arc::new(orders), venue.clone(), venue);
        OrderExecutor::new("acc", [sber()], clients)
    }

    fn fund(executor: &OrderExecutor, rub: Decimal) {
        let mut snapshot = AccountSnapshot::empty("acc");
        snapshot.money.push(CashBalance {
            currency: "rub".into(),
            available: rub,
            blocked: Decimal::ZERO,
        });
        executor.positions.update(snapshot);
    }

    fn accepted(order_id: &str) -> OrderResponse {
        OrderResponse {
            order_id: order_id.into(),
            execution_status: ExecutionStatus::New,
            executed_price: None,
        }
    }

    #[tokio::test]
    async fn test_buy_limit_submits_quantized_limit_order() {
        let mut orders = MockOrderService::new();
        orders
            .expect_submit_buy()
            .withf(|r| {
                r.order_type == OrderType::Limit
                    && r.quantity == 10
                    && r.price == Some(Quotation::new(99, 990_000_000))
                    && r.account_id == "acc"
                    && Uuid::parse_str(&r.order_id).is_ok()
            })
            .times(1)
            .returning(|_| Ok(accepted("o-1")));

        let executor = executor_with(orders);
        fund(&executor, dec!(1000));

        executor.buy_limit("sber", dec!(99.994)).await.unwrap();

        assert_eq!(
            executor.instrument_state("sber"),
            Some(InstrumentState::pending_buy("o-1"))
        );
    }

    #[tokio::test]
    async fn test_buy_limit_error_leaves_state_untouched() {
        let mut orders = MockOrderService::new();
        orders
            .expect_submit_buy()
            .returning(|_| Err(BrokerError::RateLimited { retry_after_secs: 1 }));

        let executor = executor_with(orders);
        fund(&executor, dec!(1000));

        let err = executor.buy_limit("sber", dec!(10)).await.unwrap_err();
        assert_eq!(err, ExecutorError::Broker(BrokerError::RateLimited { retry_after_secs: 1 }));
        assert!(executor.instrument_state("sber").is_none());
    }

    #[tokio::test]
    async fn test_cancel_failure_leaves_state_untouched() {
        let mut orders = MockOrderService::new();
        orders
            .expect_cancel_order()
            .withf(|account_id, order_id| account_id == "acc" && order_id == "o-1")
            .returning(|_, _| Err(BrokerError::OrderNotFound("o-1".into())));

        let executor = executor_with(orders);
        executor.states.update("sber", InstrumentState::pending_buy("o-1"));

        let err = executor.cancel_limit("sber").await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::BrokerError);
        assert_eq!(
            executor.instrument_state("sber"),
            Some(InstrumentState::pending_buy("o-1"))
        );
    }

    #[tokio::test]
    async fn test_cancel_pending_sell_returns_to_holding() {
        let mut orders = MockOrderService::new();
        orders
            .expect_cancel_order()
            .times(1)
            .returning(|_, _| Ok(CancelAck { time: Utc::now() }));

        let executor = executor_with(orders);
        executor.states.update("sber", InstrumentState::pending_sell("o-2"));

        executor.cancel_limit("sber").await.unwrap();
        assert_eq!(executor.instrument_state("sber"), Some(InstrumentState::holding()));
    }

    #[tokio::test]
    async fn test_replace_sends_previous_order_id_and_new_key() {
        let mut orders = MockOrderService::new();
        orders
            .expect_replace_order()
            .withf(|r| {
                r.order_id == "o-1"
                    && r.idempotency_key != "o-1"
                    && r.price == Quotation::new(101, 0)
                    && r.quantity == 10
            })
            .times(1)
            .returning(|_| Ok(accepted("o-2")));

        let executor = executor_with(orders);
        executor.states.update("sber", InstrumentState::pending_buy("o-1"));

        executor.replace_limit("sber", dec!(100.996)).await.unwrap();
        assert_eq!(
            executor.instrument_state("sber"),
            Some(InstrumentState::pending_buy("o-2"))
        );
    }

    #[tokio::test]
    async fn test_unknown_instrument_is_rejected_before_any_call() {
        let mut orders = MockOrderService::new();
        orders.expect_submit_buy().never();
        orders.expect_submit_sell().never();
        orders.expect_replace_order().never();

        let executor = executor_with(orders);
        fund(&executor, dec!(1_000_000));

        for result in [
            executor.buy_limit("gazp", dec!(1)).await,
            executor.sell_limit("gazp", dec!(1)).await,
            executor.replace_limit("gazp", dec!(1)).await,
        ] {
            assert_eq!(result, Err(ExecutorError::UnknownInstrument("gazp".into())));
        }
        assert!(!executor.possible_to_buy("gazp", dec!(1)));
    }

    #[tokio::test]
    async fn test_buy_at_unrepresentable_cost_is_skipped() {
        let mut orders = MockOrderService::new();
        orders.expect_submit_buy().never();

        let executor = executor_with(orders);
        fund(&executor, dec!(1_000_000));

        assert!(!executor.possible_to_buy("sber", Decimal::MAX));
        executor.buy_limit("sber", Decimal::MAX).await.unwrap();
        assert!(executor.instrument_state("sber").is_none());
    }
}
