//! In-memory paper venue.
//!
//! Implements every venue port without network access. Market orders fill
//! immediately at the configured market price; limit orders rest until
//! [`PaperVenue::fill`] is called. Stream events are pushed explicitly and
//! delivered to every subscriber regardless of account, so account filtering
//! is left to the consumer.
//!
//! Failures can be injected per call type for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::domain::{
    AccountSnapshot, CancelAck, ExecutionStatus, InstrumentBalance, OrderDirection, OrderRequest,
    OrderResponse, OrderType, Quotation, ReplaceOrderRequest, TradeEvent,
};
use crate::ports::{
    AccountStreams, BrokerError, InstrumentCatalog, MoneyValue, OrderService, PositionService,
    PositionsResponse, ShareInfo, Subscription,
};

/// Default stream buffer size.
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// Price used for market fills when none was set for the instrument.
const DEFAULT_MARKET_PRICE: Decimal = Decimal::ONE_HUNDRED;

/// Order as tracked by the paper venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperOrder {
    /// Venue order id.
    pub order_id: String,
    /// Owning account.
    pub account_id: String,
    /// Instrument identifier.
    pub instrument_id: String,
    /// Side.
    pub direction: OrderDirection,
    /// Quantity in lots.
    pub quantity: i64,
    /// Order type.
    pub order_type: OrderType,
    /// Limit price, if any.
    pub price: Option<Quotation>,
    /// Current status.
    pub status: ExecutionStatus,
}

impl PaperOrder {
    const fn is_resting(&self) -> bool {
        matches!(
            self.status,
            ExecutionStatus::New | ExecutionStatus::PartiallyFilled
        )
    }
}

#[derive(Debug, Default)]
struct Failures {
    next_order: Option<BrokerError>,
    by_instrument: HashMap<String, BrokerError>,
    positions: Option<BrokerError>,
    subscribe: Option<BrokerError>,
}

#[derive(Debug, Default)]
struct Book {
    positions: PositionsResponse,
    market_prices: HashMap<String, Decimal>,
    shares: Vec<ShareInfo>,
    orders: HashMap<String, PaperOrder>,
    submitted: Vec<OrderRequest>,
    cancelled: Vec<String>,
    replaced: Vec<ReplaceOrderRequest>,
    failures: Failures,
}

/// Paper trading venue.
#[derive(Debug)]
pub struct PaperVenue {
    order_counter: AtomicU64,
    book: RwLock<Book>,
    positions_tx: broadcast::Sender<AccountSnapshot>,
    trades_tx: broadcast::Sender<TradeEvent>,
    closed: CancellationToken,
    buffer: usize,
}

impl Default for PaperVenue {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperVenue {
    /// Create an empty venue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_STREAM_BUFFER)
    }

    /// Create an empty venue with a given stream buffer size.
    #[must_use]
    pub fn with_buffer(buffer: usize) -> Self {
        let buffer = buffer.max(1);
        let (positions_tx, _) = broadcast::channel(buffer);
        let (trades_tx, _) = broadcast::channel(buffer);
        Self {
            order_counter: AtomicU64::new(1),
            book: RwLock::new(Book::default()),
            positions_tx,
            trades_tx,
            closed: CancellationToken::new(),
            buffer,
        }
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Replace the positions returned by `get_positions`.
    pub fn set_positions(&self, positions: PositionsResponse) {
        self.book.write().positions = positions;
    }

    /// Set available cash in one currency.
    pub fn set_cash(&self, currency: &str, amount: Decimal) {
        let mut book = self.book.write();
        let money = &mut book.positions.money;
        match money.iter_mut().find(|m| m.currency == currency) {
            Some(existing) => existing.value = amount,
            None => money.push(MoneyValue::new(currency, amount)),
        }
    }

    /// Set the unit balance of one security.
    pub fn set_security(&self, instrument_id: &str, balance: i64) {
        let mut book = self.book.write();
        let securities = &mut book.positions.securities;
        match securities.iter_mut().find(|s| s.instrument_id == instrument_id) {
            Some(existing) => existing.balance = balance,
            None => securities.push(InstrumentBalance {
                instrument_id: instrument_id.to_string(),
                balance,
                blocked: 0,
            }),
        }
    }

    /// Set the price market orders fill at.
    pub fn set_market_price(&self, instrument_id: &str, price: Decimal) {
        self.book
            .write()
            .market_prices
            .insert(instrument_id.to_string(), price);
    }

    /// Replace the share catalog.
    pub fn set_shares(&self, shares: Vec<ShareInfo>) {
        self.book.write().shares = shares;
    }

    // =========================================================================
    // Failure injection
    // =========================================================================

    /// Fail the next order call (submit, cancel or replace) once.
    pub fn fail_next_order(&self, error: BrokerError) {
        self.book.write().failures.next_order = Some(error);
    }

    /// Fail every order call on one instrument until cleared.
    pub fn fail_instrument(&self, instrument_id: &str, error: BrokerError) {
        self.book
            .write()
            .failures
            .by_instrument
            .insert(instrument_id.to_string(), error);
    }

    /// Fail `get_positions` until cleared.
    pub fn fail_positions(&self, error: BrokerError) {
        self.book.write().failures.positions = Some(error);
    }

    /// Fail stream subscriptions until cleared.
    pub fn fail_subscriptions(&self, error: BrokerError) {
        self.book.write().failures.subscribe = Some(error);
    }

    /// Clear every injected failure.
    pub fn clear_failures(&self) {
        self.book.write().failures = Failures::default();
    }

    // =========================================================================
    // Streams
    // =========================================================================

    /// Push a positions snapshot to subscribers. Returns the number reached.
    pub fn push_positions(&self, snapshot: AccountSnapshot) -> usize {
        self.positions_tx.send(snapshot).unwrap_or(0)
    }

    /// Push a trade to subscribers. Returns the number reached.
    pub fn push_trade(&self, trade: TradeEvent) -> usize {
        self.trades_tx.send(trade).unwrap_or(0)
    }

    /// Fill a resting order and push the resulting trade.
    ///
    /// Returns `None` if the order is unknown or not resting.
    pub fn fill(&self, order_id: &str) -> Option<TradeEvent> {
        let trade = {
            let mut book = self.book.write();
            let market_price = {
                let order = book.orders.get(order_id)?;
                if !order.is_resting() {
                    return None;
                }
                book.market_prices
                    .get(&order.instrument_id)
                    .copied()
                    .unwrap_or(DEFAULT_MARKET_PRICE)
            };
            let order = book.orders.get_mut(order_id)?;
            order.status = ExecutionStatus::Fill;
            TradeEvent {
                order_id: order.order_id.clone(),
                account_id: order.account_id.clone(),
                instrument_id: order.instrument_id.clone(),
                direction: order.direction,
                price: order.price.map_or(market_price, Quotation::to_decimal),
                quantity: order.quantity,
                executed_at: Utc::now(),
            }
        };
        self.push_trade(trade.clone());
        Some(trade)
    }

    /// End every open subscription as if the venue hung up.
    pub fn close_streams(&self) {
        self.closed.cancel();
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Every submitted order request, in order.
    #[must_use]
    pub fn submitted_orders(&self) -> Vec<OrderRequest> {
        self.book.read().submitted.clone()
    }

    /// Order ids cancelled, in order.
    #[must_use]
    pub fn cancelled_orders(&self) -> Vec<String> {
        self.book.read().cancelled.clone()
    }

    /// Replace requests received, in order.
    #[must_use]
    pub fn replaced_orders(&self) -> Vec<ReplaceOrderRequest> {
        self.book.read().replaced.clone()
    }

    /// Look up an order.
    #[must_use]
    pub fn order(&self, order_id: &str) -> Option<PaperOrder> {
        self.book.read().orders.get(order_id).cloned()
    }

    /// Every order on one instrument, including retired ones.
    #[must_use]
    pub fn orders_for(&self, instrument_id: &str) -> Vec<PaperOrder> {
        self.book
            .read()
            .orders
            .values()
            .filter(|o| o.instrument_id == instrument_id)
            .cloned()
            .collect()
    }

    fn next_order_id(&self) -> String {
        format!("paper-{}", self.order_counter.fetch_add(1, Ordering::SeqCst))
    }

    fn take_failure(book: &mut Book, instrument_id: Option<&str>) -> Option<BrokerError> {
        if let Some(error) = book.failures.next_order.take() {
            return Some(error);
        }
        instrument_id.and_then(|id| book.failures.by_instrument.get(id).cloned())
    }

    fn submit(
        &self,
        request: OrderRequest,
        direction: OrderDirection,
    ) -> Result<OrderResponse, BrokerError> {
        let mut book = self.book.write();
        if let Some(error) = Self::take_failure(&mut book, Some(&request.instrument_id)) {
            return Err(error);
        }

        let order_id = self.next_order_id();
        let (status, executed_price) = match request.order_type {
            OrderType::Market => {
                let price = book
                    .market_prices
                    .get(&request.instrument_id)
                    .copied()
                    .unwrap_or(DEFAULT_MARKET_PRICE);
                (ExecutionStatus::Fill, Some(price))
            }
            OrderType::Limit => (ExecutionStatus::New, None),
        };

        book.orders.insert(
            order_id.clone(),
            PaperOrder {
                order_id: order_id.clone(),
                account_id: request.account_id.clone(),
                instrument_id: request.instrument_id.clone(),
                direction,
                quantity: request.quantity,
                order_type: request.order_type,
                price: request.price,
                status,
            },
        );
        book.submitted.push(request);

        Ok(OrderResponse {
            order_id,
            execution_status: status,
            executed_price,
        })
    }

    fn subscribe<T>(&self, source: &broadcast::Sender<T>) -> Result<Subscription<T>, BrokerError>
    where
        T: Clone + Send + 'static,
    {
        if let Some(error) = self.book.read().failures.subscribe.clone() {
            return Err(error);
        }

        let mut rx = source.subscribe();
        let (tx, updates) = mpsc::channel(self.buffer);
        let stop = CancellationToken::new();
        let listener_stop = stop.clone();
        let closed = self.closed.clone();

        let listener = async move {
            loop {
                tokio::select! {
                    biased;
                    () = listener_stop.cancelled() => return Ok(()),
                    () = closed.cancelled() => return Ok(()),
                    message = rx.recv() => match message {
                        Ok(item) => {
                            if tx.send(item).await.is_err() {
                                return Ok(());
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Paper stream subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return Ok(()),
                    },
                }
            }
        }
        .boxed();

        Ok(Subscription::new(updates, listener, stop))
    }
}

#[async_trait]
impl OrderService for PaperVenue {
    async fn submit_buy(&self, request: OrderRequest) -> Result<OrderResponse, BrokerError> {
        self.submit(request, OrderDirection::Buy)
    }

    async fn submit_sell(&self, request: OrderRequest) -> Result<OrderResponse, BrokerError> {
        self.submit(request, OrderDirection::Sell)
    }

    async fn cancel_order(
        &self,
        _account_id: &str,
        order_id: &str,
    ) -> Result<CancelAck, BrokerError> {
        let mut book = self.book.write();
        let instrument_id = book.orders.get(order_id).map(|o| o.instrument_id.clone());
        if let Some(error) = Self::take_failure(&mut book, instrument_id.as_deref()) {
            return Err(error);
        }

        match book.orders.get_mut(order_id) {
            Some(order) if order.is_resting() => order.status = ExecutionStatus::Cancelled,
            _ => return Err(BrokerError::OrderNotFound(order_id.to_string())),
        }
        book.cancelled.push(order_id.to_string());

        Ok(CancelAck { time: Utc::now() })
    }

    async fn replace_order(
        &self,
        request: ReplaceOrderRequest,
    ) -> Result<OrderResponse, BrokerError> {
        let mut book = self.book.write();
        let instrument_id = book
            .orders
            .get(&request.order_id)
            .map(|o| o.instrument_id.clone());
        if let Some(error) = Self::take_failure(&mut book, instrument_id.as_deref()) {
            return Err(error);
        }

        let Some(previous) = book
            .orders
            .get_mut(&request.order_id)
            .filter(|o| o.is_resting())
        else {
            return Err(BrokerError::OrderNotFound(request.order_id.clone()));
        };
        previous.status = ExecutionStatus::Cancelled;
        let mut replacement = previous.clone();

        let order_id = self.next_order_id();
        replacement.order_id.clone_from(&order_id);
        replacement.quantity = request.quantity;
        replacement.price = Some(request.price);
        replacement.status = ExecutionStatus::New;

        book.orders.insert(order_id.clone(), replacement);
        book.replaced.push(request);

        Ok(OrderResponse {
            order_id,
            execution_status: ExecutionStatus::New,
            executed_price: None,
        })
    }
}

#[async_trait]
impl PositionService for PaperVenue {
    async fn get_positions(&self, _account_id: &str) -> Result<PositionsResponse, BrokerError> {
        let book = self.book.read();
        if let Some(error) = book.failures.positions.clone() {
            return Err(error);
        }
        Ok(book.positions.clone())
    }
}

#[async_trait]
impl AccountStreams for PaperVenue {
    async fn positions_stream(
        &self,
        _account_ids: Vec<String>,
    ) -> Result<Subscription<AccountSnapshot>, BrokerError> {
        self.subscribe(&self.positions_tx)
    }

    async fn trades_stream(
        &self,
        _account_ids: Vec<String>,
    ) -> Result<Subscription<TradeEvent>, BrokerError> {
        self.subscribe(&self.trades_tx)
    }
}

#[async_trait]
impl InstrumentCatalog for PaperVenue {
    async fn shares(&self) -> Result<Vec<ShareInfo>, BrokerError> {
        Ok(self.book.read().shares.clone())
    }
}
