//! Background ingestion of the positions and trades streams.
//!
//! Two loops run on their own tasks, both tied to one cancellation token and
//! one [`TaskTracker`]:
//!
//! - **positions**: seed the [`PositionStore`] from a unary fetch, then apply
//!   every streamed snapshot.
//! - **trades**: turn every execution for the managed account into a
//!   lifecycle transition in the [`InstrumentStateStore`].
//!
//! Each loop drives its subscription's listener on a tracked task, drains the
//! update channel until cancellation or closure, then stops the subscription
//! and awaits the listener. [`StreamIngestor::shutdown`] returns only after
//! every tracked task has finished, so no store write happens afterwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::domain::{AccountSnapshot, InstrumentState, TradeEvent};
use crate::ports::{AccountStreams, BrokerError, PositionService, Subscription};
use crate::store::{InstrumentStateStore, PositionStore};

use super::bootstrap::fetch_account_snapshot;

/// Liveness of the two stream loops.
///
/// A flag is true while its loop is subscribed and draining updates.
#[derive(Debug, Default)]
pub struct StreamHealth {
    positions: AtomicBool,
    trades: AtomicBool,
}

impl StreamHealth {
    /// Positions loop is live.
    #[must_use]
    pub fn positions_live(&self) -> bool {
        self.positions.load(Ordering::Acquire)
    }

    /// Trades loop is live.
    #[must_use]
    pub fn trades_live(&self) -> bool {
        self.trades.load(Ordering::Acquire)
    }

    fn flag(&self, stream: StreamKind) -> &AtomicBool {
        match stream {
            StreamKind::Positions => &self.positions,
            StreamKind::Trades => &self.trades,
        }
    }

    fn set(&self, stream: StreamKind, live: bool) {
        self.flag(stream).store(live, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Positions,
    Trades,
}

impl StreamKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Positions => "positions",
            Self::Trades => "trades",
        }
    }
}

/// Update delivered by either stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountUpdate {
    /// Fresh account snapshot.
    Positions(AccountSnapshot),
    /// Trade execution.
    Trade(TradeEvent),
}

/// Stores and identity shared by both loops.
#[derive(Debug)]
struct Sink {
    account_id: String,
    positions: Arc<PositionStore>,
    states: Arc<InstrumentStateStore>,
    health: Arc<StreamHealth>,
}

impl Sink {
    fn apply(&self, update: AccountUpdate) {
        match update {
            AccountUpdate::Positions(snapshot) => {
                tracing::debug!(
                    account_id = %snapshot.account_id,
                    currencies = snapshot.money.len(),
                    securities = snapshot.securities.len(),
                    "Positions update"
                );
                self.positions.update(snapshot);
            }
            AccountUpdate::Trade(trade) => self.apply_trade(&trade),
        }
    }

    fn apply_trade(&self, trade: &TradeEvent) {
        if trade.account_id != self.account_id {
            tracing::debug!(
                account_id = %trade.account_id,
                order_id = %trade.order_id,
                "Skipping trade for another account"
            );
            return;
        }

        let pending = self
            .states
            .get(&trade.instrument_id)
            .and_then(|s| s.pending_order_id().map(str::to_string));
        if let Some(pending) = pending.filter(|id| *id != trade.order_id) {
            tracing::warn!(
                instrument_id = %trade.instrument_id,
                pending_order_id = %pending,
                order_id = %trade.order_id,
                "Trade does not match resting order, applying anyway"
            );
        }

        let next = InstrumentState::after_fill(trade.direction);
        tracing::info!(
            instrument_id = %trade.instrument_id,
            order_id = %trade.order_id,
            direction = %trade.direction,
            price = %trade.price,
            quantity = trade.quantity,
            state = %next,
            "Trade applied"
        );
        self.states.update(&trade.instrument_id, next);
    }
}

/// Owner of the two stream loops.
#[derive(Debug)]
pub struct StreamIngestor {
    sink: Arc<Sink>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    started: AtomicBool,
}

impl StreamIngestor {
    /// Create an ingestor writing into the given stores.
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        positions: Arc<PositionStore>,
        states: Arc<InstrumentStateStore>,
    ) -> Self {
        Self {
            sink: Arc::new(Sink {
                account_id: account_id.into(),
                positions,
                states,
                health: Arc::new(StreamHealth::default()),
            }),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Liveness flags.
    #[must_use]
    pub fn health(&self) -> Arc<StreamHealth> {
        Arc::clone(&self.sink.health)
    }

    /// Apply one update to the stores.
    pub fn apply(&self, update: AccountUpdate) {
        self.sink.apply(update);
    }

    /// Spawn both loops. A second call is a no-op.
    pub fn start(&self, positions: Arc<dyn PositionService>, streams: Arc<dyn AccountStreams>) {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::warn!("Stream ingestor already started");
            return;
        }
        if self.cancel.is_cancelled() {
            tracing::warn!("Stream ingestor already shut down, not starting");
            return;
        }

        let sink = Arc::clone(&self.sink);
        let cancel = self.cancel.clone();
        let tracker = self.tracker.clone();
        let stream_source = Arc::clone(&streams);
        self.tracker.spawn(async move {
            let result = run_positions(&sink, positions, stream_source, &cancel, &tracker).await;
            finish(&sink, StreamKind::Positions, result);
        });

        let sink = Arc::clone(&self.sink);
        let cancel = self.cancel.clone();
        let tracker = self.tracker.clone();
        self.tracker.spawn(async move {
            let result = run_trades(&sink, streams, &cancel, &tracker).await;
            finish(&sink, StreamKind::Trades, result);
        });

        tracing::info!(account_id = %self.sink.account_id, "Stream ingestor started");
    }

    /// Cancel both loops and wait until every task has exited.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!(account_id = %self.sink.account_id, "Stream ingestor stopped");
    }

    /// Returns true once shutdown has been requested.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

async fn run_positions(
    sink: &Sink,
    service: Arc<dyn PositionService>,
    streams: Arc<dyn AccountStreams>,
    cancel: &CancellationToken,
    tracker: &TaskTracker,
) -> Result<(), BrokerError> {
    let snapshot = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(()),
        result = fetch_account_snapshot(service.as_ref(), &sink.account_id) => result?,
    };
    sink.apply(AccountUpdate::Positions(snapshot));

    let subscription = streams.positions_stream(vec![sink.account_id.clone()]).await?;
    drain(
        sink,
        subscription,
        AccountUpdate::Positions,
        StreamKind::Positions,
        cancel,
        tracker,
    )
    .await
}

async fn run_trades(
    sink: &Sink,
    streams: Arc<dyn AccountStreams>,
    cancel: &CancellationToken,
    tracker: &TaskTracker,
) -> Result<(), BrokerError> {
    let subscription = streams.trades_stream(vec![sink.account_id.clone()]).await?;
    drain(sink, subscription, AccountUpdate::Trade, StreamKind::Trades, cancel, tracker).await
}

async fn drain<T: Send + 'static>(
    sink: &Sink,
    subscription: Subscription<T>,
    wrap: fn(T) -> AccountUpdate,
    stream: StreamKind,
    cancel: &CancellationToken,
    tracker: &TaskTracker,
) -> Result<(), BrokerError> {
    let (mut updates, listener, stop) = subscription.into_parts();
    let listener = tracker.spawn(listener);
    sink.health.set(stream, true);
    tracing::debug!(stream = stream.as_str(), "Subscribed");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(stream = stream.as_str(), "Cancelled");
                break;
            }
            update = updates.recv() => match update {
                Some(update) => sink.apply(wrap(update)),
                None => {
                    tracing::debug!(stream = stream.as_str(), "Update channel closed");
                    break;
                }
            },
        }
    }

    stop.cancel();
    drop(updates);

    match listener.await {
        Ok(result) => result,
        Err(e) => Err(BrokerError::Stream(format!("listener task failed: {e}"))),
    }
}

fn finish(sink: &Sink, stream: StreamKind, result: Result<(), BrokerError>) {
    sink.health.set(stream, false);
    match result {
        Ok(()) => tracing::info!(stream = stream.as_str(), "Stream loop stopped"),
        Err(e) => tracing::error!(stream = stream.as_str(), error = %e, "Stream loop failed"),
    }
}
