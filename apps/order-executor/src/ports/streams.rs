//! Push-update subscription port.
//!
//! A subscription is three parts: a receiver the caller drains, a listener
//! future that delivers venue messages into that receiver, and a stop token.
//! The caller drives the listener; cancelling the token makes it return.

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::{AccountSnapshot, TradeEvent};

use super::BrokerError;

/// Live subscription yielding updates of type `T`.
pub struct Subscription<T> {
    updates: mpsc::Receiver<T>,
    listener: BoxFuture<'static, Result<(), BrokerError>>,
    stop: CancellationToken,
}

impl<T> Subscription<T> {
    /// Assemble a subscription from its parts.
    #[must_use]
    pub fn new(
        updates: mpsc::Receiver<T>,
        listener: BoxFuture<'static, Result<(), BrokerError>>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            updates,
            listener,
            stop,
        }
    }

    /// Split into receiver, listener and stop token.
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        mpsc::Receiver<T>,
        BoxFuture<'static, Result<(), BrokerError>>,
        CancellationToken,
    ) {
        (self.updates, self.listener, self.stop)
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("stopped", &self.stop.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Venue account streams.
#[async_trait]
pub trait AccountStreams: Send + Sync {
    /// Subscribe to position snapshots for the given accounts.
    async fn positions_stream(
        &self,
        account_ids: Vec<String>,
    ) -> Result<Subscription<AccountSnapshot>, BrokerError>;

    /// Subscribe to trade executions for the given accounts.
    async fn trades_stream(
        &self,
        account_ids: Vec<String>,
    ) -> Result<Subscription<TradeEvent>, BrokerError>;
}
