//! Executors and the machinery that keeps their state current.
//!
//! - [`OrderExecutor`]: limit orders driven by the lifecycle state machine
//! - [`MarketExecutor`]: market orders with an entry-price profit gate
//! - [`StreamIngestor`]: background positions/trades ingestion
//! - [`fetch_account_snapshot`]: one-shot position bootstrap

pub mod bootstrap;
pub mod ingestor;
pub mod limit;
pub mod liquidation;
pub mod market;

use std::fmt;
use std::sync::Arc;

use crate::ports::{AccountStreams, OrderService, PositionService};

pub use bootstrap::fetch_account_snapshot;
pub use ingestor::{AccountUpdate, StreamHealth, StreamIngestor};
pub use limit::OrderExecutor;
pub use liquidation::liquidate_positions;
pub use market::{LastPrices, MarketExecutor};

/// Venue services an executor talks to.
#[derive(Clone)]
pub struct VenueClients {
    /// Order placement.
    pub orders: Arc<dyn OrderService>,
    /// Position queries.
    pub positions: Arc<dyn PositionService>,
    /// Push streams.
    pub streams: Arc<dyn AccountStreams>,
}

impl VenueClients {
    /// Bundle venue services.
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderService>,
        positions: Arc<dyn PositionService>,
        streams: Arc<dyn AccountStreams>,
    ) -> Self {
        Self {
            orders,
            positions,
            streams,
        }
    }

    /// Use one venue for every service.
    #[must_use]
    pub fn from_venue<V>(venue: Arc<V>) -> Self
    where
        V: OrderService + PositionService + AccountStreams + 'static,
    {
        Self {
            orders: venue.clone(),
            positions: venue.clone(),
            streams: venue,
        }
    }
}

impl fmt::Debug for VenueClients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VenueClients").finish_non_exhaustive()
    }
}
