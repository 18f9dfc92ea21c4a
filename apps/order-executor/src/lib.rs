// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Order Executor - Rust Core Library
//!
//! Lot-based order executor for a single brokerage account.
//!
//! # Architecture
//!
//! - **Domain**: prices ([`domain::Quotation`]), instrument parameters,
//!   order payloads, the per-instrument lifecycle and account snapshots
//! - **Ports**: venue interfaces (`OrderService`, `PositionService`,
//!   `AccountStreams`, `InstrumentCatalog`)
//! - **Store**: lock-guarded in-memory state shared between the executor
//!   and the stream ingestor
//! - **Executor**: limit executor, market executor, stream ingestion,
//!   bootstrap and liquidation
//! - **Infrastructure**: in-memory paper venue
//!
//! # Data flow
//!
//! ```text
//!  PositionService ──bootstrap──┐
//!  positions stream ────────────┼──> PositionStore ──funds check──┐
//!  trades stream ───────────────┼──> InstrumentStateStore <───────┼── OrderExecutor <── strategy
//!                               │                                 │
//!                          StreamIngestor                    OrderService
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod infrastructure;
pub mod observability;
pub mod ports;
pub mod store;

pub use domain::{InstrumentConfig, InstrumentState, Lifecycle, Quotation, quantize};
pub use error::{ErrorCode, ExecutorError};
pub use executor::{MarketExecutor, OrderExecutor, StreamHealth, VenueClients};
pub use infrastructure::PaperVenue;
pub use ports::BrokerError;
