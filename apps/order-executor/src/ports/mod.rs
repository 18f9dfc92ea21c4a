//! Ports: interfaces to the venue.
//!
//! The executors depend only on these traits. `infrastructure::paper`
//! provides an in-memory implementation of all of them.

pub mod catalog;
pub mod error;
pub mod order_service;
pub mod position_service;
pub mod streams;

pub use catalog::{InstrumentCatalog, ShareInfo, select_instruments};
pub use error::BrokerError;
pub use order_service::OrderService;
pub use position_service::{MoneyValue, PositionService, PositionsResponse};
pub use streams::{AccountStreams, Subscription};

#[cfg(test)]
pub use order_service::MockOrderService;
#[cfg(test)]
pub use position_service::MockPositionService;
