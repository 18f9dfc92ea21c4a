//! Domain types: prices, instruments, orders, lifecycle and account state.

pub mod account;
pub mod instrument;
pub mod lifecycle;
pub mod order;
pub mod quotation;

pub use account::{AccountSnapshot, CashBalance, InstrumentBalance};
pub use instrument::InstrumentConfig;
pub use lifecycle::{InstrumentState, Lifecycle};
pub use order::{
    CancelAck, ExecutionStatus, OrderDirection, OrderRequest, OrderResponse, OrderType,
    ReplaceOrderRequest, TradeEvent,
};
pub use quotation::{NANO_PER_UNIT, Quotation, quantize};
