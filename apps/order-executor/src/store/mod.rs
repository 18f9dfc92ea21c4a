//! In-memory stores shared between the executors and the stream ingestor.

pub mod instrument_state;
pub mod position;

pub use instrument_state::InstrumentStateStore;
pub use position::PositionStore;
