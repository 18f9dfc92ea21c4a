//! Executor error types.
//!
//! | Code | Raised when |
//! |------|-------------|
//! | `UNKNOWN_INSTRUMENT` | Operation names an instrument the executor does not manage |
//! | `INVALID_STATE` | Cancel/replace without a resting order |
//! | `BROKER_ERROR` | Venue call failed; the venue error is carried verbatim |
//!
//! Insufficient funds is not an error: `buy_limit` returns `Ok(())` without
//! placing anything.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::BrokerError;

/// Stable error codes for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Instrument not managed by the executor.
    UnknownInstrument,
    /// Operation not allowed in the current lifecycle.
    InvalidState,
    /// Venue call failed.
    BrokerError,
}

impl ErrorCode {
    /// Get the error reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::UnknownInstrument => "UNKNOWN_INSTRUMENT",
            Self::InvalidState => "INVALID_STATE",
            Self::BrokerError => "BROKER_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

/// Errors returned by executor operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// Instrument is not configured.
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    /// Instrument is not in a state that allows the operation.
    #[error("invalid instrument state for {operation} on {instrument_id}: {state}")]
    InvalidState {
        /// Instrument identifier.
        instrument_id: String,
        /// Operation attempted.
        operation: &'static str,
        /// Observed state, `"missing"` if never seen.
        state: String,
    },

    /// Venue call failed.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl ExecutorError {
    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownInstrument(_) => ErrorCode::UnknownInstrument,
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::Broker(_) => ErrorCode::BrokerError,
        }
    }
}
