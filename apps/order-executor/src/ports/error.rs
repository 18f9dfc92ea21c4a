//! Errors raised by venue collaborators.

use thiserror::Error;

/// Venue/transport failure.
///
/// Executors surface these unmodified and never retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// Transport failed before the venue answered.
    #[error("Connection error: {0}")]
    Connection(String),

    /// API returned an error.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code from the venue.
        code: String,
        /// Error message from the venue.
        message: String,
    },

    /// Order was rejected.
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Stream subscription ended abnormally.
    #[error("Stream error: {0}")]
    Stream(String),
}
