//! Account, executor, market, stream and shutdown settings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account the executor trades on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Venue account id.
    pub id: String,
}

/// Which executor the binary drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorMode {
    /// Tick-aligned limit orders with stream-fed lifecycle tracking.
    #[default]
    Limit,
    /// Market orders gated by `market.min_profit_pct`.
    Market,
}

/// Executor selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Executor variant.
    #[serde(default)]
    pub mode: ExecutorMode,
}

/// Market executor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Minimum profit, in percent of entry price, before selling.
    #[serde(default = "default_min_profit_pct")]
    pub min_profit_pct: Decimal,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            min_profit_pct: default_min_profit_pct(),
        }
    }
}

/// Stream subscription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamsConfig {
    /// Buffered updates per subscription.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            buffer: default_buffer(),
        }
    }
}

/// Shutdown settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// Seconds to wait for stream loops to drain.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Flatten managed positions before exiting.
    #[serde(default)]
    pub liquidate_on_exit: bool,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            liquidate_on_exit: false,
        }
    }
}

fn default_min_profit_pct() -> Decimal {
    Decimal::new(5, 1)
}

const fn default_buffer() -> usize {
    64
}

const fn default_timeout_secs() -> u64 {
    10
}
