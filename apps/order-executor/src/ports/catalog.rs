//! Instrument catalog port and instrument selection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{InstrumentConfig, Quotation};

use super::BrokerError;

/// Tradable share as listed by the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareInfo {
    /// Instrument uid.
    pub uid: String,
    /// Exchange code.
    pub exchange: String,
    /// Units per lot.
    pub lot: i64,
    /// Settlement currency.
    pub currency: String,
    /// Smallest legal price step.
    pub min_price_increment: Quotation,
}

/// Venue instrument reference data.
#[async_trait]
pub trait InstrumentCatalog: Send + Sync {
    /// List tradable shares.
    async fn shares(&self) -> Result<Vec<ShareInfo>, BrokerError>;
}

/// Pick the first `limit` shares listed on `exchange`, each traded in
/// `quantity` lots.
pub async fn select_instruments(
    catalog: &dyn InstrumentCatalog,
    exchange: &str,
    limit: usize,
    quantity: i64,
) -> Result<Vec<InstrumentConfig>, BrokerError> {
    let shares = catalog.shares().await?;

    let selected: Vec<InstrumentConfig> = shares
        .into_iter()
        .filter(|share| share.exchange == exchange)
        .take(limit)
        .map(|share| {
            InstrumentConfig::new(
                share.uid,
                quantity,
                share.lot,
                share.currency,
                share.min_price_increment,
            )
        })
        .collect();

    tracing::info!(exchange, selected = selected.len(), "Selected instruments from catalog");
    Ok(selected)
}
