//! Close out every security position the executor manages.

use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::{InstrumentConfig, OrderRequest};
use crate::error::ExecutorError;
use crate::ports::{OrderService, PositionService};

use super::bootstrap::fetch_account_snapshot;

/// Submit market orders that flatten each managed security balance.
///
/// Balances are read from the venue, not the cached snapshot. Shorts are
/// bought back, longs sold, sized in whole lots. Instruments the executor
/// does not manage and balances under one lot are skipped. The first
/// failed order aborts the batch; orders already placed stay placed.
///
/// Returns the number of orders submitted.
pub async fn liquidate_positions(
    account_id: &str,
    instruments: &HashMap<String, InstrumentConfig>,
    positions: &dyn PositionService,
    orders: &dyn OrderService,
) -> Result<usize, ExecutorError> {
    let snapshot = fetch_account_snapshot(positions, account_id).await?;
    let mut submitted = 0;

    for security in &snapshot.securities {
        let Some(instrument) = instruments.get(&security.instrument_id) else {
            tracing::info!(
                instrument_id = %security.instrument_id,
                balance = security.balance,
                "Not managed, leaving position open"
            );
            continue;
        };

        let lots = instrument.lots_in(security.balance);
        if lots == 0 {
            tracing::debug!(
                instrument_id = %instrument.id,
                balance = security.balance,
                "Balance under one lot, skipping"
            );
            continue;
        }

        let request = OrderRequest::market(
            account_id,
            instrument.id.as_str(),
            lots.abs(),
            Uuid::new_v4().to_string(),
        );
        let result = if lots < 0 {
            orders.submit_buy(request).await
        } else {
            orders.submit_sell(request).await
        };

        match result {
            Ok(response) => {
                submitted += 1;
                tracing::info!(
                    instrument_id = %instrument.id,
                    order_id = %response.order_id,
                    lots,
                    "Liquidation order submitted"
                );
            }
            Err(e) => {
                tracing::error!(
                    instrument_id = %instrument.id,
                    lots,
                    error = %e,
                    "Liquidation order failed, aborting"
                );
                return Err(e.into());
            }
        }
    }

    Ok(submitted)
}
