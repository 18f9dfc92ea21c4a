//! One-shot fetch of the authoritative account snapshot.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::{AccountSnapshot, CashBalance};
use crate::ports::{BrokerError, PositionService, PositionsResponse};

/// Fetch positions and fold them into an [`AccountSnapshot`].
pub async fn fetch_account_snapshot(
    service: &dyn PositionService,
    account_id: &str,
) -> Result<AccountSnapshot, BrokerError> {
    let response = service.get_positions(account_id).await?;
    let snapshot = snapshot_from_response(account_id, response);

    tracing::debug!(
        account_id,
        currencies = snapshot.money.len(),
        securities = snapshot.securities.len(),
        "Fetched account snapshot"
    );
    Ok(snapshot)
}

/// Merge available and blocked cash by currency.
///
/// Currencies keep first-seen order; one present only in `blocked` gets zero
/// available.
fn snapshot_from_response(account_id: &str, response: PositionsResponse) -> AccountSnapshot {
    let mut money: Vec<CashBalance> = Vec::with_capacity(response.money.len());

    for available in response.money {
        match money.iter_mut().find(|c| c.currency == available.currency) {
            Some(existing) => existing.available = available.value,
            None => money.push(CashBalance {
                currency: available.currency,
                available: available.value,
                blocked: Decimal::ZERO,
            }),
        }
    }

    for blocked in response.blocked {
        match money.iter_mut().find(|c| c.currency == blocked.currency) {
            Some(existing) => existing.blocked = blocked.value,
            None => money.push(CashBalance {
                currency: blocked.currency,
                available: Decimal::ZERO,
                blocked: blocked.value,
            }),
        }
    }

    AccountSnapshot {
        account_id: account_id.to_string(),
        money,
        securities: response.securities,
        futures: response.futures,
        options: response.options,
        taken_at: Utc::now(),
    }
}
