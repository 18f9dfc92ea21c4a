//! Order Executor - Binary Entry Point
//!
//! Runs the configured executor (limit or market) against the in-memory
//! paper venue until a shutdown signal arrives.
//!
//! # Configuration
//!
//! - `EXECUTOR_CONFIG`: path to the YAML config (default: `config.yaml`)
//! - `RUST_LOG`: overrides `observability.logging.level`

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;

use order_executor::config::{Config, ExecutorMode, load_config};
use order_executor::domain::InstrumentConfig;
use order_executor::observability::init_tracing;
use order_executor::ports::select_instruments;
use order_executor::{ExecutorError, MarketExecutor, OrderExecutor, PaperVenue, VenueClients};

/// Default config path.
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config_path =
        std::env::var("EXECUTOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(Some(&config_path))
        .with_context(|| format!("loading configuration from {config_path}"))?;

    init_tracing(&config.observability.logging).context("initialising tracing")?;

    tracing::info!(
        account_id = %config.account.id,
        config_path = %config_path,
        "Starting order executor"
    );

    let venue = Arc::new(PaperVenue::with_buffer(config.streams.buffer));
    config.paper.seed(&venue);

    let instruments = resolve_instruments(&config, &venue).await?;
    tracing::info!(instruments = instruments.len(), "Instruments configured");

    match config.executor.mode {
        ExecutorMode::Limit => run_limit(&config, &venue, instruments).await,
        ExecutorMode::Market => run_market(&config, &venue, instruments).await,
    }

    tracing::info!("Order executor stopped");
    Ok(())
}

/// Limit executor: consume the venue streams until shutdown.
async fn run_limit(config: &Config, venue: &Arc<PaperVenue>, instruments: Vec<InstrumentConfig>) {
    let executor = OrderExecutor::new(
        config.account.id.as_str(),
        instruments,
        VenueClients::from_venue(Arc::clone(venue)),
    );
    executor.start();

    tracing::info!(mode = "limit", "Order executor ready");
    shutdown_signal().await;

    if config.shutdown.liquidate_on_exit {
        log_liquidation(executor.liquidate_all().await);
    }

    let timeout = Duration::from_secs(config.shutdown.timeout_secs);
    if tokio::time::timeout(timeout, executor.shutdown()).await.is_err() {
        tracing::warn!(
            timeout_secs = timeout.as_secs(),
            "Stream ingestion did not stop in time"
        );
    }
}

/// Market executor: last prices start at the paper venue's market prices.
async fn run_market(config: &Config, venue: &Arc<PaperVenue>, instruments: Vec<InstrumentConfig>) {
    let executor = MarketExecutor::new(
        config.account.id.as_str(),
        instruments,
        venue.clone(),
        venue.clone(),
        config.paper.last_prices(),
        config.market.min_profit_pct,
    );

    tracing::info!(
        mode = "market",
        min_profit_pct = %config.market.min_profit_pct,
        "Order executor ready"
    );
    shutdown_signal().await;

    if config.shutdown.liquidate_on_exit {
        log_liquidation(executor.liquidate_all().await);
    }
}

fn log_liquidation(result: Result<usize, ExecutorError>) {
    match result {
        Ok(orders) => tracing::info!(orders, "Positions liquidated"),
        Err(e) => tracing::error!(error = %e, code = %e.code(), "Liquidation failed"),
    }
}

/// Explicit instruments plus any catalog selection, first occurrence wins.
async fn resolve_instruments(
    config: &Config,
    venue: &PaperVenue,
) -> anyhow::Result<Vec<InstrumentConfig>> {
    let mut instruments = config.instruments.to_instrument_configs();

    if let Some(selection) = &config.instruments.selection {
        let selected = select_instruments(
            venue,
            &selection.exchange,
            selection.limit,
            selection.quantity,
        )
        .await
        .context("selecting instruments from catalog")?;

        for instrument in selected {
            if !instruments.iter().any(|i| i.id == instrument.id) {
                instruments.push(instrument);
            }
        }
    }

    Ok(instruments)
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        for dir in cwd.ancestors().skip(1) {
            let env_path = dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
