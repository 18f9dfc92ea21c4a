//! Configuration for the order executor binary.
//!
//! YAML with `${VAR}` / `${VAR:-default}` environment interpolation,
//! validated after parsing.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_executor::config::load_config;
//!
//! let config = load_config(Some("config.yaml"))?;
//! println!("account: {}", config.account.id);
//! ```

mod instruments;
mod observability;
mod paper;
mod runtime;

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use instruments::{InstrumentEntry, InstrumentsConfig, SelectionConfig};
pub use observability::{LogFormat, LoggingConfig, ObservabilityConfig};
pub use paper::{PaperConfig, PaperShare};
pub use runtime::{
    AccountConfig, ExecutorConfig, ExecutorMode, MarketConfig, ShutdownConfig, StreamsConfig,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Trading account.
    pub account: AccountConfig,
    /// Managed instruments.
    #[serde(default)]
    pub instruments: InstrumentsConfig,
    /// Executor selection.
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Market executor settings.
    #[serde(default)]
    pub market: MarketConfig,
    /// Stream settings.
    #[serde(default)]
    pub streams: StreamsConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Shutdown settings.
    #[serde(default)]
    pub shutdown: ShutdownConfig,
    /// Paper venue seed.
    #[serde(default)]
    pub paper: PaperConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// `path` defaults to "config.yaml".
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. An unset or empty
/// variable without a default becomes an empty string.
#[allow(clippy::expect_used)] // Regex is a constant pattern
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let default_value = caps.get(2).map_or("", |m| m.as_str());
        match std::env::var(&caps[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.account.id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "account.id must not be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in &config.instruments.list {
        if entry.id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "instruments.list[].id must not be empty".to_string(),
            ));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "instrument '{}' is listed more than once",
                entry.id
            )));
        }
        if entry.quantity <= 0 || entry.lot <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "instrument '{}': quantity and lot must be positive",
                entry.id
            )));
        }
        if entry.min_price_increment <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "instrument '{}': min_price_increment must be positive",
                entry.id
            )));
        }
        if entry.currency.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "instrument '{}': currency must not be empty",
                entry.id
            )));
        }
    }

    if let Some(selection) = &config.instruments.selection {
        if selection.limit == 0 || selection.quantity <= 0 {
            return Err(ConfigError::ValidationError(
                "instruments.selection limit and quantity must be positive".to_string(),
            ));
        }
    }

    if config.market.min_profit_pct < Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "market.min_profit_pct must not be negative".to_string(),
        ));
    }

    if config.streams.buffer == 0 {
        return Err(ConfigError::ValidationError(
            "streams.buffer must be positive".to_string(),
        ));
    }

    if config.shutdown.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "shutdown.timeout_secs must be positive".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_load_minimal_config() {
        let yaml = r"
account:
  id: acc-1
";

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load minimal config: {e}"),
        };
        assert_eq!(config.account.id, "acc-1");
        assert!(config.instruments.list.is_empty());
        assert_eq!(config.executor.mode, ExecutorMode::Limit);
        assert_eq!(config.market.min_profit_pct, dec!(0.5));
        assert_eq!(config.streams.buffer, 64);
        assert_eq!(config.shutdown.timeout_secs, 10);
        assert_eq!(config.observability.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
account:
  id: acc-1
instruments:
  list:
    - id: sber-uid
      quantity: 10
      lot: 10
      currency: rub
      min_price_increment: "0.01"
  selection:
    exchange: MOEX
    limit: 5
executor:
  mode: market
market:
  min_profit_pct: "1.5"
observability:
  logging:
    level: debug
    format: pretty
shutdown:
  timeout_secs: 3
  liquidate_on_exit: true
paper:
  cash:
    rub: "100000"
  securities:
    sber-uid: 20
  market_prices:
    sber-uid: "250.5"
"#;

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load full config: {e}"),
        };

        let instruments = config.instruments.to_instrument_configs();
        assert_eq!(instruments.len(), 1);
        assert_eq!(instruments[0].id, "sber-uid");
        assert_eq!(instruments[0].lot, 10);
        assert_eq!(
            instruments[0].min_price_increment,
            crate::domain::Quotation::new(0, 10_000_000)
        );

        let selection = config.instruments.selection.unwrap();
        assert_eq!(selection.limit, 5);
        assert_eq!(selection.quantity, 1);

        assert_eq!(config.executor.mode, ExecutorMode::Market);
        assert_eq!(config.market.min_profit_pct, dec!(1.5));
        assert_eq!(config.observability.logging.format, LogFormat::Pretty);
        assert!(config.shutdown.liquidate_on_exit);
        assert_eq!(config.paper.cash.get("rub"), Some(&dec!(100000)));
        assert_eq!(config.paper.securities.get("sber-uid"), Some(&20));
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "id: ${ORDER_EXECUTOR_TEST_NONEXISTENT_VAR:-acc-default}";
        assert_eq!(interpolate_env_vars(input), "id: acc-default");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax
    fn test_env_var_with_default_uses_existing() {
        let input = "path: ${PATH:-default}";
        let result = interpolate_env_vars(input);

        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "id: ${ORDER_EXECUTOR_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "id: ");
    }

    #[test]
    fn test_validation_empty_account() {
        let yaml = r#"
account:
  id: ""
"#;
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for empty account id");
        };
        assert!(err.to_string().contains("account.id"));
    }

    #[test]
    fn test_validation_duplicate_instrument() {
        let yaml = r#"
account:
  id: acc-1
instruments:
  list:
    - id: sber
      min_price_increment: "0.01"
    - id: sber
      min_price_increment: "0.01"
"#;
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for duplicate instrument");
        };
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_validation_zero_increment() {
        let yaml = r#"
account:
  id: acc-1
instruments:
  list:
    - id: sber
      min_price_increment: "0"
"#;
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for zero increment");
        };
        assert!(err.to_string().contains("min_price_increment"));
    }

    #[test]
    fn test_validation_non_positive_lot() {
        let yaml = r#"
account:
  id: acc-1
instruments:
  list:
    - id: sber
      lot: 0
      min_price_increment: "0.01"
"#;
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for zero lot");
        };
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn test_validation_negative_min_profit() {
        let yaml = r#"
account:
  id: acc-1
market:
  min_profit_pct: "-1"
"#;
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for negative min profit");
        };
        assert!(err.to_string().contains("min_profit_pct"));
    }

    #[test]
    fn test_validation_unknown_log_format() {
        let yaml = r"
account:
  id: acc-1
observability:
  logging:
    format: xml
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for unknown log format");
        };
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unknown_executor_mode_is_rejected() {
        let yaml = r"
account:
  id: acc-1
executor:
  mode: twap
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for unknown executor mode");
        };
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let Err(err) = load_config(Some("/nonexistent/order-executor.yaml")) else {
            panic!("expected read error");
        };
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
