//! Configuration file for the command-line runner.
//!
//! A TOML file with optional `[backtest]`, `[hedge]` and `[sweep]` tables.
//! Missing tables and keys fall back to their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backtest::{BacktestConfig, StopLossGrid};
use crate::error::SimError;
use crate::hedging::HedgeConfig;

/// Errors that can occur while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] SimError),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backtest: BacktestConfig,
    pub hedge: HedgeConfig,
    pub sweep: StopLossGrid,
}

impl AppConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        self.backtest.validate()?;
        self.hedge.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionType;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_tables() {
        let config = AppConfig::from_toml_str(
            r#"
            [backtest]
            initial_capital = 50000
            kind = "put"
            transaction_cost = 0.002

            [hedge]
            steps = 52
            seed = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.backtest.initial_capital, dec!(50000));
        assert_eq!(config.backtest.kind, OptionType::Put);
        assert_eq!(config.backtest.transaction_cost.rate, 0.002);
        assert_eq!(config.backtest.strike, 150.0);
        assert_eq!(config.hedge.steps, 52);
        assert_eq!(config.hedge.seed, 7);
        assert_eq!(config.hedge.strike, 155.0);
    }

    #[test]
    fn test_sweep_grid() {
        let config = AppConfig::from_toml_str(
            r#"
            [sweep]
            thresholds = [0.9, 0.95]
            "#,
        )
        .unwrap();
        assert_eq!(config.sweep.thresholds, vec![0.9, 0.95]);
        assert_eq!(config.sweep.sizing_distances, StopLossGrid::default().sizing_distances);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = AppConfig::from_toml_str("[hedge]\nsteps = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = AppConfig::from_toml_str("[backtest]\nkind = \"straddle\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_shipped_default_file() {
        let text = include_str!("../config/default.toml");
        let config = AppConfig::from_toml_str(text).unwrap();
        assert_eq!(config.backtest, BacktestConfig::default());
        assert_eq!(config.hedge, HedgeConfig::default());
    }
}
