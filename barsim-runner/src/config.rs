//! File-based backtest configuration.
//!
//! ```toml
//! [strategy]
//! id = "sma-eurusd"
//! type = "sma_crossover"
//! instrument_id = "EUR/USD.SIM"
//! trade_size = "100000"
//!
//! [strategy.params]
//! fast_period = 10
//! slow_period = 20
//!
//! [backtest]
//! starting_balance = "100000"
//! start_date = "2020-01-01"
//! end_date = "2020-12-31"
//! bars_csv = "data/eurusd.csv"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use barsim_core::config::{validate_starting_balance, ConfigError, StrategyConfig};
use barsim_core::signal::StrategyKind;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_INSTRUMENT: &str = "EUR/USD.SIM";
pub const DEFAULT_SYNTHETIC_BARS: usize = 500;

/// Errors reading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),

    #[error("start_date and end_date must be given together")]
    PartialDateRange,
}

/// Top-level config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub strategy: StrategySection,
    #[serde(default)]
    pub backtest: BacktestSection,
}

/// `[strategy]` table. The strategy is selected by its type name, with
/// integer parameters in `[strategy.params]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySection {
    pub id: String,
    #[serde(rename = "type", default = "default_strategy_type")]
    pub strategy_type: String,
    #[serde(default = "default_instrument")]
    pub instrument_id: String,
    #[serde(default = "default_trade_size")]
    pub trade_size: Decimal,
    #[serde(default)]
    pub params: BTreeMap<String, usize>,
}

/// `[backtest]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    #[serde(default = "default_starting_balance")]
    pub starting_balance: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// CSV bar file. Relative paths resolve against the config file's
    /// directory when loaded with [`BacktestConfig::from_file`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bars_csv: Option<PathBuf>,
    /// Number of synthetic bars when no CSV is given.
    #[serde(default = "default_synthetic_bars")]
    pub synthetic_bars: usize,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
            start_date: None,
            end_date: None,
            bars_csv: None,
            synthetic_bars: DEFAULT_SYNTHETIC_BARS,
        }
    }
}

fn default_strategy_type() -> String {
    "sma_crossover".into()
}

fn default_instrument() -> String {
    DEFAULT_INSTRUMENT.into()
}

fn default_trade_size() -> Decimal {
    Decimal::from(100_000)
}

fn default_starting_balance() -> Decimal {
    Decimal::from(100_000)
}

fn default_synthetic_bars() -> usize {
    DEFAULT_SYNTHETIC_BARS
}

impl BacktestConfig {
    /// Parse and validate a TOML string.
    pub fn from_toml(text: &str) -> Result<Self, ConfigFileError> {
        let config: BacktestConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        if let (Some(csv), Some(dir)) = (&config.backtest.bars_csv, path.parent()) {
            if csv.is_relative() {
                config.backtest.bars_csv = Some(dir.join(csv));
            }
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigFileError> {
        self.strategy_config()?;
        validate_starting_balance(self.backtest.starting_balance)?;
        Ok(())
    }

    pub fn starting_balance(&self) -> Decimal {
        self.backtest.starting_balance
    }

    /// Resolve into the engine's validated strategy config.
    pub fn strategy_config(&self) -> Result<StrategyConfig, ConfigFileError> {
        let kind = StrategyKind::from_type_name(&self.strategy.strategy_type, &self.strategy.params)?;
        let mut config = StrategyConfig::new(
            self.strategy.id.clone(),
            self.strategy.instrument_id.clone(),
            kind,
            self.strategy.trade_size,
        );
        config = match (self.backtest.start_date, self.backtest.end_date) {
            (Some(start), Some(end)) => config.with_date_range(start, end),
            (None, None) => config,
            _ => return Err(ConfigFileError::PartialDateRange),
        };
        config.validate()?;
        Ok(config)
    }
}
