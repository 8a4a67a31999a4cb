//! Single-backtest runner: config file in, result out.

use std::path::Path;

use barsim_core::config::StrategyConfig;
use barsim_core::domain::Bar;
use barsim_core::engine::{run_backtest, BacktestResult, RunError};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::config::{BacktestConfig, ConfigFileError};
use crate::data_loader::{generate_synthetic, load_csv, DataSource, LoadError, LoadedBars, SyntheticSpec};

/// Errors from running a backtest through the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigFileError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("backtest failed: {0}")]
    Run(#[from] RunError),
}

/// Validated inputs for one run.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub strategy: StrategyConfig,
    pub starting_balance: Decimal,
    pub data: LoadedBars,
}

/// A finished run plus where its bars came from.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub result: BacktestResult,
    pub source: DataSource,
    pub dataset_hash: String,
}

/// Load bars for a config. `csv_override` wins over the config's
/// `bars_csv`; with neither, synthetic bars are generated for the
/// configured instrument.
pub fn load_bars_for(
    config: &BacktestConfig,
    csv_override: Option<&Path>,
) -> Result<LoadedBars, LoadError> {
    let csv = csv_override.or(config.backtest.bars_csv.as_deref());
    match csv {
        Some(path) => load_csv(path),
        None => {
            info!(
                instrument = %config.strategy.instrument_id,
                bars = config.backtest.synthetic_bars,
                "no bar file configured, using synthetic data"
            );
            Ok(generate_synthetic(&SyntheticSpec::minutes(
                config.strategy.instrument_id.clone(),
                config.backtest.synthetic_bars,
            )))
        }
    }
}

/// Validate the config and load its bars.
pub fn prepare(
    config: &BacktestConfig,
    csv_override: Option<&Path>,
) -> Result<PreparedRun, RunnerError> {
    let strategy = config.strategy_config()?;
    let data = load_bars_for(config, csv_override)?;
    Ok(PreparedRun {
        strategy,
        starting_balance: config.starting_balance(),
        data,
    })
}

/// Run a backtest from a config against already-loaded bars.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    bars: &[Bar],
) -> Result<BacktestResult, RunnerError> {
    let strategy = config.strategy_config()?;
    Ok(run_backtest(&strategy, bars, config.starting_balance())?)
}

/// Load, run and return one backtest.
pub fn run_single(
    config: &BacktestConfig,
    csv_override: Option<&Path>,
) -> Result<RunOutput, RunnerError> {
    let prepared = prepare(config, csv_override)?;
    let result = run_backtest(
        &prepared.strategy,
        &prepared.data.bars,
        prepared.starting_balance,
    )?;
    Ok(RunOutput {
        result,
        source: prepared.data.source,
        dataset_hash: prepared.data.dataset_hash,
    })
}
