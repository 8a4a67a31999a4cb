//! barsim runner: everything around a single engine run.
//!
//! This crate builds on `barsim-core` to provide:
//! - TOML run configuration
//! - CSV bar loading with a deterministic synthetic fallback
//! - Single-run execution from a config file
//! - Parallel batch runs and fast/slow parameter sweeps
//! - Cross-run summary and ranking
//! - JSON and CSV export

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod summary;
pub mod sweep;

pub use batch::{BatchJob, BatchResults, BatchRunner, JobOutcome};
pub use config::{BacktestConfig, ConfigFileError};
pub use data_loader::{
    generate_synthetic, load_csv, read_csv, write_csv, DataSource, LoadError, LoadedBars,
    SyntheticSpec,
};
pub use export::{export_json, export_positions_csv, import_json, save_artifacts, ArtifactPaths};
pub use runner::{prepare, run_backtest_from_data, run_single, PreparedRun, RunOutput, RunnerError};
pub use summary::{RankedRun, RunSummary};
pub use sweep::{run_sweep, ParamGrid};
