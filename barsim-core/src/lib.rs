//! barsim core: event-driven single-instrument backtesting engine.
//!
//! This crate contains the whole deterministic core:
//! - Domain types (bars, orders, positions, account)
//! - Streaming SMA indicator
//! - Signal generation (SMA crossover) behind a closed strategy enum
//! - Order and position ledger with a market-at-close fill model
//! - Bar-by-bar event loop and result aggregation
//!
//! No I/O happens here. Loading, batching and export live in `barsim-runner`.

pub mod config;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod indicators;
pub mod signal;

pub use config::{ConfigError, DateRange, StrategyConfig};
pub use engine::{run_backtest, run_backtest_with_cancel, BacktestResult, RunError};
