//! Backtesting engine: ledger, bar loop and result aggregation.
//!
//! Data flows one way through a run:
//!
//! 1. Bars feed the strategy's streaming indicators
//! 2. The strategy emits a desired-exposure signal
//! 3. The ledger turns the signal into order fills and position transitions
//! 4. At end of run the final ledger is aggregated into a `BacktestResult`

pub mod aggregate;
pub mod event_loop;
pub mod ledger;
pub mod result;

pub use aggregate::{truncate_for_report, win_rate, TradeStats, MAX_REPORTED_ITEMS};
pub use event_loop::{
    run_backtest, run_backtest_with_cancel, select_bars, validate_bars, Backtest, DataError,
    RunError,
};
pub use ledger::{Ledger, LedgerError, StepOutcome};
pub use result::{BacktestResult, Period};
