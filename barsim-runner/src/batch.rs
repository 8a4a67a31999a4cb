//! Parallel batch execution of isolated backtests.
//!
//! Every job builds its own engine context; the only thing shared across
//! worker threads is the read-only bar slice and the cancel flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use barsim_core::config::StrategyConfig;
use barsim_core::domain::{Bar, StrategyId};
use barsim_core::engine::{run_backtest_with_cancel, BacktestResult, RunError};
use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// One run to execute.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub config: StrategyConfig,
    pub starting_balance: Decimal,
}

impl BatchJob {
    pub fn new(config: StrategyConfig, starting_balance: Decimal) -> Self {
        Self {
            config,
            starting_balance,
        }
    }
}

/// Outcome of one job, successful or not.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub strategy_id: StrategyId,
    pub outcome: Result<BacktestResult, RunError>,
}

/// Outcomes in job order.
#[derive(Debug, Clone, Default)]
pub struct BatchResults {
    outcomes: Vec<JobOutcome>,
}

impl BatchResults {
    pub fn outcomes(&self) -> &[JobOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Successful results, in job order.
    pub fn results(&self) -> Vec<&BacktestResult> {
        self.outcomes
            .iter()
            .filter_map(|o| o.outcome.as_ref().ok())
            .collect()
    }

    pub fn failures(&self) -> Vec<(&StrategyId, &RunError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.outcome.as_ref().err().map(|e| (&o.strategy_id, e)))
            .collect()
    }

    pub fn into_results(self) -> Vec<BacktestResult> {
        self.outcomes
            .into_iter()
            .filter_map(|o| o.outcome.ok())
            .collect()
    }
}

/// Batch executor.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    parallel: bool,
    cancel: Arc<AtomicBool>,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRunner {
    pub fn new() -> Self {
        Self {
            parallel: true,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Share an externally owned cancel flag (e.g. set from a signal handler).
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Ask every in-flight run to stop at its next bar boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Run every job against the same bars. One failed job never affects
    /// another.
    pub fn run(&self, jobs: &[BatchJob], bars: &[Bar]) -> BatchResults {
        info!(jobs = jobs.len(), parallel = self.parallel, "batch started");
        let run_one = |job: &BatchJob| self.run_job(job, bars);

        let outcomes: Vec<JobOutcome> = if self.parallel {
            jobs.par_iter().map(run_one).collect()
        } else {
            jobs.iter().map(run_one).collect()
        };

        let failed = outcomes.iter().filter(|o| o.outcome.is_err()).count();
        info!(completed = outcomes.len() - failed, failed, "batch finished");
        BatchResults { outcomes }
    }

    fn run_job(&self, job: &BatchJob, bars: &[Bar]) -> JobOutcome {
        let outcome = run_backtest_with_cancel(
            &job.config,
            bars,
            job.starting_balance,
            Some(self.cancel.as_ref()),
        );
        if let Err(err) = &outcome {
            warn!(strategy = %job.config.strategy_id, error = %err, "run failed");
        }
        JobOutcome {
            strategy_id: job.config.strategy_id.clone(),
            outcome,
        }
    }
}
