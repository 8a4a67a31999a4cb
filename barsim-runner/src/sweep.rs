//! Parameter sweep over SMA crossover periods.

use barsim_core::config::StrategyConfig;
use barsim_core::domain::{Bar, StrategyId};
use barsim_core::signal::StrategyKind;
use rust_decimal::Decimal;

use crate::batch::{BatchJob, BatchResults, BatchRunner};

/// Fast/slow period grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGrid {
    pub fast_periods: Vec<usize>,
    pub slow_periods: Vec<usize>,
}

impl ParamGrid {
    pub fn new(fast_periods: Vec<usize>, slow_periods: Vec<usize>) -> Self {
        Self {
            fast_periods,
            slow_periods,
        }
    }

    /// Fast 5, 10, 15, 20 against slow 20, 30, 50.
    pub fn sma_crossover_default() -> Self {
        Self::new(vec![5, 10, 15, 20], vec![20, 30, 50])
    }

    /// Valid (fast, slow) pairs in grid order.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for &fast in &self.fast_periods {
            for &slow in &self.slow_periods {
                // Skip invalid combinations (fast >= slow)
                if fast == 0 || fast >= slow {
                    continue;
                }
                pairs.push((fast, slow));
            }
        }
        pairs
    }

    /// Number of valid configurations.
    pub fn size(&self) -> usize {
        self.pairs().len()
    }

    /// One config per valid pair. Strategy ids get a `-f{fast}-s{slow}` suffix.
    pub fn generate_configs(&self, base: &StrategyConfig) -> Vec<StrategyConfig> {
        self.pairs()
            .into_iter()
            .map(|(fast, slow)| {
                let mut config = base.clone();
                config.strategy_id = StrategyId::new(format!("{}-f{fast}-s{slow}", base.strategy_id));
                config.strategy = StrategyKind::SmaCrossover {
                    fast_period: fast,
                    slow_period: slow,
                };
                config
            })
            .collect()
    }
}

/// Run every grid configuration against `bars`.
pub fn run_sweep(
    runner: &BatchRunner,
    grid: &ParamGrid,
    base: &StrategyConfig,
    bars: &[Bar],
    starting_balance: Decimal,
) -> BatchResults {
    let jobs: Vec<BatchJob> = grid
        .generate_configs(base)
        .into_iter()
        .map(|config| BatchJob::new(config, starting_balance))
        .collect();
    runner.run(&jobs, bars)
}
