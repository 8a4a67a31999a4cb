//! Cross-run summary: totals across results and a P&L ranking.

use std::fmt;

use barsim_core::domain::StrategyId;
use barsim_core::engine::{win_rate, BacktestResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRun {
    pub rank: usize,
    pub strategy_id: StrategyId,
    pub run_id: String,
    pub total_pnl: Decimal,
    pub total_trades: usize,
    pub win_rate: Decimal,
    pub max_drawdown: Decimal,
}

/// Totals over a set of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub runs: usize,
    pub total_pnl: Decimal,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Win rate over the pooled trades, percent.
    pub win_rate: Decimal,
    /// Best first. Ties keep strategy id order.
    pub ranking: Vec<RankedRun>,
}

impl RunSummary {
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a BacktestResult>,
    {
        let mut results: Vec<&BacktestResult> = results.into_iter().collect();
        results.sort_by(|a, b| {
            b.total_pnl
                .cmp(&a.total_pnl)
                .then_with(|| a.strategy_id.0.cmp(&b.strategy_id.0))
        });

        let total_trades: usize = results.iter().map(|r| r.total_trades).sum();
        let winning_trades: usize = results.iter().map(|r| r.winning_trades).sum();

        Self {
            runs: results.len(),
            total_pnl: results.iter().map(|r| r.total_pnl).sum(),
            total_trades,
            winning_trades,
            losing_trades: results.iter().map(|r| r.losing_trades).sum(),
            win_rate: win_rate(winning_trades, total_trades),
            ranking: results
                .iter()
                .enumerate()
                .map(|(i, r)| RankedRun {
                    rank: i + 1,
                    strategy_id: r.strategy_id.clone(),
                    run_id: r.run_id.clone(),
                    total_pnl: r.total_pnl,
                    total_trades: r.total_trades,
                    win_rate: r.win_rate,
                    max_drawdown: r.max_drawdown,
                })
                .collect(),
        }
    }

    pub fn best(&self) -> Option<&RankedRun> {
        self.ranking.first()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>4}  {:<32} {:>16} {:>7} {:>8} {:>14}",
            "rank", "strategy", "pnl", "trades", "win%", "max_dd"
        )?;
        for row in &self.ranking {
            writeln!(
                f,
                "{:>4}  {:<32} {:>16} {:>7} {:>8} {:>14}",
                row.rank,
                row.strategy_id.to_string(),
                row.total_pnl.round_dp(2).to_string(),
                row.total_trades,
                row.win_rate.to_string(),
                row.max_drawdown.round_dp(2).to_string(),
            )?;
        }
        write!(
            f,
            "{} runs, total pnl {}, {} trades ({} won, {} lost, {}% win rate)",
            self.runs,
            self.total_pnl.round_dp(2),
            self.total_trades,
            self.winning_trades,
            self.losing_trades,
            self.win_rate
        )
    }
}
