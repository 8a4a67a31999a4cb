//! Backtest result record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Account, InstrumentId, Order, Position, StrategyId};

use super::aggregate::{truncate_for_report, TradeStats};

/// First and last processed bar timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Outcome of one completed run. Produced once, never mutated.
///
/// Field order is the JSON field order; there are no maps, so identical
/// inputs serialize to identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub run_id: String,
    pub strategy_id: StrategyId,
    pub instrument_id: InstrumentId,
    pub period: Period,
    pub bars_processed: usize,
    /// Close of the last processed bar, the price open exposure was marked
    /// and force-closed at.
    pub last_price: Decimal,
    pub starting_balance: Decimal,
    pub ending_balance: Decimal,
    pub total_pnl: Decimal,
    pub max_drawdown: Decimal,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    /// Percent, 2 dp.
    pub win_rate: Decimal,
    /// Order count before truncation.
    pub total_orders: usize,
    pub orders: Vec<Order>,
    pub positions: Vec<Position>,
}

/// Everything the aggregator needs from a finished run.
pub(crate) struct RunRecord {
    pub run_id: String,
    pub strategy_id: StrategyId,
    pub instrument_id: InstrumentId,
    pub period: Period,
    pub bars_processed: usize,
    pub last_price: Decimal,
    pub orders: Vec<Order>,
    pub positions: Vec<Position>,
    pub account: Account,
}

impl BacktestResult {
    /// Aggregate a finished run. Statistics come from the full ledger before
    /// the lists are truncated.
    pub(crate) fn from_record(record: RunRecord) -> Self {
        let stats = TradeStats::from_positions(&record.positions);
        let starting_balance = record.account.starting_balance();
        let ending_balance = record.account.balance();

        Self {
            run_id: record.run_id,
            strategy_id: record.strategy_id,
            instrument_id: record.instrument_id,
            period: record.period,
            bars_processed: record.bars_processed,
            last_price: record.last_price,
            starting_balance,
            ending_balance,
            total_pnl: record.account.realized_pnl(),
            max_drawdown: record.account.max_drawdown(),
            total_trades: stats.total_trades,
            winning_trades: stats.winning_trades,
            losing_trades: stats.losing_trades,
            breakeven_trades: stats.breakeven_trades,
            win_rate: stats.win_rate(),
            total_orders: record.orders.len(),
            orders: truncate_for_report(&record.orders),
            positions: truncate_for_report(&record.positions),
        }
    }

    pub fn stats(&self) -> TradeStats {
        TradeStats {
            total_trades: self.total_trades,
            winning_trades: self.winning_trades,
            losing_trades: self.losing_trades,
            breakeven_trades: self.breakeven_trades,
        }
    }

    /// Compact JSON, the canonical form for reproducibility checks.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// First 12 hex characters of the run id.
    pub fn short_run_id(&self) -> &str {
        self.run_id.get(..12).unwrap_or(&self.run_id)
    }
}
