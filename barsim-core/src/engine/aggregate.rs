//! Trade statistics over the final ledger.
//!
//! Statistics always read the full order and position lists. Truncation for
//! reporting happens afterwards and never changes a count.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::Position;

/// Maximum orders and positions carried in a reported result.
pub const MAX_REPORTED_ITEMS: usize = 100;

/// Counts over closed positions.
///
/// A close with exactly zero realized P&L is a breakeven trade: it counts
/// towards `total_trades` but is neither a win nor a loss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
}

impl TradeStats {
    pub fn from_positions(positions: &[Position]) -> Self {
        positions
            .iter()
            .filter(|p| p.is_closed())
            .fold(Self::default(), |mut stats, p| {
                stats.total_trades += 1;
                if p.realized_pnl > Decimal::ZERO {
                    stats.winning_trades += 1;
                } else if p.realized_pnl < Decimal::ZERO {
                    stats.losing_trades += 1;
                } else {
                    stats.breakeven_trades += 1;
                }
                stats
            })
    }

    /// Percentage of winning trades, 2 decimal places. Zero when no trades.
    pub fn win_rate(&self) -> Decimal {
        win_rate(self.winning_trades, self.total_trades)
    }
}

/// `winning / total * 100`, rounded half away from zero to 2 dp.
pub fn win_rate(winning: usize, total: usize) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(winning) * Decimal::ONE_HUNDRED / Decimal::from(total))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// First `MAX_REPORTED_ITEMS` items, in ledger order.
pub fn truncate_for_report<T: Clone>(items: &[T]) -> Vec<T> {
    items.iter().take(MAX_REPORTED_ITEMS).cloned().collect()
}
