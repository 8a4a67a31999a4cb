//! Account: cash balance plus derived mark-to-market statistics.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::position::Position;

/// Single-currency account for one run.
///
/// `balance` only moves when realized P&L is credited at position close.
/// Equity (balance + unrealized P&L) is recomputed from the open position on
/// every mark and never written back into the balance.
///
/// Every update is checked. A method returning `None` has overflowed and left
/// the account unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    starting_balance: Decimal,
    balance: Decimal,
    realized_pnl: Decimal,
    peak_equity: Decimal,
    max_drawdown: Decimal,
}

impl Account {
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            starting_balance,
            balance: starting_balance,
            realized_pnl: Decimal::ZERO,
            peak_equity: starting_balance,
            max_drawdown: Decimal::ZERO,
        }
    }

    pub fn starting_balance(&self) -> Decimal {
        self.starting_balance
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Credit realized P&L (negative for a loss). Returns the new balance.
    pub fn credit(&mut self, realized_pnl: Decimal) -> Option<Decimal> {
        let balance = self.balance.checked_add(realized_pnl)?;
        let realized = self.realized_pnl.checked_add(realized_pnl)?;
        self.balance = balance;
        self.realized_pnl = realized;
        Some(balance)
    }

    /// Realized P&L so far. Always `balance - starting_balance`.
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Paper P&L of the open position at `mark`, zero when flat.
    pub fn unrealized_pnl(&self, open: Option<&Position>, mark: Decimal) -> Option<Decimal> {
        match open {
            Some(p) => p.unrealized_pnl(mark),
            None => Some(Decimal::ZERO),
        }
    }

    /// Balance plus unrealized P&L.
    pub fn equity(&self, open: Option<&Position>, mark: Decimal) -> Option<Decimal> {
        self.balance.checked_add(self.unrealized_pnl(open, mark)?)
    }

    /// Record one equity observation and update the peak/drawdown statistics.
    pub fn mark(&mut self, open: Option<&Position>, mark: Decimal) -> Option<Decimal> {
        let equity = self.equity(open, mark)?;
        let peak = self.peak_equity.max(equity);
        let drawdown = peak.checked_sub(equity)?;
        self.peak_equity = peak;
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
        Some(equity)
    }

    /// Largest observed peak-to-trough equity decline, in currency units.
    pub fn max_drawdown(&self) -> Decimal {
        self.max_drawdown
    }
}
