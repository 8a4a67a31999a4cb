//! Order and position ledger for one instrument.
//!
//! The ledger turns desired exposure into concrete order and position
//! transitions and keeps the flat-or-one-sided invariant: at most one open
//! position exists at any time.
//!
//! Fill model: market orders fill immediately and in full at the triggering
//! bar's close. There is no slippage, no commission and no partial fill. This
//! is a backtest assumption, not a venue guarantee.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{
    Account, Bar, IdGen, InstrumentId, Order, OrderId, OrderSide, OrderStatus, Position,
    PositionId, PositionSide,
};
use crate::signal::Signal;

/// Contract violations inside the ledger. These indicate a bug in the caller,
/// not bad user input, and abort the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("no open position on {instrument_id} to close")]
    NoOpenPosition { instrument_id: InstrumentId },

    #[error("position {position_id} is already open on {instrument_id}")]
    PositionAlreadyOpen {
        instrument_id: InstrumentId,
        position_id: PositionId,
    },

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {order_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("order {order_id} is {status:?}, expected Filled")]
    OrderNotFilled {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("order {0} is filled but has no fill price or fill time")]
    MissingFillDetails(OrderId),

    #[error("P&L overflowed at price {price} (position {position_id:?})")]
    ArithmeticOverflow {
        position_id: Option<PositionId>,
        price: Decimal,
    },
}

/// What one ledger step did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub closed: Option<PositionId>,
    pub opened: Option<PositionId>,
}

impl StepOutcome {
    pub fn is_noop(&self) -> bool {
        self.closed.is_none() && self.opened.is_none()
    }
}

/// Orders, positions and account for one run.
#[derive(Debug, Clone)]
pub struct Ledger {
    instrument_id: InstrumentId,
    trade_size: Decimal,
    ids: IdGen,
    orders: Vec<Order>,
    positions: Vec<Position>,
    /// Index into `positions` of the open position, if any.
    open: Option<usize>,
    account: Account,
    last_price: Option<Decimal>,
    last_ts: Option<DateTime<Utc>>,
}

impl Ledger {
    pub fn new(instrument_id: InstrumentId, trade_size: Decimal, starting_balance: Decimal) -> Self {
        Self {
            instrument_id,
            trade_size,
            ids: IdGen::default(),
            orders: Vec::new(),
            positions: Vec::new(),
            open: None,
            account: Account::new(starting_balance),
            last_price: None,
            last_ts: None,
        }
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn open_position(&self) -> Option<&Position> {
        self.open.map(|idx| &self.positions[idx])
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.iter().filter(|p| p.is_open()).count()
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Close of the most recent bar seen by [`Ledger::step`].
    pub fn last_price(&self) -> Option<Decimal> {
        self.last_price
    }

    pub fn last_ts(&self) -> Option<DateTime<Utc>> {
        self.last_ts
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    // ── Order lifecycle ────────────────────────────────────────────────

    /// Record a market order. A non-positive quantity is recorded as
    /// `Rejected` and has no further effect.
    pub fn submit_market(
        &mut self,
        side: OrderSide,
        quantity: Decimal,
        ts: DateTime<Utc>,
    ) -> OrderId {
        let id = self.ids.next_order_id();
        let mut order = Order::market(id, self.instrument_id.clone(), side, quantity, ts);
        if quantity <= Decimal::ZERO {
            warn!(order = %id, %quantity, "rejecting order with non-positive quantity");
            order.status = OrderStatus::Rejected;
        } else {
            debug!(order = %id, ?side, %quantity, "order submitted");
        }
        self.orders.push(order);
        id
    }

    /// Fill a submitted order at `price`.
    pub fn fill(
        &mut self,
        order_id: OrderId,
        price: Decimal,
        ts: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let order = self.transition(order_id, OrderStatus::Filled)?;
        order.fill_price = Some(price);
        order.filled_ts = Some(ts);
        Ok(())
    }

    /// Cancel a submitted order.
    pub fn cancel(&mut self, order_id: OrderId) -> Result<(), LedgerError> {
        self.transition(order_id, OrderStatus::Cancelled)?;
        debug!(order = %order_id, "order cancelled");
        Ok(())
    }

    /// Cancel every order still `Submitted`. Returns how many were cancelled.
    pub fn cancel_submitted(&mut self) -> usize {
        let mut cancelled = 0;
        for order in self
            .orders
            .iter_mut()
            .filter(|o| o.status == OrderStatus::Submitted)
        {
            order.status = OrderStatus::Cancelled;
            cancelled += 1;
        }
        if cancelled > 0 {
            info!(cancelled, "cancelled outstanding orders");
        }
        cancelled
    }

    fn transition(&mut self, order_id: OrderId, to: OrderStatus) -> Result<&mut Order, LedgerError> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        if !order.status.can_transition_to(to) {
            return Err(LedgerError::InvalidTransition {
                order_id,
                from: order.status,
                to,
            });
        }
        order.status = to;
        Ok(order)
    }

    fn filled_order(&mut self, order_id: OrderId) -> Result<&mut Order, LedgerError> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::Filled {
            return Err(LedgerError::OrderNotFilled {
                order_id,
                status: order.status,
            });
        }
        Ok(order)
    }

    // ── Position lifecycle ─────────────────────────────────────────────

    /// Open a position from a filled order.
    pub fn open_position_from(
        &mut self,
        order_id: OrderId,
        side: PositionSide,
    ) -> Result<PositionId, LedgerError> {
        if let Some(existing) = self.open_position() {
            return Err(LedgerError::PositionAlreadyOpen {
                instrument_id: self.instrument_id.clone(),
                position_id: existing.id,
            });
        }
        let position_id = self.ids.next_position_id();
        let instrument_id = self.instrument_id.clone();
        let order = self.filled_order(order_id)?;
        let (price, ts) = fill_details(order)?;
        let quantity = order.quantity;
        order.position_id = Some(position_id);

        self.positions.push(Position::open(
            position_id,
            instrument_id,
            side,
            quantity,
            price,
            ts,
        ));
        self.open = Some(self.positions.len() - 1);
        info!(position = %position_id, ?side, %quantity, %price, ts = %ts, "position opened");
        Ok(position_id)
    }

    /// Close the open position against a filled order, crediting realized
    /// P&L to the account.
    pub fn close_position_with(&mut self, order_id: OrderId) -> Result<PositionId, LedgerError> {
        let idx = self.open.ok_or_else(|| LedgerError::NoOpenPosition {
            instrument_id: self.instrument_id.clone(),
        })?;
        let position_id = self.positions[idx].id;
        let order = self.filled_order(order_id)?;
        let (price, ts) = fill_details(order)?;
        order.position_id = Some(position_id);

        let overflow = LedgerError::ArithmeticOverflow {
            position_id: Some(position_id),
            price,
        };
        let realized = self.positions[idx]
            .close(price, ts)
            .ok_or_else(|| overflow.clone())?;
        self.open = None;
        let balance = self.account.credit(realized).ok_or(overflow)?;
        info!(
            position = %position_id,
            %price,
            %realized,
            %balance,
            "position closed"
        );
        Ok(position_id)
    }

    // ── Per-bar step ───────────────────────────────────────────────────

    /// Apply one bar's desired exposure.
    ///
    /// An opposing open position is closed first, then a new position is
    /// opened in the desired direction. A matching open position is left
    /// alone. `Signal::None` does nothing.
    pub fn step(&mut self, signal: Signal, bar: &Bar) -> Result<StepOutcome, LedgerError> {
        self.last_price = Some(bar.close);
        self.last_ts = Some(bar.open_ts);

        let mut outcome = StepOutcome::default();
        let Some(desired) = signal.desired_side() else {
            return Ok(outcome);
        };

        if let Some(open) = self.open_position() {
            if open.side == desired {
                return Ok(outcome);
            }
            let (exit_side, quantity) = (open.side.exit_side(), open.quantity);
            outcome.closed = Some(self.market_close(exit_side, quantity, bar.close, bar.open_ts)?);
        }

        outcome.opened = self.market_open(desired, bar.close, bar.open_ts)?;
        Ok(outcome)
    }

    /// Close any open position at the last known price. Outstanding
    /// submitted orders are cancelled first.
    pub fn force_close(&mut self) -> Result<Option<PositionId>, LedgerError> {
        self.cancel_submitted();
        let Some(open) = self.open_position() else {
            return Ok(None);
        };
        let (position_id, exit_side, quantity) = (open.id, open.side.exit_side(), open.quantity);
        // An open position implies at least one stepped bar.
        let (price, ts) = match (self.last_price, self.last_ts) {
            (Some(price), Some(ts)) => (price, ts),
            _ => (open.avg_open_price, open.opened_ts),
        };
        let unrealized = self.unrealized_pnl()?;
        info!(position = %position_id, %price, %unrealized, "force-closing open position");
        self.market_close(exit_side, quantity, price, ts).map(Some)
    }

    /// Record an equity observation at the latest close. Returns equity.
    pub fn mark(&mut self, price: Decimal) -> Result<Decimal, LedgerError> {
        let open = self.open.map(|idx| &self.positions[idx]);
        let position_id = open.map(|p| p.id);
        self.account
            .mark(open, price)
            .ok_or(LedgerError::ArithmeticOverflow { position_id, price })
    }

    /// Unrealized P&L of the open position at the last known price.
    pub fn unrealized_pnl(&self) -> Result<Decimal, LedgerError> {
        let Some(price) = self.last_price else {
            return Ok(Decimal::ZERO);
        };
        let open = self.open_position();
        self.account
            .unrealized_pnl(open, price)
            .ok_or(LedgerError::ArithmeticOverflow {
                position_id: open.map(|p| p.id),
                price,
            })
    }

    fn market_close(
        &mut self,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
        ts: DateTime<Utc>,
    ) -> Result<PositionId, LedgerError> {
        let order_id = self.submit_market(side, quantity, ts);
        self.fill(order_id, price, ts)?;
        self.close_position_with(order_id)
    }

    fn market_open(
        &mut self,
        side: PositionSide,
        price: Decimal,
        ts: DateTime<Utc>,
    ) -> Result<Option<PositionId>, LedgerError> {
        let order_id = self.submit_market(side.entry_side(), self.trade_size, ts);
        if self.order(order_id).map(|o| o.status) == Some(OrderStatus::Rejected) {
            return Ok(None);
        }
        self.fill(order_id, price, ts)?;
        self.open_position_from(order_id, side).map(Some)
    }

    pub(crate) fn into_parts(self) -> (Vec<Order>, Vec<Position>, Account) {
        (self.orders, self.positions, self.account)
    }
}

fn fill_details(order: &Order) -> Result<(Decimal, DateTime<Utc>), LedgerError> {
    match (order.fill_price, order.filled_ts) {
        (Some(price), Some(ts)) => Ok((price, ts)),
        _ => Err(LedgerError::MissingFillDetails(order.id)),
    }
}
