//! Position: exposure opened by one fill and closed by an offsetting fill.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{InstrumentId, PositionId};
use super::order::OrderSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> Decimal {
        match self {
            PositionSide::Long => Decimal::ONE,
            PositionSide::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// Order side that opens exposure on this side.
    pub fn entry_side(self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Buy,
            PositionSide::Short => OrderSide::Sell,
        }
    }

    /// Order side that offsets exposure on this side.
    pub fn exit_side(self) -> OrderSide {
        self.entry_side().opposite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// A position. Immutable once `Closed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub instrument_id: InstrumentId,
    pub side: PositionSide,
    pub quantity: Decimal,
    pub avg_open_price: Decimal,
    pub avg_close_price: Option<Decimal>,
    pub realized_pnl: Decimal,
    pub status: PositionStatus,
    pub opened_ts: DateTime<Utc>,
    pub closed_ts: Option<DateTime<Utc>>,
}

impl Position {
    pub fn open(
        id: PositionId,
        instrument_id: InstrumentId,
        side: PositionSide,
        quantity: Decimal,
        price: Decimal,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            instrument_id,
            side,
            quantity,
            avg_open_price: price,
            avg_close_price: None,
            realized_pnl: Decimal::ZERO,
            status: PositionStatus::Open,
            opened_ts: ts,
            closed_ts: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    pub fn is_closed(&self) -> bool {
        self.status == PositionStatus::Closed
    }

    /// P&L of closing the whole position at `price`:
    /// `(price - avg_open_price) * quantity * sign(side)`.
    ///
    /// `None` if the result does not fit in a `Decimal`.
    pub fn pnl_at(&self, price: Decimal) -> Option<Decimal> {
        price
            .checked_sub(self.avg_open_price)?
            .checked_mul(self.quantity)?
            .checked_mul(self.side.sign())
    }

    /// Paper P&L against a mark price. Zero once closed.
    pub fn unrealized_pnl(&self, mark: Decimal) -> Option<Decimal> {
        if self.is_open() {
            self.pnl_at(mark)
        } else {
            Some(Decimal::ZERO)
        }
    }

    /// Close at `price`, fixing realized P&L. Returns the realized amount,
    /// or `None` on overflow, in which case the position is left open.
    ///
    /// Callers must only close open positions; the ledger checks this before
    /// calling in.
    pub(crate) fn close(&mut self, price: Decimal, ts: DateTime<Utc>) -> Option<Decimal> {
        debug_assert!(self.is_open(), "closing a position that is not open");
        let realized = self.pnl_at(price)?;
        self.avg_close_price = Some(price);
        self.realized_pnl = realized;
        self.status = PositionStatus::Closed;
        self.closed_ts = Some(ts);
        Some(realized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn position(side: PositionSide) -> Position {
        Position::open(
            PositionId(1),
            InstrumentId::new("SPY"),
            side,
            dec!(10),
            dec!(100),
            ts(2),
        )
    }

    #[test]
    fn long_pnl_is_price_gain_times_quantity() {
        let pos = position(PositionSide::Long);
        assert_eq!(pos.pnl_at(dec!(110)), Some(dec!(100)));
        assert_eq!(pos.pnl_at(dec!(95)), Some(dec!(-50)));
    }

    #[test]
    fn short_pnl_is_inverted() {
        let pos = position(PositionSide::Short);
        assert_eq!(pos.pnl_at(dec!(110)), Some(dec!(-100)));
        assert_eq!(pos.pnl_at(dec!(95)), Some(dec!(50)));
    }

    #[test]
    fn close_fixes_realized_and_zeroes_unrealized() {
        let mut pos = position(PositionSide::Long);
        assert_eq!(pos.unrealized_pnl(dec!(104)), Some(dec!(40)));

        let realized = pos.close(dec!(107.5), ts(5));
        assert_eq!(realized, Some(dec!(75)));
        assert!(pos.is_closed());
        assert_eq!(pos.avg_close_price, Some(dec!(107.5)));
        assert_eq!(pos.closed_ts, Some(ts(5)));
        assert_eq!(pos.unrealized_pnl(dec!(200)), Some(Decimal::ZERO));
    }

    #[test]
    fn oversized_pnl_is_none_and_close_leaves_position_open() {
        let mut pos = position(PositionSide::Long);
        pos.quantity = Decimal::MAX;
        assert_eq!(pos.pnl_at(dec!(300)), None);
        assert_eq!(pos.unrealized_pnl(dec!(300)), None);

        assert_eq!(pos.close(dec!(300), ts(5)), None);
        assert!(pos.is_open());
        assert_eq!(pos.avg_close_price, None);
        assert_eq!(pos.realized_pnl, Decimal::ZERO);
    }

    #[test]
    fn side_order_mapping() {
        assert_eq!(PositionSide::Long.entry_side(), OrderSide::Buy);
        assert_eq!(PositionSide::Long.exit_side(), OrderSide::Sell);
        assert_eq!(PositionSide::Short.entry_side(), OrderSide::Sell);
        assert_eq!(PositionSide::Short.exit_side(), OrderSide::Buy);
    }
}
