//! Orders and their lifecycle states.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{InstrumentId, OrderId, PositionId};

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// Only market orders exist in the simulated venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    Market,
}

/// Order lifecycle states.
///
/// `Submitted` is the only non-terminal state. Every other state is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Submitted,
    Filled,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Submitted)
    }

    /// Whether `self → to` is a legal transition.
    pub fn can_transition_to(self, to: OrderStatus) -> bool {
        matches!(
            (self, to),
            (OrderStatus::Submitted, OrderStatus::Filled)
                | (OrderStatus::Submitted, OrderStatus::Rejected)
                | (OrderStatus::Submitted, OrderStatus::Cancelled)
        )
    }
}

/// A single order as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub instrument_id: InstrumentId,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub kind: OrderKind,
    pub status: OrderStatus,
    pub fill_price: Option<Decimal>,
    pub submitted_ts: DateTime<Utc>,
    pub filled_ts: Option<DateTime<Utc>>,
    /// Position opened or closed by this order's fill.
    pub position_id: Option<PositionId>,
}

impl Order {
    pub fn market(
        id: OrderId,
        instrument_id: InstrumentId,
        side: OrderSide,
        quantity: Decimal,
        submitted_ts: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            instrument_id,
            side,
            quantity,
            kind: OrderKind::Market,
            status: OrderStatus::Submitted,
            fill_price: None,
            submitted_ts,
            filled_ts: None,
            position_id: None,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    /// Filled quantity: the whole order or nothing (no partial fills).
    pub fn filled_quantity(&self) -> Decimal {
        if self.is_filled() {
            self.quantity
        } else {
            Decimal::ZERO
        }
    }
}
