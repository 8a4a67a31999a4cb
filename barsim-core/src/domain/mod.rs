//! Domain types for barsim

pub mod account;
pub mod bar;
pub mod ids;
pub mod order;
pub mod position;

pub use account::Account;
pub use bar::Bar;
pub use ids::{IdGen, InstrumentId, OrderId, PositionId, StrategyId};
pub use order::{Order, OrderKind, OrderSide, OrderStatus};
pub use position::{Position, PositionSide, PositionStatus};
