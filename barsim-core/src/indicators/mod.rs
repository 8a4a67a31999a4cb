//! Streaming indicators.
//!
//! Indicators are fed one close per bar, in bar order, by the strategy that owns
//! them. A value is only defined once the indicator has seen enough samples.

pub mod sma;

pub use sma::{Sma, SMA_SCALE};

use rust_decimal::Decimal;

/// Trait for incrementally updated indicators.
///
/// # Look-ahead guard
/// `update` only ever receives the current bar's price, so a value at bar t
/// cannot depend on bar t+1.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20").
    fn name(&self) -> &str;

    /// Number of samples required before `value()` is defined.
    fn period(&self) -> usize;

    /// Append one sample.
    fn update(&mut self, price: Decimal);

    fn is_initialized(&self) -> bool;

    /// Current value, `None` until initialized.
    fn value(&self) -> Option<Decimal>;

    /// Drop every sample.
    fn reset(&mut self);
}
