//! Simple Moving Average (SMA), updated one close at a time.
//!
//! The window is a ring buffer of the last `period` closes plus a running sum.
//! Each update is O(1): push the new close, evict the oldest once full, adjust
//! the sum. The sum is exact decimal arithmetic; only the division in
//! [`Sma::value`] rounds, to [`SMA_SCALE`] places with banker's rounding, so
//! rounding error never accumulates across bars.

use std::collections::VecDeque;

use rust_decimal::{Decimal, RoundingStrategy};

use super::Indicator;

/// Decimal places kept in a reported SMA value.
pub const SMA_SCALE: u32 = 12;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
    window: VecDeque<Decimal>,
    sum: Decimal,
    count: u64,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
            window: VecDeque::with_capacity(period),
            sum: Decimal::ZERO,
            count: 0,
        }
    }

    /// Total samples seen since construction or the last reset.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Exact sum of the closes currently in the window.
    pub fn sum(&self) -> Decimal {
        self.sum
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn period(&self) -> usize {
        self.period
    }

    fn update(&mut self, price: Decimal) {
        if self.window.len() == self.period {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
            }
        }
        self.window.push_back(price);
        self.sum += price;
        self.count += 1;
    }

    fn is_initialized(&self) -> bool {
        self.count >= self.period as u64
    }

    fn value(&self) -> Option<Decimal> {
        if !self.is_initialized() {
            return None;
        }
        let mean = self.sum / Decimal::from(self.period as u64);
        Some(mean.round_dp_with_strategy(SMA_SCALE, RoundingStrategy::MidpointNearestEven))
    }

    fn reset(&mut self) {
        self.window.clear();
        self.sum = Decimal::ZERO;
        self.count = 0;
    }
}
