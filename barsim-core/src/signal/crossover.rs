//! SMA crossover: desired exposure follows the sign of fast minus slow.
//!
//! Fast strictly above slow asks for long exposure, strictly below asks for
//! short exposure, equality asks for nothing. This is a level comparison, not an
//! edge detector: the ledger provides the hysteresis by ignoring a signal that
//! matches the exposure already held.

use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::Bar;
use crate::indicators::{Indicator, Sma};

use super::{Signal, SignalGenerator};

/// Compare two indicator values. `None` on either side yields `Signal::None`.
pub fn crossover_signal(fast: Option<Decimal>, slow: Option<Decimal>) -> Signal {
    match (fast, slow) {
        (Some(f), Some(s)) if f > s => Signal::Long,
        (Some(f), Some(s)) if f < s => Signal::Short,
        _ => Signal::None,
    }
}

/// Moving average crossover over two streaming SMAs of the close.
#[derive(Debug, Clone)]
pub struct SmaCrossover {
    fast: Sma,
    slow: Sma,
    last_signal: Signal,
}

impl SmaCrossover {
    /// Callers validate `fast_period < slow_period` beforehand; see
    /// [`crate::config::StrategyConfig::validate`].
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        Self {
            fast: Sma::new(fast_period),
            slow: Sma::new(slow_period),
            last_signal: Signal::None,
        }
    }

    pub fn fast(&self) -> &Sma {
        &self.fast
    }

    pub fn slow(&self) -> &Sma {
        &self.slow
    }

    /// Signal produced by the most recent bar.
    pub fn last_signal(&self) -> Signal {
        self.last_signal
    }
}

impl SignalGenerator for SmaCrossover {
    fn name(&self) -> &str {
        "sma_crossover"
    }

    fn is_ready(&self) -> bool {
        self.fast.is_initialized() && self.slow.is_initialized()
    }

    fn on_bar(&mut self, bar: &Bar) -> Signal {
        self.fast.update(bar.close);
        self.slow.update(bar.close);

        if !self.is_ready() {
            debug!(
                fast = self.fast.count(),
                fast_period = self.fast.period(),
                slow = self.slow.count(),
                slow_period = self.slow.period(),
                "waiting for indicators to initialize"
            );
            self.last_signal = Signal::None;
            return Signal::None;
        }

        let signal = crossover_signal(self.fast.value(), self.slow.value());
        if signal != self.last_signal {
            debug!(
                ts = %bar.open_ts,
                close = %bar.close,
                fast = ?self.fast.value(),
                slow = ?self.slow.value(),
                ?signal,
                "signal changed"
            );
        }
        self.last_signal = signal;
        signal
    }

    fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.last_signal = Signal::None;
    }
}
