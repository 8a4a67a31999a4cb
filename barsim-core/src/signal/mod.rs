//! Signal generation: turns indicator values into desired exposure.
//!
//! Signals never see the ledger or account. They describe what exposure the
//! market calls for on this bar; the ledger decides which orders that implies
//! given the exposure already held.

pub mod crossover;
pub mod strategy;

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, PositionSide};

pub use crossover::{crossover_signal, SmaCrossover};
pub use strategy::{Strategy, StrategyKind};

/// Desired exposure for one bar. Recomputed every bar, never stored as state
/// the ledger depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    None,
    Long,
    Short,
}

impl Signal {
    /// The position side this signal asks for, if any.
    pub fn desired_side(self) -> Option<PositionSide> {
        match self {
            Signal::None => None,
            Signal::Long => Some(PositionSide::Long),
            Signal::Short => Some(PositionSide::Short),
        }
    }
}

/// Capability shared by every strategy kind.
pub trait SignalGenerator: Send + Sync {
    /// Human-readable name (e.g., "sma_crossover").
    fn name(&self) -> &str;

    /// Whether every indicator the strategy reads is initialized.
    fn is_ready(&self) -> bool;

    /// Feed one bar and return the desired exposure for it.
    ///
    /// Must return `Signal::None` while not ready.
    fn on_bar(&mut self, bar: &Bar) -> Signal;

    /// Clear all indicator state.
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desired_side_mapping() {
        assert_eq!(Signal::None.desired_side(), None);
        assert_eq!(Signal::Long.desired_side(), Some(PositionSide::Long));
        assert_eq!(Signal::Short.desired_side(), Some(PositionSide::Short));
    }

    #[test]
    fn signal_serializes_screaming() {
        assert_eq!(serde_json::to_string(&Signal::None).unwrap(), "\"NONE\"");
        assert_eq!(serde_json::to_string(&Signal::Short).unwrap(), "\"SHORT\"");
    }
}
