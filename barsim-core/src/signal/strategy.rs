//! Strategy kinds: a closed set of strategies selected by a `type` tag.
//!
//! `StrategyKind` is the serializable parameter record; `Strategy` is the
//! runtime instance it builds. Adding a strategy means adding a variant to both
//! and a match arm in each dispatch method.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::Bar;

use super::crossover::SmaCrossover;
use super::{Signal, SignalGenerator};

pub const DEFAULT_FAST_PERIOD: usize = 10;
pub const DEFAULT_SLOW_PERIOD: usize = 20;

/// Serializable strategy selection and parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyKind {
    /// Long while fast SMA > slow SMA, short while fast SMA < slow SMA.
    SmaCrossover {
        fast_period: usize,
        slow_period: usize,
    },
}

impl StrategyKind {
    /// Resolve a strategy by its type name and integer parameters.
    ///
    /// Missing parameters fall back to the strategy's defaults.
    pub fn from_type_name(
        type_name: &str,
        params: &BTreeMap<String, usize>,
    ) -> Result<Self, ConfigError> {
        match type_name {
            "sma_crossover" => Ok(StrategyKind::SmaCrossover {
                fast_period: params
                    .get("fast_period")
                    .copied()
                    .unwrap_or(DEFAULT_FAST_PERIOD),
                slow_period: params
                    .get("slow_period")
                    .copied()
                    .unwrap_or(DEFAULT_SLOW_PERIOD),
            }),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            StrategyKind::SmaCrossover { .. } => "sma_crossover",
        }
    }

    /// Parameter checks for this kind.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            StrategyKind::SmaCrossover {
                fast_period,
                slow_period,
            } => {
                if fast_period == 0 {
                    return Err(ConfigError::InvalidPeriod {
                        name: "fast_period",
                        value: fast_period,
                    });
                }
                if slow_period == 0 {
                    return Err(ConfigError::InvalidPeriod {
                        name: "slow_period",
                        value: slow_period,
                    });
                }
                if fast_period >= slow_period {
                    return Err(ConfigError::PeriodOrder {
                        fast: fast_period,
                        slow: slow_period,
                    });
                }
                Ok(())
            }
        }
    }

    /// Build a fresh strategy instance. Call [`StrategyKind::validate`] first.
    pub fn build(&self) -> Strategy {
        match *self {
            StrategyKind::SmaCrossover {
                fast_period,
                slow_period,
            } => Strategy::SmaCrossover(SmaCrossover::new(fast_period, slow_period)),
        }
    }
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::SmaCrossover {
            fast_period: DEFAULT_FAST_PERIOD,
            slow_period: DEFAULT_SLOW_PERIOD,
        }
    }
}

/// Runtime strategy instance, owned by exactly one run.
#[derive(Debug, Clone)]
pub enum Strategy {
    SmaCrossover(SmaCrossover),
}

impl SignalGenerator for Strategy {
    fn name(&self) -> &str {
        match self {
            Strategy::SmaCrossover(s) => s.name(),
        }
    }

    fn is_ready(&self) -> bool {
        match self {
            Strategy::SmaCrossover(s) => s.is_ready(),
        }
    }

    fn on_bar(&mut self, bar: &Bar) -> Signal {
        match self {
            Strategy::SmaCrossover(s) => s.on_bar(bar),
        }
    }

    fn reset(&mut self) {
        match self {
            Strategy::SmaCrossover(s) => s.reset(),
        }
    }
}
