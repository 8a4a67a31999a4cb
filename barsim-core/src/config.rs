//! Strategy configuration and up-front validation.
//!
//! Everything here is checked before a run creates any state, so a
//! configuration error never leaves a half-built ledger behind.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{InstrumentId, StrategyId};
use crate::signal::StrategyKind;

/// Errors detected before a run starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown strategy type: {0}")]
    UnknownStrategy(String),

    #[error("{name} must be >= 1 (got {value})")]
    InvalidPeriod { name: &'static str, value: usize },

    #[error("fast_period ({fast}) must be < slow_period ({slow})")]
    PeriodOrder { fast: usize, slow: usize },

    #[error("trade_size must be > 0 (got {0})")]
    NonPositiveTradeSize(Decimal),

    #[error("starting_balance must be > 0 (got {0})")]
    NonPositiveBalance(Decimal),

    #[error("date range start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("instrument_id must not be empty")]
    EmptyInstrument,
}

/// Inclusive calendar range applied to bar `open_ts` dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Configuration for one strategy instance on one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub strategy_id: StrategyId,
    pub instrument_id: InstrumentId,
    pub strategy: StrategyKind,
    /// Quantity of every opening order.
    pub trade_size: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

impl StrategyConfig {
    pub fn new(
        strategy_id: impl Into<String>,
        instrument_id: impl Into<String>,
        kind: StrategyKind,
        trade_size: Decimal,
    ) -> Self {
        Self {
            strategy_id: StrategyId::new(strategy_id),
            instrument_id: InstrumentId::new(instrument_id),
            strategy: kind,
            trade_size,
            date_range: None,
        }
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange::new(start, end));
        self
    }

    /// Check every field. Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instrument_id.as_str().trim().is_empty() {
            return Err(ConfigError::EmptyInstrument);
        }
        self.strategy.validate()?;
        if self.trade_size <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveTradeSize(self.trade_size));
        }
        if let Some(range) = self.date_range {
            if range.start > range.end {
                return Err(ConfigError::InvalidDateRange {
                    start: range.start,
                    end: range.end,
                });
            }
        }
        Ok(())
    }
}

pub fn validate_starting_balance(balance: Decimal) -> Result<(), ConfigError> {
    if balance <= Decimal::ZERO {
        return Err(ConfigError::NonPositiveBalance(balance));
    }
    Ok(())
}
