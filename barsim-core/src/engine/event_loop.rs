//! Simulation loop: one deterministic timeline per run.
//!
//! A [`Backtest`] owns everything one run mutates: the strategy's indicators,
//! the ledger and the account. Nothing is shared between runs, so independent
//! runs can execute on separate threads without coordination.
//!
//! Per bar, in order:
//! 1. Check instrument and strict timestamp ordering
//! 2. Feed the close to the strategy (indicator updates, then signal)
//! 3. Ledger step on the signal, filling at the bar's close
//! 4. Mark equity at the close

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{validate_starting_balance, ConfigError, StrategyConfig};
use crate::domain::{Bar, InstrumentId};
use crate::fingerprint::RunFingerprint;
use crate::signal::{SignalGenerator, Strategy};

use super::ledger::{Ledger, LedgerError, StepOutcome};
use super::result::{BacktestResult, Period, RunRecord};

/// Problems with the supplied bar sequence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("bar sequence is empty")]
    EmptySeries,

    #[error("bar {index} at {current} is not after previous bar at {previous}")]
    OutOfOrder {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("bar {index} is for {found}, expected {expected}")]
    InstrumentMismatch {
        index: usize,
        expected: InstrumentId,
        found: InstrumentId,
    },

    #[error("no bars between {start} and {end}")]
    NoBarsInRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}

/// Any reason a run did not produce a result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("ledger contract violation: {0}")]
    Ledger(#[from] LedgerError),

    #[error("run cancelled after {bars_processed} bars")]
    Cancelled { bars_processed: usize },
}

/// Per-run context.
#[derive(Debug)]
pub struct Backtest {
    run_id: String,
    config: StrategyConfig,
    strategy: Strategy,
    ledger: Ledger,
    first_ts: Option<DateTime<Utc>>,
    last_ts: Option<DateTime<Utc>>,
    bars_processed: usize,
}

impl Backtest {
    /// Validate the configuration and build fresh run state.
    pub fn new(
        config: &StrategyConfig,
        starting_balance: Decimal,
        run_id: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        validate_starting_balance(starting_balance)?;

        Ok(Self {
            run_id: run_id.into(),
            config: config.clone(),
            strategy: config.strategy.build(),
            ledger: Ledger::new(
                config.instrument_id.clone(),
                config.trade_size,
                starting_balance,
            ),
            first_ts: None,
            last_ts: None,
            bars_processed: 0,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn bars_processed(&self) -> usize {
        self.bars_processed
    }

    /// Process one bar to completion.
    pub fn process_bar(&mut self, bar: &Bar) -> Result<StepOutcome, RunError> {
        let index = self.bars_processed;
        if bar.instrument_id != self.config.instrument_id {
            return Err(DataError::InstrumentMismatch {
                index,
                expected: self.config.instrument_id.clone(),
                found: bar.instrument_id.clone(),
            }
            .into());
        }
        if let Some(previous) = self.last_ts {
            if bar.open_ts <= previous {
                return Err(DataError::OutOfOrder {
                    index,
                    previous,
                    current: bar.open_ts,
                }
                .into());
            }
        }

        let signal = self.strategy.on_bar(bar);
        let outcome = self.ledger.step(signal, bar)?;
        self.ledger.mark(bar.close)?;

        self.first_ts.get_or_insert(bar.open_ts);
        self.last_ts = Some(bar.open_ts);
        self.bars_processed += 1;
        Ok(outcome)
    }

    /// Force-close any open position at the last price and clear indicator
    /// state.
    pub fn stop(&mut self) -> Result<(), LedgerError> {
        self.ledger.force_close()?;
        self.strategy.reset();
        Ok(())
    }

    /// Process `bars` in order, then finish. `cancel` is checked before each
    /// bar; once set, the run stops and its state is dropped.
    pub fn run<'a, I>(
        mut self,
        bars: I,
        cancel: Option<&AtomicBool>,
    ) -> Result<BacktestResult, RunError>
    where
        I: IntoIterator<Item = &'a Bar>,
    {
        for bar in bars {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                let bars_processed = self.bars_processed;
                info!(bars_processed, "backtest cancelled");
                return Err(RunError::Cancelled { bars_processed });
            }
            self.process_bar(bar)?;
        }
        self.finish()
    }

    /// Stop and aggregate. Fails with `EmptySeries` if no bar was processed.
    pub fn finish(mut self) -> Result<BacktestResult, RunError> {
        self.stop()?;
        let (Some(start), Some(end), Some(last_price)) =
            (self.first_ts, self.last_ts, self.ledger.last_price())
        else {
            return Err(DataError::EmptySeries.into());
        };
        let (orders, positions, account) = self.ledger.into_parts();
        Ok(BacktestResult::from_record(RunRecord {
            run_id: self.run_id,
            strategy_id: self.config.strategy_id,
            instrument_id: self.config.instrument_id,
            period: Period { start, end },
            bars_processed: self.bars_processed,
            last_price,
            orders,
            positions,
            account,
        }))
    }
}

/// Run one backtest over an in-memory bar sequence.
///
/// Deterministic: identical inputs always produce an identical result.
pub fn run_backtest(
    config: &StrategyConfig,
    bars: &[Bar],
    starting_balance: Decimal,
) -> Result<BacktestResult, RunError> {
    run_backtest_with_cancel(config, bars, starting_balance, None)
}

/// Like [`run_backtest`], checking `cancel` between bars. A cancelled run
/// discards its state and returns `RunError::Cancelled`.
pub fn run_backtest_with_cancel(
    config: &StrategyConfig,
    bars: &[Bar],
    starting_balance: Decimal,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    validate_starting_balance(starting_balance)?;
    validate_bars(&config.instrument_id, bars)?;
    let selected = select_bars(config, bars)?;

    let run_id = RunFingerprint::new(config, bars, starting_balance).run_id();
    info!(
        run_id = %&run_id[..12],
        strategy = %config.strategy_id,
        instrument = %config.instrument_id,
        bars = selected.len(),
        "backtest started"
    );

    let result = Backtest::new(config, starting_balance, run_id)?.run(selected, cancel)?;
    info!(
        total_trades = result.total_trades,
        win_rate = %result.win_rate,
        total_pnl = %result.total_pnl,
        ending_balance = %result.ending_balance,
        "backtest finished"
    );
    Ok(result)
}

/// Check the whole input before any selection, so a bad bar outside the
/// date range is still reported.
pub fn validate_bars(instrument_id: &InstrumentId, bars: &[Bar]) -> Result<(), DataError> {
    if bars.is_empty() {
        return Err(DataError::EmptySeries);
    }
    for (index, bar) in bars.iter().enumerate() {
        if &bar.instrument_id != instrument_id {
            return Err(DataError::InstrumentMismatch {
                index,
                expected: instrument_id.clone(),
                found: bar.instrument_id.clone(),
            });
        }
    }
    for (index, pair) in bars.windows(2).enumerate() {
        if pair[1].open_ts <= pair[0].open_ts {
            return Err(DataError::OutOfOrder {
                index: index + 1,
                previous: pair[0].open_ts,
                current: pair[1].open_ts,
            });
        }
    }
    Ok(())
}

/// Bars whose `open_ts` date falls inside the configured range, in input
/// order. Without a range every bar is selected.
pub fn select_bars<'a>(
    config: &StrategyConfig,
    bars: &'a [Bar],
) -> Result<Vec<&'a Bar>, DataError> {
    let Some(range) = config.date_range else {
        return Ok(bars.iter().collect());
    };
    let selected: Vec<&Bar> = bars
        .iter()
        .filter(|b| range.contains(b.open_ts.date_naive()))
        .collect();
    if selected.is_empty() {
        return Err(DataError::NoBarsInRange {
            start: range.start,
            end: range.end,
        });
    }
    debug!(
        kept = selected.len(),
        skipped = bars.len() - selected.len(),
        "applied date range"
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::StrategyKind;
    use chrono::{Duration, NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn config() -> StrategyConfig {
        StrategyConfig::new(
            "test",
            "EUR/USD.SIM",
            StrategyKind::SmaCrossover {
                fast_period: 2,
                slow_period: 3,
            },
            dec!(1),
        )
    }

    fn bars(closes: &[i64]) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let c = Decimal::from(c);
                Bar {
                    instrument_id: InstrumentId::new("EUR/USD.SIM"),
                    open_ts: base + Duration::days(i as i64),
                    open: c,
                    high: c,
                    low: c,
                    close: c,
                    volume: dec!(1),
                }
            })
            .collect()
    }

    #[test]
    fn empty_series_rejected() {
        assert_eq!(
            run_backtest(&config(), &[], dec!(1000)),
            Err(RunError::Data(DataError::EmptySeries))
        );
    }

    #[test]
    fn duplicate_timestamp_rejected() {
        let mut series = bars(&[1, 2, 3]);
        series[2].open_ts = series[1].open_ts;
        assert!(matches!(
            run_backtest(&config(), &series, dec!(1000)),
            Err(RunError::Data(DataError::OutOfOrder { index: 2, .. }))
        ));
    }

    #[test]
    fn wrong_instrument_rejected() {
        let mut series = bars(&[1, 2, 3]);
        series[1].instrument_id = InstrumentId::new("GBP/USD.SIM");
        assert!(matches!(
            run_backtest(&config(), &series, dec!(1000)),
            Err(RunError::Data(DataError::InstrumentMismatch { index: 1, .. }))
        ));
    }

    #[test]
    fn config_checked_before_data() {
        let mut cfg = config();
        cfg.trade_size = dec!(-1);
        assert!(matches!(
            run_backtest(&cfg, &[], dec!(1000)),
            Err(RunError::Config(ConfigError::NonPositiveTradeSize(_)))
        ));
        assert!(matches!(
            run_backtest(&config(), &bars(&[1]), Decimal::ZERO),
            Err(RunError::Config(ConfigError::NonPositiveBalance(_)))
        ));
    }

    #[test]
    fn date_range_selects_without_reordering() {
        let series = bars(&[1, 2, 3, 4, 5, 6]);
        let cfg = config().with_date_range(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
        );
        let selected = select_bars(&cfg, &series).unwrap();
        let closes: Vec<Decimal> = selected.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![dec!(2), dec!(3), dec!(4)]);

        let result = run_backtest(&cfg, &series, dec!(1000)).unwrap();
        assert_eq!(result.bars_processed, 3);
        assert_eq!(result.period.start, series[1].open_ts);
        assert_eq!(result.period.end, series[3].open_ts);
    }

    #[test]
    fn empty_date_range_is_data_error() {
        let cfg = config().with_date_range(
            NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2030, 1, 31).unwrap(),
        );
        assert!(matches!(
            run_backtest(&cfg, &bars(&[1, 2]), dec!(1000)),
            Err(RunError::Data(DataError::NoBarsInRange { .. }))
        ));
    }

    #[test]
    fn process_bar_checks_ordering_directly() {
        let mut bt = Backtest::new(&config(), dec!(1000), "id").unwrap();
        let series = bars(&[1, 2]);
        bt.process_bar(&series[1]).unwrap();
        assert!(matches!(
            bt.process_bar(&series[0]),
            Err(RunError::Data(DataError::OutOfOrder { index: 1, .. }))
        ));
    }

    #[test]
    fn finish_without_bars_is_empty_series() {
        let bt = Backtest::new(&config(), dec!(1000), "id").unwrap();
        assert_eq!(bt.finish(), Err(RunError::Data(DataError::EmptySeries)));
    }

    #[test]
    fn cancel_flag_discards_run() {
        let flag = AtomicBool::new(true);
        let result = run_backtest_with_cancel(&config(), &bars(&[1, 2, 3]), dec!(1000), Some(&flag));
        assert_eq!(result, Err(RunError::Cancelled { bars_processed: 0 }));
    }

    #[test]
    fn cancel_mid_run_reports_bars_done_and_no_result() {
        // GIVEN: ten bars and a flag that trips as the fifth bar is pulled
        let series = bars(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let flag = AtomicBool::new(false);
        let feed = series.iter().enumerate().map(|(i, bar)| {
            if i == 4 {
                flag.store(true, Ordering::Relaxed);
            }
            bar
        });

        // WHEN: the run consumes the feed
        let bt = Backtest::new(&config(), dec!(1000), "id").unwrap();
        let result = bt.run(feed, Some(&flag));

        // THEN: four bars were processed and the run is discarded
        assert_eq!(result, Err(RunError::Cancelled { bars_processed: 4 }));
    }

    #[test]
    fn run_without_cancel_matches_run_backtest() {
        let series = bars(&[1, 2, 3, 4, 3, 2, 1]);
        let direct = Backtest::new(&config(), dec!(1000), "id")
            .unwrap()
            .run(&series, None)
            .unwrap();
        assert_eq!(direct.bars_processed, 7);
        assert_eq!(direct.last_price, dec!(1));

        let via_fn = run_backtest(&config(), &series, dec!(1000)).unwrap();
        assert_eq!(via_fn.total_pnl, direct.total_pnl);
        assert_eq!(via_fn.positions, direct.positions);
    }

    #[test]
    fn oversized_trade_size_fails_instead_of_panicking() {
        // GIVEN: a valid config whose notional overflows once price jumps
        let mut cfg = config();
        cfg.strategy = StrategyKind::SmaCrossover {
            fast_period: 1,
            slow_period: 2,
        };
        cfg.trade_size = Decimal::from_i128_with_scale(10i128.pow(26), 0);
        assert!(cfg.validate().is_ok());

        // WHEN: long opens at 2, then the mark at 1000 is out of range
        let result = run_backtest(&cfg, &bars(&[1, 1, 2, 3, 1000]), dec!(1000));

        // THEN: the run aborts with a ledger error
        assert!(matches!(
            result,
            Err(RunError::Ledger(LedgerError::ArithmeticOverflow {
                position_id: Some(_),
                ..
            }))
        ));
    }

    #[test]
    fn stop_resets_indicators() {
        let mut bt = Backtest::new(&config(), dec!(1000), "id").unwrap();
        for bar in &bars(&[1, 2, 3, 4]) {
            bt.process_bar(bar).unwrap();
        }
        assert!(bt.strategy().is_ready());
        assert!(bt.ledger().open_position().is_some());

        bt.stop().unwrap();
        assert!(!bt.strategy().is_ready());
        assert!(bt.ledger().open_position().is_none());
    }
}
