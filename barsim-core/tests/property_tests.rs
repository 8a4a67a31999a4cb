//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. SMA: uninitialized below its period, mean of the last `p` closes after
//! 2. Flat invariant: never more than one open position
//! 3. Balance identity: ending = starting + total P&L = starting + realized
//! 4. Trade counts: total = winning + losing + breakeven

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

use barsim_core::domain::{Bar, InstrumentId, OrderStatus};
use barsim_core::engine::{run_backtest, Backtest};
use barsim_core::indicators::{Indicator, Sma, SMA_SCALE};
use barsim_core::signal::StrategyKind;
use barsim_core::StrategyConfig;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Prices with up to 4 decimal places, FX-style.
fn arb_price() -> impl Strategy<Value = Decimal> {
    (5_000i64..20_000).prop_map(|p| Decimal::new(p, 4))
}

fn arb_closes(max_len: usize) -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(arb_price(), 1..max_len)
}

fn arb_periods() -> impl Strategy<Value = (usize, usize)> {
    (1usize..6).prop_flat_map(|fast| (Just(fast), (fast + 1)..(fast + 12)))
}

fn bars(closes: &[Decimal]) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            instrument_id: InstrumentId::new("EUR/USD.SIM"),
            open_ts: base + Duration::hours(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: Decimal::ONE,
        })
        .collect()
}

fn config(fast: usize, slow: usize, trade_size: i64) -> StrategyConfig {
    StrategyConfig::new(
        "prop",
        "EUR/USD.SIM",
        StrategyKind::SmaCrossover {
            fast_period: fast,
            slow_period: slow,
        },
        Decimal::from(trade_size),
    )
}

// ── 1. SMA ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn sma_is_mean_of_last_period(period in 1usize..30, closes in arb_closes(80)) {
        let mut sma = Sma::new(period);
        for (i, &close) in closes.iter().enumerate() {
            sma.update(close);
            let seen = i + 1;
            if seen < period {
                prop_assert!(!sma.is_initialized());
                prop_assert_eq!(sma.value(), None);
            } else {
                let window = &closes[seen - period..seen];
                let sum: Decimal = window.iter().copied().sum();
                let expected = (sum / Decimal::from(period))
                    .round_dp_with_strategy(SMA_SCALE, RoundingStrategy::MidpointNearestEven);
                prop_assert_eq!(sma.value(), Some(expected));
            }
        }
    }
}

// ── 2. Flat invariant ────────────────────────────────────────────────

proptest! {
    #[test]
    fn at_most_one_open_position(
        (fast, slow) in arb_periods(),
        closes in arb_closes(200),
    ) {
        let cfg = config(fast, slow, 1000);
        let mut bt = Backtest::new(&cfg, Decimal::from(100_000), "prop").unwrap();
        for bar in &bars(&closes) {
            bt.process_bar(bar).unwrap();
            prop_assert!(bt.ledger().open_position_count() <= 1);
        }
        bt.stop().unwrap();
        prop_assert_eq!(bt.ledger().open_position_count(), 0);
    }
}

// ── 3 & 4. Balance identity and trade counts ─────────────────────────

proptest! {
    #[test]
    fn balance_identity_holds(
        (fast, slow) in arb_periods(),
        // Short enough that no list is truncated.
        closes in arb_closes(90),
        trade_size in 1i64..100_000,
    ) {
        let result = run_backtest(
            &config(fast, slow, trade_size),
            &bars(&closes),
            Decimal::from(100_000),
        ).unwrap();

        prop_assert_eq!(result.ending_balance, result.starting_balance + result.total_pnl);
        let realized: Decimal = result.positions.iter().map(|p| p.realized_pnl).sum();
        prop_assert_eq!(result.total_pnl, realized);

        prop_assert_eq!(
            result.total_trades,
            result.winning_trades + result.losing_trades + result.breakeven_trades
        );
        prop_assert!(result.positions.iter().all(|p| p.is_closed()));
        prop_assert!(result.orders.iter().all(|o| o.status == OrderStatus::Filled));
        prop_assert!(result.win_rate >= Decimal::ZERO);
        prop_assert!(result.win_rate <= Decimal::ONE_HUNDRED);
    }
}
