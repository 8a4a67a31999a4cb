//! Criterion benchmarks for barsim hot paths.
//!
//! Benchmarks:
//! 1. SMA streaming update
//! 2. Full backtest over a synthetic bar series

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;

use barsim_core::domain::{Bar, InstrumentId};
use barsim_core::indicators::{Indicator, Sma};
use barsim_core::signal::StrategyKind;
use barsim_core::{run_backtest, StrategyConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            // Deterministic oscillation in 1.05..1.15, 5 dp
            let wave = ((i * 7919) % 10_000) as i64;
            let close = Decimal::new(105_000 + wave, 5);
            Bar {
                instrument_id: InstrumentId::new("EUR/USD.SIM"),
                open_ts: base + Duration::minutes(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: Decimal::ONE,
            }
        })
        .collect()
}

// ── 1. SMA ───────────────────────────────────────────────────────────

fn bench_sma(c: &mut Criterion) {
    let prices: Vec<Decimal> = make_bars(10_000).into_iter().map(|b| b.close).collect();
    let mut group = c.benchmark_group("sma_update");
    for period in [10usize, 50, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(period), &period, |b, &p| {
            b.iter(|| {
                let mut sma = Sma::new(p);
                for &price in &prices {
                    sma.update(black_box(price));
                }
                sma.value()
            })
        });
    }
    group.finish();
}

// ── 2. Full run ──────────────────────────────────────────────────────

fn bench_backtest(c: &mut Criterion) {
    let config = StrategyConfig::new(
        "bench",
        "EUR/USD.SIM",
        StrategyKind::default(),
        Decimal::from(100_000),
    );
    let mut group = c.benchmark_group("run_backtest");
    for n in [1_000usize, 10_000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| run_backtest(black_box(&config), black_box(bars), Decimal::from(100_000)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sma, bench_backtest);
criterion_main!(benches);
