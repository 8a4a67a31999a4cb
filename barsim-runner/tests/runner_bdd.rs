//! BDD tests for the runner: config file to exported artifacts.
//!
//! These tests verify:
//! - Single run from a TOML file with a CSV bar file
//! - Date range selection from config
//! - Parameter sweep with summary ranking
//! - Artifact export

use barsim_core::engine::{DataError, RunError};
use barsim_runner::{
    export_json, generate_synthetic, import_json, run_single, run_sweep, save_artifacts,
    write_csv, BacktestConfig, BatchRunner, ParamGrid, RunSummary, RunnerError, SyntheticSpec,
};
use rust_decimal::Decimal;

fn write_fixture(dir: &std::path::Path, bars: usize, extra: &str) -> std::path::PathBuf {
    let data = generate_synthetic(&SyntheticSpec::minutes("EUR/USD.SIM", bars));
    let csv = std::fs::File::create(dir.join("bars.csv")).unwrap();
    write_csv(csv, &data.bars).unwrap();

    let config = format!(
        r#"
[strategy]
id = "sma-eurusd"
type = "sma_crossover"
instrument_id = "EUR/USD.SIM"
trade_size = "100000"

[strategy.params]
fast_period = 5
slow_period = 20

[backtest]
starting_balance = "100000"
bars_csv = "bars.csv"
{extra}
"#
    );
    let path = dir.join("run.toml");
    std::fs::write(&path, config).unwrap();
    path
}

#[test]
fn bdd_scenario_run_from_config_file() {
    // GIVEN a config file pointing at a CSV of 600 bars
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), 600, "");

    // WHEN the runner executes it
    let config = BacktestConfig::from_file(&path).unwrap();
    let out = run_single(&config, None).expect("run should succeed");

    // THEN every bar is processed and the balance identity holds
    let result = &out.result;
    assert_eq!(result.bars_processed, 600);
    assert_eq!(result.ending_balance, result.starting_balance + result.total_pnl);
    assert!(result.orders.len() <= 100);
    assert!(result.total_orders >= result.orders.len());

    // AND a second run is byte-identical
    let again = run_single(&config, None).unwrap();
    assert_eq!(export_json(result).unwrap(), export_json(&again.result).unwrap());
}

#[test]
fn bdd_scenario_date_range_outside_data() {
    // GIVEN a config whose date range misses every bar
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        dir.path(),
        100,
        "start_date = \"2030-01-01\"\nend_date = \"2030-01-31\"",
    );
    let config = BacktestConfig::from_file(&path).unwrap();

    // WHEN it runs
    let err = run_single(&config, None).unwrap_err();

    // THEN the run fails with a data error and no result
    assert!(matches!(
        err,
        RunnerError::Run(RunError::Data(DataError::NoBarsInRange { .. }))
    ));
}

#[test]
fn bdd_scenario_sweep_ranks_runs() {
    // GIVEN synthetic bars and a 2x2 grid
    let data = generate_synthetic(&SyntheticSpec::minutes("EUR/USD.SIM", 800));
    let config = BacktestConfig::from_toml("[strategy]\nid = \"sweep\"\n").unwrap();
    let base = config.strategy_config().unwrap();
    let grid = ParamGrid::new(vec![5, 10], vec![20, 40]);

    // WHEN the sweep runs in parallel
    let results = run_sweep(
        &BatchRunner::new(),
        &grid,
        &base,
        &data.bars,
        config.starting_balance(),
    );

    // THEN all four runs succeed with distinct run ids
    assert_eq!(results.len(), 4);
    let ok = results.into_results();
    let mut ids: Vec<&str> = ok.iter().map(|r| r.run_id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);

    // AND the summary ranks them by P&L, best first
    let summary = RunSummary::from_results(&ok);
    assert_eq!(summary.runs, 4);
    let pnls: Vec<Decimal> = summary.ranking.iter().map(|r| r.total_pnl).collect();
    assert!(pnls.windows(2).all(|w| w[0] >= w[1]));
    let total: Decimal = ok.iter().map(|r| r.total_pnl).sum();
    assert_eq!(summary.total_pnl, total);
}

#[test]
fn bdd_scenario_export_artifacts() {
    // GIVEN a completed run
    let config = BacktestConfig::from_toml("[strategy]\nid = \"export\"\n").unwrap();
    let out = run_single(&config, None).unwrap();

    // WHEN artifacts are saved
    let dir = tempfile::tempdir().unwrap();
    let paths = save_artifacts(&out.result, dir.path()).unwrap();

    // THEN the JSON reloads to the same result
    let json = std::fs::read_to_string(&paths.result_json).unwrap();
    assert_eq!(import_json(&json).unwrap(), out.result);
    assert!(paths
        .positions_csv
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("export_") && n.ends_with("_positions.csv")));
}
