//! barsim CLI: run, sweep and synthetic data commands.
//!
//! Commands:
//! - `run`: execute one backtest from a TOML config file
//! - `sweep`: run a fast/slow period grid in parallel and rank the results
//! - `synth`: write a deterministic synthetic bar CSV
//!
//! Logs go to stderr; set `RUST_LOG` to override the default `barsim=info`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use barsim_core::engine::BacktestResult;
use barsim_runner::export::export_summary_json;
use barsim_runner::{
    prepare, run_single, run_sweep, save_artifacts, write_csv, BacktestConfig, BatchRunner,
    DataSource, ParamGrid, RunSummary, SyntheticSpec,
};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "barsim",
    about = "barsim, an event-driven SMA crossover backtesting engine"
)]
struct Cli {
    /// Log at debug level (ignored when RUST_LOG is set).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// CSV bar file, overriding the config's `bars_csv`.
        #[arg(long)]
        bars: Option<PathBuf>,

        /// Output directory for result JSON and positions CSV.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the result without writing artifacts.
        #[arg(long, default_value_t = false)]
        no_export: bool,
    },
    /// Sweep fast/slow SMA periods over one bar series.
    Sweep {
        /// Path to a TOML config file (the base strategy).
        #[arg(long)]
        config: PathBuf,

        /// CSV bar file, overriding the config's `bars_csv`.
        #[arg(long)]
        bars: Option<PathBuf>,

        /// Fast periods, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = [5usize, 10, 15, 20])]
        fast: Vec<usize>,

        /// Slow periods, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = [20usize, 30, 50])]
        slow: Vec<usize>,

        /// Run jobs one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Write each run's artifacts and `summary.json` here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Write synthetic random-walk bars as CSV.
    Synth {
        /// Instrument id for every bar.
        #[arg(long, default_value = "EUR/USD.SIM")]
        instrument: String,

        /// Number of bars.
        #[arg(long, default_value_t = 1000)]
        count: usize,

        /// Bar interval in minutes.
        #[arg(long, default_value_t = 1)]
        interval_minutes: i64,

        /// First bar timestamp (RFC 3339). Defaults to 2020-01-01T00:00:00Z.
        #[arg(long)]
        start: Option<String>,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            bars,
            output_dir,
            no_export,
        } => run_cmd(&config, bars.as_deref(), &output_dir, no_export),
        Commands::Sweep {
            config,
            bars,
            fast,
            slow,
            sequential,
            output_dir,
        } => sweep_cmd(
            &config,
            bars.as_deref(),
            ParamGrid::new(fast, slow),
            sequential,
            output_dir.as_deref(),
        ),
        Commands::Synth {
            instrument,
            count,
            interval_minutes,
            start,
            out,
        } => synth_cmd(instrument, count, interval_minutes, start.as_deref(), &out),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "barsim=debug" } else { "barsim=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_cmd(config_path: &Path, bars: Option<&Path>, output_dir: &Path, no_export: bool) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let out = run_single(&config, bars)?;

    print_result(&out.result);
    if matches!(out.source, DataSource::Synthetic { .. }) {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }

    if !no_export {
        let paths = save_artifacts(&out.result, output_dir)?;
        println!();
        println!("Result:    {}", paths.result_json.display());
        println!("Positions: {}", paths.positions_csv.display());
    }
    Ok(())
}

fn sweep_cmd(
    config_path: &Path,
    bars: Option<&Path>,
    grid: ParamGrid,
    sequential: bool,
    output_dir: Option<&Path>,
) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    if grid.size() == 0 {
        bail!("parameter grid has no valid (fast < slow) pairs");
    }
    let prepared = prepare(&config, bars)?;
    info!(configs = grid.size(), bars = prepared.data.bars.len(), "starting sweep");

    let runner = BatchRunner::new().with_parallelism(!sequential);
    let results = run_sweep(
        &runner,
        &grid,
        &prepared.strategy,
        &prepared.data.bars,
        prepared.starting_balance,
    );
    for (strategy_id, err) in results.failures() {
        warn!(strategy = %strategy_id, error = %err, "sweep run failed");
    }

    let ok = results.into_results();
    let summary = RunSummary::from_results(&ok);
    println!("{summary}");

    if let Some(dir) = output_dir {
        for result in &ok {
            save_artifacts(result, dir)?;
        }
        let path = dir.join("summary.json");
        std::fs::write(&path, export_summary_json(&summary)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!();
        println!("Artifacts saved to: {}", dir.display());
    }
    Ok(())
}

fn synth_cmd(
    instrument: String,
    count: usize,
    interval_minutes: i64,
    start: Option<&str>,
    out: &Path,
) -> Result<()> {
    if interval_minutes <= 0 {
        bail!("--interval-minutes must be positive");
    }
    let mut spec = SyntheticSpec::minutes(instrument, count);
    spec.interval = Duration::minutes(interval_minutes);
    if let Some(start) = start {
        spec.start = DateTime::parse_from_rfc3339(start)
            .with_context(|| format!("invalid --start '{start}'"))?
            .with_timezone(&Utc);
    }

    let data = barsim_runner::generate_synthetic(&spec);
    let file = std::fs::File::create(out).with_context(|| format!("creating {}", out.display()))?;
    write_csv(file, &data.bars)?;
    println!(
        "Wrote {} bars for {} to {} (dataset {})",
        data.bars.len(),
        spec.instrument_id,
        out.display(),
        &data.dataset_hash[..12]
    );
    Ok(())
}

fn print_result(result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    println!("Run:            {}", result.short_run_id());
    println!("Strategy:       {}", result.strategy_id);
    println!("Instrument:     {}", result.instrument_id);
    println!(
        "Period:         {} to {}",
        result.period.start.to_rfc3339(),
        result.period.end.to_rfc3339()
    );
    println!("Bars:           {}", result.bars_processed);
    println!("Orders:         {}", result.total_orders);
    println!("Last Price:     {}", result.last_price);
    println!();
    println!("--- Performance ---");
    println!("Starting:       {}", result.starting_balance);
    println!("Ending:         {}", result.ending_balance);
    println!("Total P&L:      {}", result.total_pnl);
    println!("Max Drawdown:   {}", result.max_drawdown);
    println!(
        "Trades:         {} ({} won, {} lost, {} flat)",
        result.total_trades, result.winning_trades, result.losing_trades, result.breakeven_trades
    );
    println!("Win Rate:       {}%", result.win_rate);
}
