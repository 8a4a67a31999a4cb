//! Result export: JSON and CSV artifacts.
//!
//! Each run writes two files into the output directory, named by strategy
//! id and the first 12 characters of the run id:
//! - `{strategy}_{run}.json`: the full `BacktestResult`, pretty-printed
//! - `{strategy}_{run}_positions.csv`: one row per reported position

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use barsim_core::domain::Position;
use barsim_core::engine::BacktestResult;

use crate::summary::RunSummary;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")
}

pub fn export_summary_json(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize RunSummary to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export positions as CSV.
///
/// Columns: position_id, side, quantity, avg_open_price, avg_close_price,
/// realized_pnl, status, opened_ts, closed_ts
pub fn export_positions_csv(positions: &[Position]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "position_id",
        "side",
        "quantity",
        "avg_open_price",
        "avg_close_price",
        "realized_pnl",
        "status",
        "opened_ts",
        "closed_ts",
    ])?;

    for p in positions {
        wtr.write_record([
            p.id.to_string(),
            format!("{:?}", p.side).to_uppercase(),
            p.quantity.to_string(),
            p.avg_open_price.to_string(),
            p.avg_close_price.map(|d| d.to_string()).unwrap_or_default(),
            p.realized_pnl.to_string(),
            format!("{:?}", p.status).to_uppercase(),
            p.opened_ts.to_rfc3339(),
            p.closed_ts.map(|ts| ts.to_rfc3339()).unwrap_or_default(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Paths written by [`save_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub result_json: PathBuf,
    pub positions_csv: PathBuf,
}

/// File stem for a run: sanitized strategy id plus short run id.
pub fn artifact_stem(result: &BacktestResult) -> String {
    let strategy: String = result
        .strategy_id
        .to_string()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}", strategy, result.short_run_id())
}

/// Write the JSON result and positions CSV for one run.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<ArtifactPaths> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let stem = artifact_stem(result);
    let paths = ArtifactPaths {
        result_json: output_dir.join(format!("{stem}.json")),
        positions_csv: output_dir.join(format!("{stem}_positions.csv")),
    };

    std::fs::write(&paths.result_json, export_json(result)?)
        .with_context(|| format!("failed to write {}", paths.result_json.display()))?;
    std::fs::write(&paths.positions_csv, export_positions_csv(&result.positions)?)
        .with_context(|| format!("failed to write {}", paths.positions_csv.display()))?;

    Ok(paths)
}
