//! Run fingerprinting: deterministic identity of (config, dataset, balance).
//!
//! Two runs over identical inputs get the same `run_id`, which makes the
//! result JSON of a rerun byte-identical and lets callers deduplicate runs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;
use crate::domain::Bar;

/// Inputs that fully determine a backtest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub config_hash: String,
    pub dataset_hash: String,
    pub starting_balance: String,
}

impl RunFingerprint {
    pub fn new(config: &StrategyConfig, bars: &[Bar], starting_balance: Decimal) -> Self {
        Self {
            config_hash: config_hash(config),
            dataset_hash: dataset_hash(bars),
            starting_balance: starting_balance.normalize().to_string(),
        }
    }

    /// BLAKE3 over the canonical JSON of all three parts.
    pub fn run_id(&self) -> String {
        let canonical = serde_json::json!({
            "config_hash": &self.config_hash,
            "dataset_hash": &self.dataset_hash,
            "starting_balance": &self.starting_balance,
        });
        blake3::hash(canonical.to_string().as_bytes())
            .to_hex()
            .to_string()
    }
}

/// BLAKE3 of the config's JSON form.
pub fn config_hash(config: &StrategyConfig) -> String {
    // Struct fields serialize in declaration order, so the JSON is stable.
    let json = serde_json::to_string(config).unwrap_or_default();
    blake3::hash(json.as_bytes()).to_hex().to_string()
}

/// BLAKE3 over every bar field, in sequence order.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.instrument_id.as_str().as_bytes());
        hasher.update(&bar.open_ts.timestamp_micros().to_le_bytes());
        for value in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
            hasher.update(value.normalize().to_string().as_bytes());
            hasher.update(b"|");
        }
    }
    hasher.finalize().to_hex().to_string()
}
