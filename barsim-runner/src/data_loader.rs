//! Bar loading for the runner.
//!
//! Bars come from a CSV file or, when no file is configured, from a
//! deterministic synthetic random walk. Either way the engine receives an
//! in-memory, time-ordered sequence; ordering is still re-checked by the
//! engine before a run.
//!
//! CSV columns: `instrument_id,open_ts,open,high,low,close,volume` with
//! RFC 3339 timestamps and decimal prices.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use barsim_core::domain::{Bar, InstrumentId};
use barsim_core::fingerprint::dataset_hash;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: invalid timestamp '{value}' (expected RFC 3339)")]
    InvalidTimestamp { row: usize, value: String },

    #[error("row {row}: invalid {column} '{value}'")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: inconsistent OHLC values")]
    InvalidBar { row: usize },
}

/// Where a bar sequence came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    Csv { path: PathBuf },
    Synthetic { seed_hash: String },
}

/// Bars plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedBars {
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// BLAKE3 over all bar data.
    pub dataset_hash: String,
}

impl LoadedBars {
    fn new(bars: Vec<Bar>, source: DataSource) -> Self {
        let dataset_hash = dataset_hash(&bars);
        Self {
            bars,
            source,
            dataset_hash,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, DataSource::Synthetic { .. })
    }
}

/// One CSV row. Numbers stay strings until parsed as exact decimals.
#[derive(Debug, Serialize, Deserialize)]
struct CsvBar {
    instrument_id: String,
    open_ts: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
}

fn parse_decimal(row: usize, column: &'static str, value: &str) -> Result<Decimal, LoadError> {
    Decimal::from_str(value).map_err(|_| LoadError::InvalidNumber {
        row,
        column,
        value: value.to_string(),
    })
}

/// Load bars from a CSV file.
pub fn load_csv(path: &Path) -> Result<LoadedBars, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = read_csv(file)?;
    info!(path = %path.display(), bars = bars.len(), "loaded bars from csv");
    Ok(LoadedBars::new(
        bars,
        DataSource::Csv {
            path: path.to_path_buf(),
        },
    ))
}

/// Parse CSV bars from any reader. Row numbers in errors are 1-based and
/// exclude the header.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for (i, record) in rdr.deserialize::<CsvBar>().enumerate() {
        let row = i + 1;
        let record = record?;
        let open_ts = DateTime::parse_from_rfc3339(&record.open_ts)
            .map_err(|_| LoadError::InvalidTimestamp {
                row,
                value: record.open_ts.clone(),
            })?
            .with_timezone(&Utc);
        let bar = Bar {
            instrument_id: InstrumentId::new(record.instrument_id),
            open_ts,
            open: parse_decimal(row, "open", &record.open)?,
            high: parse_decimal(row, "high", &record.high)?,
            low: parse_decimal(row, "low", &record.low)?,
            close: parse_decimal(row, "close", &record.close)?,
            volume: parse_decimal(row, "volume", &record.volume)?,
        };
        if !bar.is_sane() {
            return Err(LoadError::InvalidBar { row });
        }
        bars.push(bar);
    }
    Ok(bars)
}

/// Write bars in the loader's CSV format.
pub fn write_csv<W: Write>(writer: W, bars: &[Bar]) -> Result<(), LoadError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for bar in bars {
        wtr.serialize(CsvBar {
            instrument_id: bar.instrument_id.to_string(),
            open_ts: bar.open_ts.to_rfc3339(),
            open: bar.open.to_string(),
            high: bar.high.to_string(),
            low: bar.low.to_string(),
            close: bar.close.to_string(),
            volume: bar.volume.to_string(),
        })?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Parameters for a synthetic series.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSpec {
    pub instrument_id: InstrumentId,
    pub start: DateTime<Utc>,
    pub interval: Duration,
    pub count: usize,
}

impl SyntheticSpec {
    /// One-minute bars starting 2020-01-01 UTC.
    pub fn minutes(instrument_id: impl Into<String>, count: usize) -> Self {
        Self {
            instrument_id: InstrumentId::new(instrument_id),
            start: Utc
                .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or_default(),
            interval: Duration::minutes(1),
            count,
        }
    }
}

/// Generate a synthetic random walk.
///
/// Prices start at 1.10000 and move in whole pips of 0.00001, so every value
/// is an exact 5 dp decimal. The RNG is seeded from the instrument id: the
/// same `SyntheticSpec` always yields the same bars.
pub fn generate_synthetic(spec: &SyntheticSpec) -> LoadedBars {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed_bytes = blake3::hash(spec.instrument_id.as_str().as_bytes());
    let seed: [u8; 32] = *seed_bytes.as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let floor = 50_000i64; // 0.50000
    let mut price = 110_000i64; // 1.10000
    let mut bars = Vec::with_capacity(spec.count);

    for i in 0..spec.count {
        let open = price;
        let close = (price + rng.gen_range(-25i64..=25)).max(floor);
        let high = open.max(close) + rng.gen_range(0i64..=10);
        let low = (open.min(close) - rng.gen_range(0i64..=10)).max(floor);
        let volume = rng.gen_range(100i64..10_000);

        bars.push(Bar {
            instrument_id: spec.instrument_id.clone(),
            open_ts: spec.start + spec.interval * i as i32,
            open: Decimal::new(open, 5),
            high: Decimal::new(high, 5),
            low: Decimal::new(low, 5),
            close: Decimal::new(close, 5),
            volume: Decimal::from(volume),
        });
        price = close;
    }

    debug!(instrument = %spec.instrument_id, bars = bars.len(), "generated synthetic bars");
    LoadedBars::new(
        bars,
        DataSource::Synthetic {
            seed_hash: seed_bytes.to_hex().to_string(),
        },
    )
}
