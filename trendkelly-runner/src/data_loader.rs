//! Bar loading and data resolution for the runner.
//!
//! Two `BarSource` implementations:
//! 1. `CsvBarSource`: one `{SYMBOL}.csv` per symbol under a data directory
//! 2. `SyntheticBarSource`: seeded random walk, for demos and tests
//!
//! `load_universe` asks a source for every symbol. A symbol whose data fails to
//! load or validate is excluded with its reason; the run continues with the rest
//! and only fails when nothing is left.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use trendkelly_core::data::{validate_bars, BarSource, DataError, DataSource};
use trendkelly_core::domain::Bar;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("none of the {requested} requested symbols could be loaded")]
    NoUsableSymbols { requested: usize },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// A symbol dropped from the run and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// Result of loading bars, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// Validated bars per symbol, oldest first.
    pub bars: BTreeMap<String, Vec<Bar>>,
    pub excluded: Vec<ExcludedSymbol>,
    pub source: DataSource,
    /// BLAKE3 over all loaded bar data.
    pub dataset_hash: String,
}

impl LoadedData {
    pub fn symbols(&self) -> Vec<String> {
        self.bars.keys().cloned().collect()
    }
}

/// Load every symbol from `source`, excluding the ones that fail.
pub fn load_universe(
    source: &dyn BarSource,
    kind: DataSource,
    symbols: &[String],
    min_bars: usize,
) -> Result<LoadedData, LoadError> {
    let mut bars = BTreeMap::new();
    let mut excluded = Vec::new();

    for symbol in symbols {
        let loaded = source
            .load(symbol)
            .and_then(|b| validate_bars(symbol, &b, min_bars).map(|()| b));
        match loaded {
            Ok(series) => {
                info!(symbol = %symbol, bars = series.len(), source = source.name(), "loaded");
                bars.insert(symbol.clone(), series);
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "symbol excluded");
                excluded.push(ExcludedSymbol {
                    symbol: symbol.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if bars.is_empty() {
        return Err(LoadError::NoUsableSymbols {
            requested: symbols.len(),
        });
    }

    let dataset_hash = compute_dataset_hash(&bars);
    Ok(LoadedData {
        bars,
        excluded,
        source: kind,
        dataset_hash,
    })
}

/// Deterministic BLAKE3 hash over all bar data, in symbol order.
fn compute_dataset_hash(bars: &BTreeMap<String, Vec<Bar>>) -> String {
    let mut hasher = blake3::Hasher::new();
    for (symbol, series) in bars {
        hasher.update(symbol.as_bytes());
        for bar in series {
            hasher.update(&bar.timestamp.and_utc().timestamp().to_le_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

// ─── CSV ─────────────────────────────────────────────────────────────

/// One CSV row. `volume` may be absent.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

/// Reads `{data_dir}/{SYMBOL}.csv` with header
/// `timestamp,open,high,low,close[,volume]`.
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    data_dir: PathBuf,
}

impl CsvBarSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{symbol}.csv"))
    }
}

impl BarSource for CsvBarSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol);
        let file = std::fs::File::open(&path).map_err(|source| DataError::Io {
            symbol: symbol.to_string(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

        let mut bars = Vec::new();
        for (i, record) in reader.deserialize::<CsvRow>().enumerate() {
            // Row numbers count the header as row 1.
            let row = i + 2;
            let parse_err = |reason: String| DataError::Parse {
                symbol: symbol.to_string(),
                row,
                reason,
            };
            let r = record.map_err(|e| parse_err(e.to_string()))?;
            let timestamp = parse_timestamp(&r.timestamp)
                .ok_or_else(|| parse_err(format!("unrecognised timestamp '{}'", r.timestamp)))?;
            let bar = Bar {
                symbol: symbol.to_string(),
                timestamp,
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                volume: r.volume.unwrap_or(0.0),
            };
            if !bar.is_sane() {
                return Err(parse_err("inconsistent OHLC values".into()));
            }
            bars.push(bar);
        }
        Ok(bars)
    }
}

/// Accepts `YYYY-MM-DD HH:MM[:SS]`, the same with a `T` separator, a bare date,
/// or integer Unix seconds.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let s = s.trim();
    if let Some(ts) = FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(ts);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    s.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.naive_utc())
}

/// Write bars in the format `CsvBarSource` reads.
pub fn write_bars_csv(path: &Path, bars: &[Bar]) -> Result<(), LoadError> {
    let write_err = |source: csv::Error| LoadError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
    for bar in bars {
        writer
            .serialize(CsvRow {
                timestamp: bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: Some(bar.volume),
            })
            .map_err(write_err)?;
    }
    writer.flush().map_err(|e| write_err(e.into()))?;
    Ok(())
}

// ─── Synthetic ───────────────────────────────────────────────────────

/// Seeded random-walk bars. The same seed and symbol always give the same series.
#[derive(Debug, Clone)]
pub struct SyntheticBarSource {
    seed: u64,
    bars: usize,
    base_minutes: u32,
    start: NaiveDateTime,
}

impl SyntheticBarSource {
    pub fn new(seed: u64, bars: usize, base_minutes: u32) -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self {
            seed,
            bars,
            base_minutes: base_minutes.max(1),
            start,
        }
    }

    fn rng_for(&self, symbol: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }
}

impl BarSource for SyntheticBarSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataError> {
        let mut rng = self.rng_for(symbol);
        let step = chrono::Duration::minutes(i64::from(self.base_minutes));
        let mut price: f64 = rng.gen_range(20.0..400.0);
        // Slow regime drift so trends and reversals both appear.
        let mut drift = 0.0_f64;

        let mut bars = Vec::with_capacity(self.bars);
        let mut timestamp = self.start;
        for i in 0..self.bars {
            if i % 200 == 0 {
                drift = rng.gen_range(-0.002..0.002);
            }
            let ret: f64 = drift + rng.gen_range(-0.012..0.012);
            let open = price;
            let close = (price * (1.0 + ret)).max(0.01);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.006));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.006));
            bars.push(Bar {
                symbol: symbol.to_string(),
                timestamp,
                open,
                high,
                low,
                close,
                volume: rng.gen_range(10_000.0..1_000_000.0),
            });
            price = close;
            timestamp += step;
        }
        Ok(bars)
    }
}
