//! TrendKelly Runner — backtest configuration, data loading, simulated execution
//! and result export.
//!
//! This crate builds on `trendkelly-core` to provide:
//! - TOML run configuration with a content-addressed run id
//! - Bar loading from per-symbol CSV files or a seeded synthetic generator
//! - A simulated cash venue that fills stop and market orders bar by bar
//! - The multi-symbol backtest loop
//! - `result.json` / `trades.csv` artifacts and a text summary

pub mod config;
pub mod data_loader;
pub mod report;
pub mod runner;
pub mod venue;

pub use config::{ConfigFileError, RunConfig, RunId, RunSection};
pub use data_loader::{
    load_universe, parse_timestamp, write_bars_csv, CsvBarSource, ExcludedSymbol, LoadError,
    LoadedData, SyntheticBarSource,
};
pub use report::{ArtifactPaths, BacktestResult, ReportError, RESULT_FILE, TRADES_FILE};
pub use runner::{run_backtest, run_backtest_from_data, RunError};
pub use venue::{ClosedTrade, ExitReason, SimVenue};
