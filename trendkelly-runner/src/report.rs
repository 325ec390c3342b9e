//! Backtest result and its on-disk artifacts.
//!
//! A run directory holds:
//! - `result.json`: the full `BacktestResult`
//! - `trades.csv`: one row per closed trade

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use trendkelly_core::data::DataSource;
use trendkelly_core::sizers::KellyStats;
use trendkelly_core::{RiskParams, StrategyParams};

use crate::config::RunId;
use crate::data_loader::ExcludedSymbol;
use crate::venue::ClosedTrade;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

pub const RESULT_FILE: &str = "result.json";
pub const TRADES_FILE: &str = "trades.csv";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize result: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write trades CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Complete result of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub data_source: DataSource,
    /// Symbols that ran, in processing order.
    pub symbols: Vec<String>,
    pub excluded: Vec<ExcludedSymbol>,
    pub closed_trades_by_symbol: BTreeMap<String, u64>,
    pub total_closed_trades: u64,
    pub kelly: KellyStats,
    /// Risk fraction the sizer would apply to the next entry.
    pub final_risk_fraction: f64,
    pub initial_capital: f64,
    pub final_cash: f64,
    pub final_account_value: f64,
    pub open_positions: usize,
    pub rejected_orders: u64,
    /// Distinct timestamps processed.
    pub bar_count: usize,
    pub params: StrategyParams,
    pub risk: RiskParams,
    pub trades: Vec<ClosedTrade>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Where `save` wrote the artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub result_json: PathBuf,
    pub trades_csv: PathBuf,
}

impl BacktestResult {
    /// Write `result.json` and `trades.csv` into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<ArtifactPaths, ReportError> {
        std::fs::create_dir_all(dir).map_err(|source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let result_json = dir.join(RESULT_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&result_json, json).map_err(|source| ReportError::Io {
            path: result_json.clone(),
            source,
        })?;

        let trades_csv = dir.join(TRADES_FILE);
        let mut writer = csv::Writer::from_path(&trades_csv)?;
        for trade in &self.trades {
            writer.serialize(trade)?;
        }
        writer.flush().map_err(|source| ReportError::Io {
            path: trades_csv.clone(),
            source,
        })?;

        Ok(ArtifactPaths {
            result_json,
            trades_csv,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    /// Plain-text summary: per-symbol closed-trade counts, then run totals.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        let width = self
            .closed_trades_by_symbol
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(6)
            .max(6);

        let _ = writeln!(s, "{:<width$}  {:>6}", "Symbol", "Closed");
        for (symbol, count) in &self.closed_trades_by_symbol {
            let _ = writeln!(s, "{symbol:<width$}  {count:>6}");
        }
        let _ = writeln!(s, "{:<width$}  {:>6}", "Total", self.total_closed_trades);
        let _ = writeln!(s);
        let _ = writeln!(
            s,
            "Win rate {:.1}%  avg win {:.2}  avg loss {:.2}  kelly {:.2}",
            self.kelly.win_rate() * 100.0,
            self.kelly.avg_win,
            self.kelly.avg_loss,
            self.kelly.kelly()
        );
        let _ = writeln!(
            s,
            "Capital {:.2} -> {:.2} (cash {:.2}, {} open, {} rejected)",
            self.initial_capital,
            self.final_account_value,
            self.final_cash,
            self.open_positions,
            self.rejected_orders
        );
        for e in &self.excluded {
            let _ = writeln!(s, "Excluded {}: {}", e.symbol, e.reason);
        }
        s
    }
}
