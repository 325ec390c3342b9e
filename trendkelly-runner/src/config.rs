//! Run configuration loaded from TOML.
//!
//! ```toml
//! [run]
//! symbols = ["AAPL", "MSFT"]
//! base_resolution = 60
//! initial_capital = 100000.0
//! data_dir = "data"
//!
//! [params]
//! ht_res = 60
//! hull_mode = "hma"
//! # ...every strategy key
//!
//! [risk]
//! minimum_trade_count = 10
//! ```
//!
//! `[params]` stays a flat map here; it is validated into `StrategyParams` by the
//! runner before any bar is loaded.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use trendkelly_core::{ConfigError, ParamMap, RiskParams, StrategyParams};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors reading or checking a run file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to render TOML: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid [run] section: {0}")]
    Invalid(String),
}

/// The `[run]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub symbols: Vec<String>,
    /// Base bar resolution in minutes.
    pub base_resolution: u32,
    pub initial_capital: f64,
    /// Directory holding one `{SYMBOL}.csv` per symbol.
    pub data_dir: PathBuf,
    /// Generate seeded random-walk bars instead of reading CSV files.
    pub synthetic: bool,
    pub seed: u64,
    /// Bars per symbol when `synthetic` is set.
    pub synthetic_bars: usize,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            base_resolution: 60,
            initial_capital: 100_000.0,
            data_dir: PathBuf::from("data"),
            synthetic: false,
            seed: 42,
            synthetic_bars: 2_000,
        }
    }
}

/// Everything needed to reproduce a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub run: RunSection,
    pub params: ParamMap,
    #[serde(default)]
    pub risk: RiskParams,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigFileError> {
        let config: Self = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Starter configuration with the published strategy defaults.
    pub fn template(symbols: &[&str]) -> Self {
        Self {
            run: RunSection {
                symbols: symbols.iter().map(|s| s.to_string()).collect(),
                ..RunSection::default()
            },
            params: StrategyParams::default_map(),
            risk: RiskParams::default(),
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigFileError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Shape checks on `[run]`. Strategy keys are checked by `strategy_params`.
    fn check(&self) -> Result<(), ConfigFileError> {
        if self.run.symbols.is_empty() {
            return Err(ConfigFileError::Invalid("symbols must not be empty".into()));
        }
        if self.run.base_resolution == 0 {
            return Err(ConfigFileError::Invalid(
                "base_resolution must be at least 1 minute".into(),
            ));
        }
        if !(self.run.initial_capital.is_finite() && self.run.initial_capital > 0.0) {
            return Err(ConfigFileError::Invalid(format!(
                "initial_capital must be positive, got {}",
                self.run.initial_capital
            )));
        }
        Ok(())
    }

    pub fn strategy_params(&self) -> Result<StrategyParams, ConfigError> {
        StrategyParams::from_map(&self.params)
    }

    /// Deterministic id over this configuration and the dataset it ran on.
    pub fn run_id(&self, dataset_hash: &str) -> Result<RunId, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(&json);
        hasher.update(dataset_hash.as_bytes());
        Ok(hasher.finalize().to_hex().to_string())
    }
}
