//! Run parameters — the flat configuration map and its typed form.
//!
//! The configuration surface is a flat `name → number | string` map. It is
//! validated once, before any bar is processed, into `StrategyParams`; a missing
//! key is fatal. `RiskParams` carries the Kelly sizing thresholds.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::compression;
use crate::indicators::{HullMode, PriceSource};

// ─── Error type ──────────────────────────────────────────────────────

/// Configuration errors. Any of these stops a run before it starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),
    #[error("invalid value for parameter '{key}': {reason}")]
    InvalidParameter { key: String, reason: String },
}

// ─── Flat map ────────────────────────────────────────────────────────

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

pub type ParamMap = BTreeMap<String, ParamValue>;

/// Every key the strategy needs, in the order they are checked.
pub const REQUIRED_KEYS: [&str; 16] = [
    "ht_res",
    "amplitude",
    "channel_deviation",
    "natr_res",
    "natr_period",
    "natr_multiplier",
    "st_grab_res",
    "st_grab_period",
    "ema_res",
    "ema_length_1",
    "ema_length_2",
    "ema_length_3",
    "hull_res",
    "hull_src",
    "hull_mode",
    "hull_length",
];

// ─── Helpers ─────────────────────────────────────────────────────────

fn get<'a>(map: &'a ParamMap, key: &str) -> Result<&'a ParamValue, ConfigError> {
    map.get(key)
        .ok_or_else(|| ConfigError::MissingParameter(key.to_string()))
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn number(map: &ParamMap, key: &str) -> Result<f64, ConfigError> {
    match get(map, key)? {
        ParamValue::Number(n) if n.is_finite() => Ok(*n),
        ParamValue::Number(n) => Err(invalid(key, format!("{n} is not finite"))),
        // Numbers typed in text fields are accepted.
        ParamValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(key, format!("expected a number, got '{s}'"))),
    }
}

/// Positive whole number (periods, resolutions).
fn count(map: &ParamMap, key: &str) -> Result<usize, ConfigError> {
    let n = number(map, key)?;
    if n < 1.0 || n.fract() != 0.0 {
        return Err(invalid(key, format!("expected a positive integer, got {n}")));
    }
    Ok(n as usize)
}

fn minutes(map: &ParamMap, key: &str) -> Result<u32, ConfigError> {
    let n = count(map, key)?;
    u32::try_from(n).map_err(|_| invalid(key, format!("{n} minutes is out of range")))
}

fn text<'a>(map: &'a ParamMap, key: &str) -> Result<&'a str, ConfigError> {
    match get(map, key)? {
        ParamValue::Text(s) => Ok(s.as_str()),
        ParamValue::Number(n) => Err(invalid(key, format!("expected text, got {n}"))),
    }
}

// ─── Strategy parameters ─────────────────────────────────────────────

/// Typed strategy parameters. Resolutions are in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    pub ht_res: u32,
    pub amplitude: usize,
    pub channel_deviation: f64,
    pub natr_res: u32,
    pub natr_period: usize,
    pub natr_multiplier: f64,
    pub st_grab_res: u32,
    pub st_grab_period: usize,
    pub ema_res: u32,
    pub ema_length_1: usize,
    pub ema_length_2: usize,
    pub ema_length_3: usize,
    pub hull_res: u32,
    pub hull_src: PriceSource,
    pub hull_mode: HullMode,
    pub hull_length: usize,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            ht_res: 60,
            amplitude: 2,
            channel_deviation: 2.0,
            natr_res: 60,
            natr_period: 5,
            natr_multiplier: 3.5,
            st_grab_res: 60,
            st_grab_period: 34,
            ema_res: 240,
            ema_length_1: 21,
            ema_length_2: 50,
            ema_length_3: 200,
            hull_res: 240,
            hull_src: PriceSource::Close,
            hull_mode: HullMode::Hma,
            hull_length: 55,
        }
    }
}

impl StrategyParams {
    /// Validate a flat map. Every missing key is reported before any value is parsed.
    pub fn from_map(map: &ParamMap) -> Result<Self, ConfigError> {
        if let Some(key) = REQUIRED_KEYS.iter().find(|k| !map.contains_key(**k)) {
            return Err(ConfigError::MissingParameter(key.to_string()));
        }

        let hull_src = text(map, "hull_src")?;
        let hull_mode = text(map, "hull_mode")?;

        Ok(Self {
            ht_res: minutes(map, "ht_res")?,
            amplitude: count(map, "amplitude")?,
            channel_deviation: number(map, "channel_deviation")?,
            natr_res: minutes(map, "natr_res")?,
            natr_period: count(map, "natr_period")?,
            natr_multiplier: number(map, "natr_multiplier")?,
            st_grab_res: minutes(map, "st_grab_res")?,
            st_grab_period: count(map, "st_grab_period")?,
            ema_res: minutes(map, "ema_res")?,
            ema_length_1: count(map, "ema_length_1")?,
            ema_length_2: count(map, "ema_length_2")?,
            ema_length_3: count(map, "ema_length_3")?,
            hull_res: minutes(map, "hull_res")?,
            hull_src: PriceSource::parse(hull_src)
                .ok_or_else(|| invalid("hull_src", format!("unknown price source '{hull_src}'")))?,
            hull_mode: HullMode::parse(hull_mode)
                .ok_or_else(|| invalid("hull_mode", format!("unknown Hull mode '{hull_mode}'")))?,
            hull_length: count(map, "hull_length")?,
        })
    }

    /// The flat map form of these parameters.
    pub fn to_map(&self) -> ParamMap {
        let entries: [(&str, ParamValue); 16] = [
            ("ht_res", (self.ht_res as f64).into()),
            ("amplitude", (self.amplitude as f64).into()),
            ("channel_deviation", self.channel_deviation.into()),
            ("natr_res", (self.natr_res as f64).into()),
            ("natr_period", (self.natr_period as f64).into()),
            ("natr_multiplier", self.natr_multiplier.into()),
            ("st_grab_res", (self.st_grab_res as f64).into()),
            ("st_grab_period", (self.st_grab_period as f64).into()),
            ("ema_res", (self.ema_res as f64).into()),
            ("ema_length_1", (self.ema_length_1 as f64).into()),
            ("ema_length_2", (self.ema_length_2 as f64).into()),
            ("ema_length_3", (self.ema_length_3 as f64).into()),
            ("hull_res", (self.hull_res as f64).into()),
            ("hull_src", ParamValue::Text(self.hull_src.to_string())),
            ("hull_mode", ParamValue::Text(self.hull_mode.to_string())),
            ("hull_length", (self.hull_length as f64).into()),
        ];
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Published defaults as a flat map.
    pub fn default_map() -> ParamMap {
        Self::default().to_map()
    }

    /// Per-indicator compression factors over `base_minutes`.
    pub fn compressions(&self, base_minutes: u32) -> Compressions {
        Compressions {
            halftrend: compression(self.ht_res, base_minutes),
            atr_stop: compression(self.natr_res, base_minutes),
            st_grab: compression(self.st_grab_res, base_minutes),
            htf_ema: compression(self.ema_res, base_minutes),
            hull: compression(self.hull_res, base_minutes),
        }
    }
}

/// How many base bars make up one bar of each indicator's resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compressions {
    pub halftrend: u32,
    pub atr_stop: u32,
    pub st_grab: u32,
    pub htf_ema: u32,
    pub hull: u32,
}

// ─── Risk parameters ─────────────────────────────────────────────────

/// Kelly sizing thresholds. Percentages are in percent units (1.0 = 1%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParams {
    /// Risk per trade until enough trades have closed.
    pub default_risk_percent: f64,
    /// Scales the Kelly fraction into a cash fraction.
    pub max_capital_exposure_pct: f64,
    pub minimum_trade_count: u64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            default_risk_percent: 1.0,
            max_capital_exposure_pct: 11.5,
            minimum_trade_count: 10,
        }
    }
}
