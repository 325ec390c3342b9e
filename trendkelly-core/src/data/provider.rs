//! Bar source trait and structured data errors.
//!
//! A `BarSource` abstracts over where bars come from (CSV files, synthetic
//! generators, in-memory fixtures) so the runner can swap implementations and
//! tests can mock them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

/// Structured error types for bar loading.
///
/// Any of these excludes the affected symbol from a run; other symbols proceed.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no bars for symbol '{symbol}'")]
    Empty { symbol: String },

    #[error("symbol '{symbol}' has {got} bars, at least {needed} required")]
    Insufficient {
        symbol: String,
        got: usize,
        needed: usize,
    },

    #[error("I/O error for symbol '{symbol}': {source}")]
    Io {
        symbol: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error for symbol '{symbol}' at row {row}: {reason}")]
    Parse {
        symbol: String,
        row: usize,
        reason: String,
    },

    #[error("bars for symbol '{symbol}' are not strictly increasing at row {row}")]
    OutOfOrder { symbol: String, row: usize },
}

/// Where a symbol's bars came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Csv,
    Synthetic,
}

/// Finite, time-ordered, restartable bar sequence per symbol.
pub trait BarSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Load every bar for `symbol` at the source's base resolution, oldest first.
    fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataError>;
}

/// Check a loaded series: non-empty, strictly increasing timestamps, at least
/// `min_bars` long.
pub fn validate_bars(symbol: &str, bars: &[Bar], min_bars: usize) -> Result<(), DataError> {
    if bars.is_empty() {
        return Err(DataError::Empty {
            symbol: symbol.to_string(),
        });
    }
    if let Some(i) = bars
        .windows(2)
        .position(|w| w[1].timestamp <= w[0].timestamp)
    {
        return Err(DataError::OutOfOrder {
            symbol: symbol.to_string(),
            row: i + 1,
        });
    }
    if bars.len() < min_bars {
        return Err(DataError::Insufficient {
            symbol: symbol.to_string(),
            got: bars.len(),
            needed: min_bars,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn empty_series_is_rejected() {
        let err = validate_bars("SPY", &[], 1).unwrap_err();
        assert!(matches!(err, DataError::Empty { .. }));
        assert_eq!(err.to_string(), "no bars for symbol 'SPY'");
    }

    #[test]
    fn duplicate_timestamp_is_out_of_order() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        bars[2].timestamp = bars[1].timestamp;
        let err = validate_bars("SPY", &bars, 1).unwrap_err();
        assert!(matches!(err, DataError::OutOfOrder { row: 2, .. }));
    }

    #[test]
    fn short_series_is_insufficient() {
        let bars = make_bars(&[1.0, 2.0]);
        let err = validate_bars("SPY", &bars, 5).unwrap_err();
        assert!(matches!(err, DataError::Insufficient { got: 2, needed: 5, .. }));
        assert!(validate_bars("SPY", &bars, 2).is_ok());
    }
}
