//! Incremental indicators.
//!
//! Every indicator is stepped one bar at a time and owns whatever history it needs.
//! During warm-up outputs are NaN (or `None` for categorical fields). Nothing here
//! may look at a bar later than the one being processed.
//!
//! Primitives (`Ema`, `Sma`, `Wma`, `RollingExtremum`, `Atr`) work on raw values and
//! are composed by the five strategy indicators: `HalfTrend`, `AtrTrailingStop`,
//! `StGrab`, `HtfEma` and `HullSuite`.

pub mod atr;
pub mod atr_trailing_stop;
pub mod ema;
pub mod extrema;
pub mod halftrend;
pub mod htf_ema;
pub mod hull_suite;
pub mod sma;
pub mod st_grab;
pub mod wma;

pub use atr::Atr;
pub use atr_trailing_stop::{AtrStopOutput, AtrTrailingStop, Bias};
pub use ema::Ema;
pub use extrema::RollingExtremum;
pub use halftrend::{HalfTrend, HalfTrendOutput, Trend};
pub use htf_ema::{HtfEma, HtfEmaOutput};
pub use hull_suite::{HullMode, HullOutput, HullSuite, PriceSource};
pub use sma::Sma;
pub use st_grab::{StGrab, StGrabOutput};
pub use wma::Wma;

use crate::domain::Bar;

/// Trait for bar-driven indicators.
///
/// # Look-ahead contamination guard
/// `update` sees exactly one new bar. Output at bar t is a function of bars 0..=t only,
/// so feeding a truncated series must reproduce the prefix of the full run.
pub trait Indicator: Send + Sync {
    type Output;

    /// Human-readable name (e.g., "halftrend_2_2", "hull_hma_55").
    fn name(&self) -> &str;

    /// Number of bars consumed before the first defined output.
    fn lookback(&self) -> usize;

    /// Consume the next bar and return the output for it.
    fn update(&mut self, bar: &Bar) -> Self::Output;
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
/// Timestamps are hourly from 2024-01-02 00:00.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let ohlc: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    make_ohlc_bars(&ohlc)
}

/// Create bars from explicit (open, high, low, close) tuples, hourly from 2024-01-02.
#[cfg(test)]
pub fn make_ohlc_bars(ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    ohlc.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            symbol: "TEST".to_string(),
            timestamp: base + chrono::Duration::hours(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
