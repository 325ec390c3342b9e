//! Look-ahead contamination tests for the five strategy indicators.
//!
//! Invariant: no indicator value at bar t may depend on price data from bar t+1
//! or later.
//!
//! Method: step a fresh instance over a truncated series (bars 0..200) and
//! another over the full series (bars 0..400). The first 200 outputs must be
//! identical, NaNs included. Any difference means state leaked across bars.

use chrono::NaiveDate;
use std::fmt::Debug;
use trendkelly_core::domain::Bar;
use trendkelly_core::indicators::*;

/// Generate N bars of synthetic OHLCV data with realistic variation.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        // Deterministic pseudo-random walk using a simple LCG
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
        let change = ((seed % 200) as f64 - 100.0) * 0.05; // -5.0 to +5.0
        price += change;
        price = price.max(10.0);

        let open = price - 0.5;
        let close = price + 0.3;
        let high = open.max(close) + 2.0;
        let low = open.min(close) - 2.0;

        bars.push(Bar {
            symbol: "TEST".to_string(),
            timestamp: base + chrono::Duration::hours(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0 + i as f64 * 100.0,
        });
    }

    bars
}

/// Debug formatting prints NaN as "NaN", so equal strings mean bit-for-bit
/// equal outputs including warm-up.
fn assert_no_lookahead<I, F>(make: F, full_bars: &[Bar], truncated_len: usize)
where
    I: Indicator,
    I::Output: Debug,
    F: Fn() -> I,
{
    let mut full = make();
    let mut truncated = make();
    let name = full.name().to_string();

    let full_out: Vec<String> = full_bars
        .iter()
        .map(|b| format!("{:?}", full.update(b)))
        .collect();
    let truncated_out: Vec<String> = full_bars[..truncated_len]
        .iter()
        .map(|b| format!("{:?}", truncated.update(b)))
        .collect();

    for (i, (t, f)) in truncated_out.iter().zip(&full_out).enumerate() {
        assert_eq!(t, f, "{name}: look-ahead at bar {i}");
    }
}

#[test]
fn halftrend_no_lookahead() {
    let bars = make_test_bars(400);
    assert_no_lookahead(|| HalfTrend::new(2, 2.0), &bars, 200);
}

#[test]
fn atr_trailing_stop_no_lookahead() {
    let bars = make_test_bars(400);
    assert_no_lookahead(|| AtrTrailingStop::new(5, 3.5), &bars, 200);
}

#[test]
fn st_grab_no_lookahead() {
    let bars = make_test_bars(400);
    assert_no_lookahead(|| StGrab::new(34), &bars, 200);
}

#[test]
fn htf_ema_no_lookahead() {
    let bars = make_test_bars(400);
    assert_no_lookahead(|| HtfEma::new(21, 50, 200), &bars, 200);
}

#[test]
fn hull_suite_no_lookahead_all_modes() {
    let bars = make_test_bars(400);
    for mode in [HullMode::Hma, HullMode::Ehma, HullMode::Thma] {
        assert_no_lookahead(|| HullSuite::new(55, mode, PriceSource::Close), &bars, 200);
    }
}

#[test]
fn outputs_defined_after_lookback() {
    let bars = make_test_bars(400);

    let mut ht = HalfTrend::new(2, 2.0);
    let lb = ht.lookback();
    let outs: Vec<HalfTrendOutput> = bars.iter().map(|b| ht.update(b)).collect();
    assert!(outs[lb - 1].trend.is_none());
    assert!(outs[lb].trend.is_some());

    let mut hull = HullSuite::new(55, HullMode::Hma, PriceSource::Close);
    let lb = hull.lookback();
    let outs: Vec<HullOutput> = bars.iter().map(|b| hull.update(b)).collect();
    assert!(outs[lb - 1].value.is_nan());
    assert!(!outs[lb].value.is_nan());

    let mut ats = AtrTrailingStop::new(5, 3.5);
    let lb = ats.lookback();
    let outs: Vec<AtrStopOutput> = bars.iter().map(|b| ats.update(b)).collect();
    assert!(outs[lb - 1].stop.is_nan());
    assert!(!outs[lb].stop.is_nan());
}
