//! StGrab — EMA band over highs and lows, used as a breakout-confirmation band.
//!
//! ema_high[t] = EMA(high, period), ema_low[t] = EMA(low, period).
//! Lookback: period - 1.

use super::ema::Ema;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StGrabOutput {
    pub ema_high: f64,
    pub ema_low: f64,
}

#[derive(Debug, Clone)]
pub struct StGrab {
    name: String,
    high: Ema,
    low: Ema,
}

impl StGrab {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "StGrab period must be >= 1");
        Self {
            name: format!("st_grab_{period}"),
            high: Ema::new(period),
            low: Ema::new(period),
        }
    }
}

impl Indicator for StGrab {
    type Output = StGrabOutput;

    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.high.lookback()
    }

    fn update(&mut self, bar: &Bar) -> StGrabOutput {
        if bar.is_void() {
            return StGrabOutput {
                ema_high: f64::NAN,
                ema_low: f64::NAN,
            };
        }
        StGrabOutput {
            ema_high: self.high.update(bar.high),
            ema_low: self.low.update(bar.low),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn band_is_ema_of_high_and_low() {
        // make_bars: high = max(open, close) + 1, low = min(open, close) - 1
        let bars = make_bars(&[10.0, 10.0, 10.0, 12.0]);
        let mut sg = StGrab::new(3);
        let outs: Vec<StGrabOutput> = bars.iter().map(|b| sg.update(b)).collect();
        assert!(outs[1].ema_high.is_nan());
        assert_approx(outs[2].ema_high, 11.0, DEFAULT_EPSILON);
        assert_approx(outs[2].ema_low, 9.0, DEFAULT_EPSILON);
        // alpha = 0.5: high 13 → 0.5 * 13 + 0.5 * 11 = 12; low 9 → 9
        assert_approx(outs[3].ema_high, 12.0, DEFAULT_EPSILON);
        assert_approx(outs[3].ema_low, 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn high_band_never_below_low_band() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let bars = make_bars(&closes);
        let mut sg = StGrab::new(34);
        for bar in &bars {
            let out = sg.update(bar);
            if !out.ema_high.is_nan() {
                assert!(out.ema_high >= out.ema_low);
            }
        }
    }
}
