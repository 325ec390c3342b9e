//! ATR trailing stop — a stop line that ratchets with price and flips side on a cross.
//!
//! With `loss = multiplier * ATR` and the previous stop taken as 0 when undefined:
//!
//! ```text
//! candidate = close > prev_stop ? close - loss : close + loss
//! if close < prev_stop && prev_close < prev_stop: candidate = min(prev_stop, close + loss)
//! stop      = close > prev_stop && prev_close > prev_stop ? max(prev_stop, close - loss)
//!                                                         : candidate
//! ```
//!
//! Bias flips Long when the previous close was below the previous stop and the close is
//! above it, Short on the mirror cross, and is otherwise carried forward.
//! Lookback: period (ATR warm-up).

use serde::{Deserialize, Serialize};

use super::atr::Atr;
use super::Indicator;
use crate::domain::Bar;

/// Position bias derived from the most recent cross of the stop line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Bias {
    Long,
    Short,
    /// No cross observed yet.
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtrStopOutput {
    /// Trailing stop line; NaN during warm-up.
    pub stop: f64,
    pub bias: Bias,
    pub atr: f64,
}

#[derive(Debug, Clone)]
pub struct AtrTrailingStop {
    multiplier: f64,
    name: String,
    atr: Atr,
    prev_close: f64,
    prev_stop: f64,
    bias: Bias,
}

impl AtrTrailingStop {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "ATR trailing stop period must be >= 1");
        Self {
            multiplier,
            name: format!("atr_stop_{period}_{multiplier}"),
            atr: Atr::new(period),
            prev_close: f64::NAN,
            prev_stop: f64::NAN,
            bias: Bias::Neutral,
        }
    }
}

impl Indicator for AtrTrailingStop {
    type Output = AtrStopOutput;

    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.atr.lookback()
    }

    fn update(&mut self, bar: &Bar) -> AtrStopOutput {
        if bar.is_void() {
            return AtrStopOutput {
                stop: f64::NAN,
                bias: self.bias,
                atr: f64::NAN,
            };
        }

        let atr = self.atr.update(bar);
        let prev_close = self.prev_close;
        self.prev_close = bar.close;

        if atr.is_nan() || prev_close.is_nan() {
            return AtrStopOutput {
                stop: f64::NAN,
                bias: self.bias,
                atr,
            };
        }

        let close = bar.close;
        let loss = self.multiplier * atr;
        let prev_stop = if self.prev_stop.is_nan() {
            0.0
        } else {
            self.prev_stop
        };

        let mut candidate = if close > prev_stop {
            close - loss
        } else {
            close + loss
        };
        if close < prev_stop && prev_close < prev_stop {
            candidate = prev_stop.min(close + loss);
        }
        let stop = if close > prev_stop && prev_close > prev_stop {
            prev_stop.max(close - loss)
        } else {
            candidate
        };

        if prev_close < prev_stop && close > prev_stop {
            self.bias = Bias::Long;
        } else if prev_close > prev_stop && close < prev_stop {
            self.bias = Bias::Short;
        }

        self.prev_stop = stop;

        AtrStopOutput {
            stop,
            bias: self.bias,
            atr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn stop_undefined_during_atr_warmup() {
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        let mut ats = AtrTrailingStop::new(3, 2.0);
        for bar in &bars {
            let out = ats.update(bar);
            assert!(out.stop.is_nan());
            assert_eq!(out.bias, Bias::Neutral);
        }
    }

    #[test]
    fn first_defined_stop_trails_below_close() {
        // period 1: ATR = TR from the second bar on
        let bars = make_ohlc_bars(&[
            (100.0, 101.0, 99.0, 100.0),
            (100.0, 102.0, 99.0, 101.0), // TR = 3, loss = 6
        ]);
        let mut ats = AtrTrailingStop::new(1, 2.0);
        ats.update(&bars[0]);
        let out = ats.update(&bars[1]);
        // prev stop undefined → 0; close and prev close above 0 → max(0, 101 - 6) = 95
        assert_approx(out.stop, 95.0, DEFAULT_EPSILON);
        assert_eq!(out.bias, Bias::Neutral);
    }

    #[test]
    fn stop_ratchets_up_then_flips_short_on_cross() {
        let bars = make_ohlc_bars(&[
            (100.0, 101.0, 99.0, 100.0),
            (100.0, 102.0, 99.0, 101.0), // TR 3 → stop 95
            (101.0, 104.0, 101.0, 103.0), // TR 3 → stop max(95, 97) = 97
            (103.0, 104.0, 102.0, 102.5), // TR 2 → stop max(97, 98.5) = 98.5
            (98.0, 99.0, 90.0, 92.0),     // TR 12.5 → cross below 98.5
        ]);
        let mut ats = AtrTrailingStop::new(1, 2.0);
        let outs: Vec<AtrStopOutput> = bars.iter().map(|b| ats.update(b)).collect();
        assert_approx(outs[2].stop, 97.0, DEFAULT_EPSILON);
        assert_approx(outs[3].stop, 98.5, DEFAULT_EPSILON);
        // close 92 < 98.5 with prev close 102.5 above → candidate = close + loss = 117
        assert_approx(outs[4].stop, 92.0 + 25.0, DEFAULT_EPSILON);
        assert_eq!(outs[4].bias, Bias::Short);
    }

    #[test]
    fn short_stop_ratchets_down_and_flips_long() {
        let bars = make_ohlc_bars(&[
            (100.0, 101.0, 99.0, 100.0),
            (100.0, 102.0, 99.0, 101.0),  // stop 95
            (98.0, 99.0, 90.0, 92.0),     // TR 11 → cross below 95 → stop 92 + 22 = 114, Short
            (92.0, 93.0, 89.0, 90.0),     // TR 4 → min(114, 90 + 8) = 98
            (99.0, 120.0, 99.0, 119.0),   // TR 30 → cross above 98 → stop 119 - 60 = 59, Long
        ]);
        let mut ats = AtrTrailingStop::new(1, 2.0);
        let outs: Vec<AtrStopOutput> = bars.iter().map(|b| ats.update(b)).collect();
        assert_eq!(outs[2].bias, Bias::Short);
        assert_approx(outs[2].stop, 114.0, DEFAULT_EPSILON);
        assert_approx(outs[3].stop, 98.0, DEFAULT_EPSILON);
        assert_eq!(outs[3].bias, Bias::Short);
        assert_eq!(outs[4].bias, Bias::Long);
        assert_approx(outs[4].stop, 59.0, DEFAULT_EPSILON);
    }
}
