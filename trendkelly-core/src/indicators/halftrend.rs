//! HalfTrend — amplitude-based trend follower with ratcheting support/resistance.
//!
//! Inherently sequential: the trend flag, the "next trend" staging flag, the
//! max-low/min-high extrema and the `up`/`down` lines all depend on the previous bar.
//!
//! Per bar, with `high_price`/`low_price` the highest high/lowest low over `amplitude`
//! bars and `high_ma`/`low_ma` the SMAs of high/low over `amplitude` bars:
//!
//! - staging down (`next_trend == Down`): `max_low = max(low_price, max_low)`; flip to
//!   Down when `high_ma < max_low` and close is below the previous bar's low.
//! - staging up: `min_high = min(high_price, min_high)`; confirm Up and stage Down when
//!   `low_ma > min_high` and close is above the previous bar's high.
//! - Up: on a flip `up = previous down`, else `up = max(max_low, previous up)`.
//! - Down: on a flip `down = previous up`, else `down = min(min_high, previous down)`.
//!
//! The channel half-width is `deviation * ATR(100) / 2`.
//! Lookback: max(ATR period, amplitude - 1).

use serde::{Deserialize, Serialize};

use super::atr::Atr;
use super::extrema::RollingExtremum;
use super::sma::Sma;
use super::Indicator;
use crate::domain::Bar;

/// ATR period used for the channel and arrow offsets.
pub const HALFTREND_ATR_PERIOD: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
}

/// One bar of HalfTrend output. All prices are NaN and `trend` is `None` during warm-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfTrendOutput {
    pub trend: Option<Trend>,
    /// True only on the bar where `trend` differs from the previous bar's trend.
    pub just_flipped: bool,
    /// Active line: `up` while trending up, `down` while trending down.
    pub line: f64,
    pub atr_high: f64,
    pub atr_low: f64,
    /// Arrow marker below the line on an up-flip bar.
    pub arrow_up: Option<f64>,
    /// Arrow marker above the line on a down-flip bar.
    pub arrow_down: Option<f64>,
}

impl HalfTrendOutput {
    pub fn warming_up() -> Self {
        Self {
            trend: None,
            just_flipped: false,
            line: f64::NAN,
            atr_high: f64::NAN,
            atr_low: f64::NAN,
            arrow_up: None,
            arrow_down: None,
        }
    }

    pub fn flipped_up(&self) -> bool {
        self.just_flipped && self.trend == Some(Trend::Up)
    }

    pub fn flipped_down(&self) -> bool {
        self.just_flipped && self.trend == Some(Trend::Down)
    }
}

/// Recurrence state carried between bars once the indicator is warm.
#[derive(Debug, Clone, Copy)]
struct State {
    trend: Trend,
    next_trend: Trend,
    max_low: f64,
    min_high: f64,
    up: f64,
    down: f64,
}

#[derive(Debug, Clone)]
pub struct HalfTrend {
    amplitude: usize,
    deviation: f64,
    name: String,
    atr: Atr,
    highest: RollingExtremum,
    lowest: RollingExtremum,
    high_ma: Sma,
    low_ma: Sma,
    prev_high: f64,
    prev_low: f64,
    state: Option<State>,
}

impl HalfTrend {
    pub fn new(amplitude: usize, deviation: f64) -> Self {
        assert!(amplitude >= 1, "HalfTrend amplitude must be >= 1");
        Self {
            amplitude,
            deviation,
            name: format!("halftrend_{amplitude}_{deviation}"),
            atr: Atr::new(HALFTREND_ATR_PERIOD),
            highest: RollingExtremum::highest(amplitude),
            lowest: RollingExtremum::lowest(amplitude),
            high_ma: Sma::new(amplitude),
            low_ma: Sma::new(amplitude),
            prev_high: f64::NAN,
            prev_low: f64::NAN,
            state: None,
        }
    }

    pub fn amplitude(&self) -> usize {
        self.amplitude
    }
}

/// `value` unless it is NaN, then `fallback`.
fn nz(value: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value
    }
}

impl Indicator for HalfTrend {
    type Output = HalfTrendOutput;

    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        HALFTREND_ATR_PERIOD.max(self.amplitude - 1)
    }

    fn update(&mut self, bar: &Bar) -> HalfTrendOutput {
        if bar.is_void() {
            return HalfTrendOutput::warming_up();
        }

        let atr2 = self.atr.update(bar) / 2.0;
        let high_price = self.highest.update(bar.high);
        let low_price = self.lowest.update(bar.low);
        let high_ma = self.high_ma.update(bar.high);
        let low_ma = self.low_ma.update(bar.low);

        let prev_high = nz(self.prev_high, bar.high);
        let prev_low = nz(self.prev_low, bar.low);
        self.prev_high = bar.high;
        self.prev_low = bar.low;

        if atr2.is_nan() || high_price.is_nan() || low_ma.is_nan() {
            return HalfTrendOutput::warming_up();
        }

        let (mut s, prev_trend) = match self.state {
            Some(s) => (s, Some(s.trend)),
            None => (
                State {
                    trend: Trend::Up,
                    next_trend: Trend::Up,
                    max_low: bar.low,
                    min_high: bar.high,
                    up: 0.0,
                    down: 0.0,
                },
                None,
            ),
        };
        let (prev_up, prev_down) = (s.up, s.down);

        if s.next_trend == Trend::Down {
            s.max_low = low_price.max(s.max_low);
            if high_ma < s.max_low && bar.close < prev_low {
                s.trend = Trend::Down;
                s.next_trend = Trend::Up;
                s.min_high = high_price;
            }
        } else {
            s.min_high = high_price.min(s.min_high);
            if low_ma > s.min_high && bar.close > prev_high {
                s.trend = Trend::Up;
                s.next_trend = Trend::Down;
                s.max_low = low_price;
            }
        }

        let just_flipped = prev_trend.is_some_and(|t| t != s.trend);
        let dev = self.deviation * atr2;
        let mut arrow_up = None;
        let mut arrow_down = None;

        let line = match s.trend {
            Trend::Up => {
                if just_flipped {
                    s.up = prev_down;
                    arrow_up = Some(s.up - atr2);
                } else {
                    s.up = s.max_low.max(prev_up);
                }
                s.up
            }
            Trend::Down => {
                if just_flipped {
                    s.down = prev_up;
                    arrow_down = Some(s.down + atr2);
                } else {
                    s.down = s.min_high.min(prev_down);
                }
                s.down
            }
        };

        self.state = Some(s);

        HalfTrendOutput {
            trend: Some(s.trend),
            just_flipped,
            line,
            atr_high: line + dev,
            atr_low: line - dev,
            arrow_up,
            arrow_down,
        }
    }
}
