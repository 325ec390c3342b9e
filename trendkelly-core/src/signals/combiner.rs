//! Signal combiner — folds one bar of indicator outputs into trade conditions.
//!
//! One combiner per symbol. It owns the two rolling windows and the carried
//! protective stop level; everything else is read from the indicator snapshot.
//! NaN comparisons evaluate to false, so warm-up never raises a condition.

use serde::{Deserialize, Serialize};

use super::window::{EdgeWindow, RollingAny, HULL_WINDOW_CAPACITY};
use crate::domain::Bar;
use crate::indicators::{AtrStopOutput, Bias, HalfTrendOutput, HtfEmaOutput, HullOutput, StGrabOutput};

/// Protective stop offset below the trailing-stop line, as a fraction (0.45%).
pub const PROTECTIVE_OFFSET: f64 = 0.0045;

/// Latest output of each indicator as seen from one base-resolution bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub halftrend: HalfTrendOutput,
    pub stop: AtrStopOutput,
    pub st_grab: StGrabOutput,
    pub htf_ema: HtfEmaOutput,
    pub hull: HullOutput,
}

impl IndicatorSnapshot {
    /// All outputs undefined.
    pub fn warming_up() -> Self {
        Self {
            halftrend: HalfTrendOutput::warming_up(),
            stop: AtrStopOutput {
                stop: f64::NAN,
                bias: Bias::Neutral,
                atr: f64::NAN,
            },
            st_grab: StGrabOutput {
                ema_high: f64::NAN,
                ema_low: f64::NAN,
            },
            htf_ema: HtfEmaOutput {
                ema_1: f64::NAN,
                ema_2: f64::NAN,
                ema_3: f64::NAN,
            },
            hull: HullOutput {
                value: f64::NAN,
                delayed: f64::NAN,
            },
        }
    }
}

/// Individual conditions evaluated on a bar, kept for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    pub above_band: bool,
    pub trend_aligned: bool,
    pub hull_long_now: bool,
    pub hull_recent_long: bool,
    pub flipped_up: bool,
    pub flipped_down: bool,
    pub bias_short: bool,
    pub touched_stop: bool,
    pub stop_touch_edge: bool,
}

impl Conditions {
    pub fn cancel(&self) -> bool {
        self.flipped_down || self.bias_short || !self.hull_recent_long || !self.trend_aligned
    }
}

/// What the order state machine consumes for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalOutput {
    pub entry_trigger: bool,
    pub cancel_trigger: bool,
    /// Carried protective level; NaN until the first rising edge on the stop line.
    pub exit_stop_price: f64,
    pub exit_now: bool,
    /// Price for a stop-entry order and for sizing (the bar's high).
    pub entry_price: f64,
    pub conditions: Conditions,
}

#[derive(Debug, Clone)]
pub struct SignalCombiner {
    hull_window: RollingAny,
    touch_window: EdgeWindow,
    protective: f64,
}

impl Default for SignalCombiner {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalCombiner {
    pub fn new() -> Self {
        Self {
            hull_window: RollingAny::new(HULL_WINDOW_CAPACITY),
            touch_window: EdgeWindow::new(),
            protective: f64::NAN,
        }
    }

    pub fn protective_level(&self) -> f64 {
        self.protective
    }

    pub fn hull_window(&self) -> &RollingAny {
        &self.hull_window
    }

    pub fn evaluate(&mut self, bar: &Bar, snap: &IndicatorSnapshot) -> SignalOutput {
        let above_band = bar.close > snap.st_grab.ema_high;
        let trend_aligned = snap.htf_ema.is_aligned_up();

        let hull_long_now = snap.hull.is_rising();
        self.hull_window.push(hull_long_now);
        let hull_recent_long = self.hull_window.any();

        let flipped_up = snap.halftrend.flipped_up();
        let flipped_down = snap.halftrend.flipped_down();
        let bias_short = snap.stop.bias == Bias::Short;

        let line = snap.stop.stop;
        let touched_stop = bar.high >= line && line >= bar.low;
        let stop_touch_edge = self.touch_window.push(touched_stop);
        if stop_touch_edge {
            self.protective = line - PROTECTIVE_OFFSET * line;
        }

        let conditions = Conditions {
            above_band,
            trend_aligned,
            hull_long_now,
            hull_recent_long,
            flipped_up,
            flipped_down,
            bias_short,
            touched_stop,
            stop_touch_edge,
        };
        let cancel = conditions.cancel();

        SignalOutput {
            entry_trigger: flipped_up && above_band && !cancel,
            cancel_trigger: cancel,
            exit_stop_price: self.protective,
            exit_now: bias_short,
            entry_price: bar.high,
            conditions,
        }
    }
}
