//! Average True Range (ATR), stepped one bar at a time.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|); undefined on the
//! first bar (no previous close).
//! ATR uses Wilder smoothing (alpha = 1/period) seeded with the mean of the first
//! `period` true ranges.
//! Lookback: period.

use crate::domain::Bar;

/// True range of `bar` against the previous close.
pub fn true_range(bar: &Bar, prev_close: f64) -> f64 {
    if bar.high.is_nan() || bar.low.is_nan() || prev_close.is_nan() {
        return f64::NAN;
    }
    (bar.high - bar.low)
        .max((bar.high - prev_close).abs())
        .max((bar.low - prev_close).abs())
}

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: f64,
    seed_sum: f64,
    seed_count: usize,
    value: f64,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            prev_close: f64::NAN,
            seed_sum: 0.0,
            seed_count: 0,
            value: f64::NAN,
        }
    }

    pub fn lookback(&self) -> usize {
        self.period
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn update(&mut self, bar: &Bar) -> f64 {
        if bar.is_void() {
            return f64::NAN;
        }
        let tr = true_range(bar, self.prev_close);
        self.prev_close = bar.close;
        if tr.is_nan() {
            return self.value;
        }
        if self.seed_count < self.period {
            self.seed_sum += tr;
            self.seed_count += 1;
            if self.seed_count == self.period {
                self.value = self.seed_sum / self.period as f64;
            }
            return self.value;
        }
        let alpha = 1.0 / self.period as f64;
        self.value = alpha * tr + (1.0 - alpha) * self.value;
        self.value
    }
}
