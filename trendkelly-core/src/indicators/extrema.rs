//! Rolling highest/lowest over the last `period` values (current value included).
//!
//! Lookback: period - 1.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremum {
    Highest,
    Lowest,
}

#[derive(Debug, Clone)]
pub struct RollingExtremum {
    period: usize,
    kind: Extremum,
    window: VecDeque<f64>,
}

impl RollingExtremum {
    pub fn highest(period: usize) -> Self {
        Self::new(period, Extremum::Highest)
    }

    pub fn lowest(period: usize) -> Self {
        Self::new(period, Extremum::Lowest)
    }

    fn new(period: usize, kind: Extremum) -> Self {
        assert!(period >= 1, "extremum period must be >= 1");
        Self {
            period,
            kind,
            window: VecDeque::with_capacity(period),
        }
    }

    pub fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    pub fn update(&mut self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if self.window.len() == self.period {
            self.window.pop_front();
        }
        self.window.push_back(x);
        if self.window.len() < self.period {
            return f64::NAN;
        }
        match self.kind {
            Extremum::Highest => self.window.iter().copied().fold(f64::MIN, f64::max),
            Extremum::Lowest => self.window.iter().copied().fold(f64::MAX, f64::min),
        }
    }
}
