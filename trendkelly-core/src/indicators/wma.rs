//! Linearly Weighted Moving Average (WMA), stepped one value at a time.
//!
//! WMA[t] = sum(w_i * x_i) / sum(w_i) with weights 1..=period, newest value heaviest.
//! Lookback: period - 1.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Wma {
    period: usize,
    weight_sum: f64,
    window: VecDeque<f64>,
}

impl Wma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "WMA period must be >= 1");
        Self {
            period,
            weight_sum: (period * (period + 1)) as f64 / 2.0,
            window: VecDeque::with_capacity(period),
        }
    }

    pub fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    /// Push a value. NaN inputs yield NaN and are not admitted to the window.
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
        let weighted: f64 = self
            .window
            .iter()
            .enumerate()
            .map(|(i, v)| (i + 1) as f64 * v)
            .sum();
        weighted / self.weight_sum
    }
}
