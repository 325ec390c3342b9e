//! Simple Moving Average (SMA), stepped one value at a time.
//!
//! SMA[t] = mean(x[t-period+1..=t]). Lookback: period - 1.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
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
        // Summed fresh each bar so the result never drifts from the window contents.
        self.window.iter().sum::<f64>() / self.period as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sma_3_known_values() {
        let mut sma = Sma::new(3);
        assert!(sma.update(1.0).is_nan());
        assert!(sma.update(2.0).is_nan());
        assert_approx(sma.update(3.0), 2.0, DEFAULT_EPSILON);
        assert_approx(sma.update(7.0), 4.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_lookback() {
        assert_eq!(Sma::new(2).lookback(), 1);
    }
}
