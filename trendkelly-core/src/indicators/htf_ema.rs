//! HtfEma — three independent EMAs of close on a higher timeframe.
//!
//! The combiner reads `ema_1 > ema_2 > ema_3` as an aligned uptrend.
//! Lookback: max(period) - 1.

use super::ema::Ema;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HtfEmaOutput {
    pub ema_1: f64,
    pub ema_2: f64,
    pub ema_3: f64,
}

impl HtfEmaOutput {
    /// Strict `ema_1 > ema_2 > ema_3`. False while any value is NaN.
    pub fn is_aligned_up(&self) -> bool {
        self.ema_1 > self.ema_2 && self.ema_2 > self.ema_3
    }
}

#[derive(Debug, Clone)]
pub struct HtfEma {
    name: String,
    emas: [Ema; 3],
}

impl HtfEma {
    pub fn new(period_1: usize, period_2: usize, period_3: usize) -> Self {
        Self {
            name: format!("htf_ema_{period_1}_{period_2}_{period_3}"),
            emas: [Ema::new(period_1), Ema::new(period_2), Ema::new(period_3)],
        }
    }
}

impl Indicator for HtfEma {
    type Output = HtfEmaOutput;

    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.emas.iter().map(Ema::lookback).max().unwrap_or(0)
    }

    fn update(&mut self, bar: &Bar) -> HtfEmaOutput {
        let close = if bar.is_void() { f64::NAN } else { bar.close };
        let [a, b, c] = &mut self.emas;
        HtfEmaOutput {
            ema_1: a.update(close),
            ema_2: b.update(close),
            ema_3: c.update(close),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn rising_series_aligns_once_slowest_is_warm() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let mut htf = HtfEma::new(3, 5, 10);
        assert_eq!(htf.lookback(), 9);
        let outs: Vec<HtfEmaOutput> = bars.iter().map(|b| htf.update(b)).collect();
        assert!(!outs[8].is_aligned_up(), "ema_3 still warming up");
        assert!(outs[39].is_aligned_up());
    }

    #[test]
    fn falling_series_is_not_aligned() {
        let closes: Vec<f64> = (0..40).map(|i| 200.0 - i as f64).collect();
        let bars = make_bars(&closes);
        let mut htf = HtfEma::new(3, 5, 10);
        let last = bars.iter().map(|b| htf.update(b)).last().unwrap();
        assert!(!last.is_aligned_up());
    }
}
