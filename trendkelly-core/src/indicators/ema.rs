//! Exponential Moving Average (EMA), stepped one value at a time.
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1).
//! Seed: EMA[period-1] = SMA of the first `period` values.
//! Lookback: period - 1.

/// Incremental EMA over an arbitrary f64 series.
///
/// NaN inputs are skipped: they yield NaN and leave the recurrence untouched, so an
/// EMA chained behind another warming-up series starts seeding only once its input
/// becomes defined.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    seed_sum: f64,
    seed_count: usize,
    value: f64,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            seed_count: 0,
            value: f64::NAN,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    /// Current value (NaN until seeded).
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn update(&mut self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if self.seed_count < self.period {
            self.seed_sum += x;
            self.seed_count += 1;
            if self.seed_count == self.period {
                self.value = self.seed_sum / self.period as f64;
            }
            return self.value;
        }
        self.value = self.alpha * x + (1.0 - self.alpha) * self.value;
        self.value
    }
}
