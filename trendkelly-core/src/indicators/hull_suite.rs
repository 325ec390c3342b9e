//! Hull suite — Hull moving average family with a two-bar delayed copy.
//!
//! Modes, with `n = length`:
//! - HMA:  WMA(2·WMA(x, n/2) − WMA(x, n), ⌊√n⌋)
//! - EHMA: EMA(2·EMA(x, n/2) − EMA(x, n), ⌊√n⌋)
//! - THMA: with l = n/2, WMA(3·WMA(x, l/3) − WMA(x, l/2) − WMA(x, l), l)
//!
//! Integer divisions truncate and every sub-window is at least 1.
//! `delayed` is the live value two bars earlier; the combiner compares the two to
//! read the slope.
//! Lookback: slowest inner window - 1 + smoothing window - 1.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ema::Ema;
use super::wma::Wma;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HullMode {
    #[default]
    Hma,
    Ehma,
    Thma,
}

impl HullMode {
    /// Case-insensitive parse of "hma", "ehma" or "thma".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hma" => Some(Self::Hma),
            "ehma" => Some(Self::Ehma),
            "thma" => Some(Self::Thma),
            _ => None,
        }
    }
}

impl fmt::Display for HullMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Hma => "hma",
            Self::Ehma => "ehma",
            Self::Thma => "thma",
        };
        f.write_str(s)
    }
}

/// Bar field fed into the Hull average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
}

impl PriceSource {
    /// Case-insensitive parse of "open", "high", "low" or "close".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "high" => Some(Self::High),
            "low" => Some(Self::Low),
            "close" => Some(Self::Close),
            _ => None,
        }
    }

    pub fn pick(&self, bar: &Bar) -> f64 {
        match self {
            Self::Open => bar.open,
            Self::High => bar.high,
            Self::Low => bar.low,
            Self::Close => bar.close,
        }
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
        };
        f.write_str(s)
    }
}

/// Mode-specific averaging pipeline, chosen once at construction.
#[derive(Debug, Clone)]
enum Kernel {
    Hma { half: Wma, full: Wma, smooth: Wma },
    Ehma { half: Ema, full: Ema, smooth: Ema },
    Thma { third: Wma, half: Wma, full: Wma, smooth: Wma },
}

impl Kernel {
    fn new(mode: HullMode, length: usize) -> Self {
        let half = (length / 2).max(1);
        let root = ((length as f64).sqrt().floor() as usize).max(1);
        match mode {
            HullMode::Hma => Kernel::Hma {
                half: Wma::new(half),
                full: Wma::new(length),
                smooth: Wma::new(root),
            },
            // EHMA averages the configured source too, not a fixed close.
            HullMode::Ehma => Kernel::Ehma {
                half: Ema::new(half),
                full: Ema::new(length),
                smooth: Ema::new(root),
            },
            HullMode::Thma => {
                let l = half;
                Kernel::Thma {
                    third: Wma::new((l / 3).max(1)),
                    half: Wma::new((l / 2).max(1)),
                    full: Wma::new(l),
                    smooth: Wma::new(l),
                }
            }
        }
    }

    fn lookback(&self) -> usize {
        match self {
            Kernel::Hma { full, smooth, .. } => full.lookback() + smooth.lookback(),
            Kernel::Ehma { full, smooth, .. } => full.lookback() + smooth.lookback(),
            Kernel::Thma { full, smooth, .. } => full.lookback() + smooth.lookback(),
        }
    }

    fn update(&mut self, x: f64) -> f64 {
        // NaN raw values are skipped by the smoothing stage.
        match self {
            Kernel::Hma { half, full, smooth } => {
                let raw = 2.0 * half.update(x) - full.update(x);
                smooth.update(raw)
            }
            Kernel::Ehma { half, full, smooth } => {
                let raw = 2.0 * half.update(x) - full.update(x);
                smooth.update(raw)
            }
            Kernel::Thma {
                third,
                half,
                full,
                smooth,
            } => {
                let raw = 3.0 * third.update(x) - half.update(x) - full.update(x);
                smooth.update(raw)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HullOutput {
    pub value: f64,
    /// `value` from two bars ago.
    pub delayed: f64,
}

impl HullOutput {
    /// Live value above its two-bar-delayed copy. False while either is NaN.
    pub fn is_rising(&self) -> bool {
        self.value > self.delayed
    }
}

#[derive(Debug, Clone)]
pub struct HullSuite {
    source: PriceSource,
    name: String,
    kernel: Kernel,
    /// Last two live values, most recent first.
    history: [f64; 2],
}

impl HullSuite {
    pub fn new(length: usize, mode: HullMode, source: PriceSource) -> Self {
        assert!(length >= 1, "Hull length must be >= 1");
        Self {
            source,
            name: format!("hull_{mode}_{length}"),
            kernel: Kernel::new(mode, length),
            history: [f64::NAN; 2],
        }
    }
}

impl Indicator for HullSuite {
    type Output = HullOutput;

    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.kernel.lookback()
    }

    fn update(&mut self, bar: &Bar) -> HullOutput {
        let x = if bar.is_void() {
            f64::NAN
        } else {
            self.source.pick(bar)
        };
        let value = self.kernel.update(x);
        let delayed = self.history[1];
        self.history = [value, self.history[0]];
        HullOutput { value, delayed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    const EPS: f64 = 1e-9;

    fn linear(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn hma_tracks_linear_series_without_lag() {
        let bars = make_bars(&linear(20));
        let mut hull = HullSuite::new(4, HullMode::Hma, PriceSource::Close);
        assert_eq!(hull.lookback(), 4);
        let outs: Vec<HullOutput> = bars.iter().map(|b| hull.update(b)).collect();
        assert!(outs[3].value.is_nan());
        for (i, out) in outs.iter().enumerate().skip(4) {
            assert_approx(out.value, i as f64, EPS);
        }
    }

    #[test]
    fn delayed_is_value_two_bars_back() {
        let bars = make_bars(&linear(20));
        let mut hull = HullSuite::new(4, HullMode::Hma, PriceSource::Close);
        let outs: Vec<HullOutput> = bars.iter().map(|b| hull.update(b)).collect();
        assert!(outs[5].delayed.is_nan());
        for i in 6..outs.len() {
            assert_eq!(outs[i].delayed.to_bits(), outs[i - 2].value.to_bits());
            assert!(outs[i].is_rising());
        }
    }

    #[test]
    fn thma_on_linear_series() {
        // l = 6, sub-windows 2/3/6: WMA lag is (p - 1) / 3, so output = t - 1/3
        let bars = make_bars(&linear(30));
        let mut hull = HullSuite::new(12, HullMode::Thma, PriceSource::Close);
        assert_eq!(hull.lookback(), 10);
        let outs: Vec<HullOutput> = bars.iter().map(|b| hull.update(b)).collect();
        assert!(outs[9].value.is_nan());
        for (i, out) in outs.iter().enumerate().skip(10) {
            assert_approx(out.value, i as f64 - 1.0 / 3.0, EPS);
        }
    }

    #[test]
    fn ehma_constant_input_returns_constant() {
        let bars = make_bars(&[50.0; 40]);
        let mut hull = HullSuite::new(9, HullMode::Ehma, PriceSource::Close);
        let last = bars.iter().map(|b| hull.update(b)).last().unwrap();
        assert_approx(last.value, 50.0, EPS);
        assert!(!last.is_rising());
    }

    #[test]
    fn source_selects_bar_field() {
        let bars = make_bars(&[10.0; 10]);
        let mut hull = HullSuite::new(1, HullMode::Hma, PriceSource::High);
        let out = hull.update(&bars[0]);
        assert_approx(out.value, 11.0, EPS);
    }

    #[test]
    fn ehma_reads_configured_source() {
        let bars = make_bars(&[10.0; 10]);
        let mut hull = HullSuite::new(1, HullMode::Ehma, PriceSource::Low);
        let out = hull.update(&bars[0]);
        assert_approx(out.value, 9.0, EPS);
    }

    #[test]
    fn mode_and_source_parse_case_insensitive() {
        assert_eq!(HullMode::parse("HMA"), Some(HullMode::Hma));
        assert_eq!(HullMode::parse("Thma"), Some(HullMode::Thma));
        assert_eq!(HullMode::parse("sma"), None);
        assert_eq!(PriceSource::parse("Close"), Some(PriceSource::Close));
        assert_eq!(PriceSource::parse("vwap"), None);
    }
}
