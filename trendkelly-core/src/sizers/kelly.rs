//! Kelly criterion sizing.
//!
//! `kelly = round(W - (1 - W) / R, 2)` with `W = wins / closed` and
//! `R = avg_win / avg_loss`. The risk fraction is `kelly * max_capital_exposure_pct * 0.01`,
//! clamped at zero. Until `minimum_trade_count` trades have closed the default
//! fraction is used unconditionally.

use serde::{Deserialize, Serialize};

use super::Sizer;
use crate::params::RiskParams;

/// Run-wide closed-trade statistics. Single owner; never reset mid-run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KellyStats {
    pub count_trades: u64,
    pub count_wins: u64,
    pub count_losses: u64,
    pub count_zero_pnl: u64,
    /// Mean of winning P&L.
    pub avg_win: f64,
    /// Mean of losing P&L magnitudes (positive).
    pub avg_loss: f64,
}

impl KellyStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one realized P&L into the statistics.
    pub fn record_close(&mut self, pnl: f64) {
        self.count_trades += 1;
        if pnl > 0.0 {
            self.count_wins += 1;
            let n = self.count_wins as f64;
            self.avg_win = ((n - 1.0) * self.avg_win + pnl) / n;
        } else if pnl < 0.0 {
            self.count_losses += 1;
            let n = self.count_losses as f64;
            self.avg_loss = ((n - 1.0) * self.avg_loss + pnl.abs()) / n;
        } else {
            self.count_zero_pnl += 1;
        }
    }

    /// Win probability over all closed trades (0 when none closed).
    pub fn win_rate(&self) -> f64 {
        if self.count_trades == 0 {
            return 0.0;
        }
        self.count_wins as f64 / self.count_trades as f64
    }

    /// Unclamped Kelly fraction rounded to two decimals.
    ///
    /// With no losses the payoff ratio is unbounded and the fraction reduces to `W`.
    /// With no wins it is zero.
    pub fn kelly(&self) -> f64 {
        let w = self.win_rate();
        let raw = if self.count_wins == 0 {
            0.0
        } else if self.count_losses == 0 || self.avg_loss == 0.0 {
            w
        } else {
            let r = self.avg_win / self.avg_loss;
            w - (1.0 - w) / r
        };
        round2(raw)
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Kelly sizer reading a `KellyStats` snapshot.
#[derive(Debug, Clone)]
pub struct KellySizer {
    risk: RiskParams,
}

impl KellySizer {
    pub fn new(risk: RiskParams) -> Self {
        Self { risk }
    }

    pub fn risk(&self) -> &RiskParams {
        &self.risk
    }
}

impl Sizer for KellySizer {
    fn risk_fraction(&self, stats: &KellyStats) -> f64 {
        if stats.count_trades < self.risk.minimum_trade_count {
            return self.risk.default_risk_percent * 0.01;
        }
        let fraction = stats.kelly() * self.risk.max_capital_exposure_pct * 0.01;
        fraction.max(0.0)
    }

    fn name(&self) -> &str {
        "Kelly"
    }
}
