//! Strategy orchestrator — one aggregate per symbol plus the run-wide Kelly stats.
//!
//! Bars arrive in timestamp batches. For a batch:
//!
//! 1. every symbol with a bar steps its indicators and combiner, in parallel
//!    (aggregates share nothing mutable)
//! 2. decisions run sequentially in symbol order, each sizing against the same
//!    read-only `KellyStats` snapshot
//!
//! Venue notifications are applied one at a time through `&mut self`, which is
//! the only place `KellyStats` changes.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::{Bar, IdGen, Notification, OrderIntent};
use crate::params::{ConfigError, ParamMap, RiskParams, StrategyParams};
use crate::sizers::{KellySizer, KellyStats, Sizer};

use super::order_state::{NotificationOutcome, OrderState, SizingContext};
use super::symbol::SymbolAggregate;

pub struct Orchestrator {
    symbols: BTreeMap<String, SymbolAggregate>,
    sizer: Box<dyn Sizer>,
    stats: KellyStats,
    ids: IdGen,
}

impl Orchestrator {
    pub fn new<S: AsRef<str>>(
        symbols: &[S],
        params: &StrategyParams,
        risk: RiskParams,
        base_minutes: u32,
    ) -> Self {
        let symbols = symbols
            .iter()
            .map(|s| {
                let s = s.as_ref().to_string();
                let agg = SymbolAggregate::new(s.clone(), params, base_minutes);
                (s, agg)
            })
            .collect();
        Self {
            symbols,
            sizer: Box::new(KellySizer::new(risk)),
            stats: KellyStats::new(),
            ids: IdGen::default(),
        }
    }

    /// Validate the flat parameter map first; fails before any state is built.
    pub fn from_map<S: AsRef<str>>(
        symbols: &[S],
        map: &ParamMap,
        risk: RiskParams,
        base_minutes: u32,
    ) -> Result<Self, ConfigError> {
        let params = StrategyParams::from_map(map)?;
        Ok(Self::new(symbols, &params, risk, base_minutes))
    }

    /// Replace the sizer (the default is Kelly).
    pub fn with_sizer(mut self, sizer: Box<dyn Sizer>) -> Self {
        self.sizer = sizer;
        self
    }

    /// Process one timestamp batch (at most one bar per symbol) and return the
    /// intents for the venue, grouped by symbol in symbol order.
    pub fn on_bars(&mut self, bars: &[Bar], cash: f64) -> Vec<OrderIntent> {
        let mut batch: BTreeMap<&str, &Bar> = BTreeMap::new();
        for bar in bars {
            if !self.symbols.contains_key(&bar.symbol) {
                warn!(symbol = %bar.symbol, "bar for unknown symbol ignored");
                continue;
            }
            if batch.insert(bar.symbol.as_str(), bar).is_some() {
                warn!(symbol = %bar.symbol, ts = %bar.timestamp, "duplicate bar in batch; keeping the later one");
            }
        }

        let mut work: Vec<(&mut SymbolAggregate, &Bar)> = self
            .symbols
            .iter_mut()
            .filter_map(|(symbol, agg)| batch.get(symbol.as_str()).map(|bar| (agg, *bar)))
            .collect();

        work.par_iter_mut().for_each(|(agg, bar)| {
            agg.step_signal(bar);
        });

        let sizing = SizingContext {
            sizer: self.sizer.as_ref(),
            stats: &self.stats,
            cash,
        };
        let mut intents = Vec::new();
        for (agg, _) in work.iter_mut() {
            intents.extend(agg.decide(sizing, &mut self.ids));
        }
        intents
    }

    /// Route a venue notification to its symbol and fold closes into the stats.
    pub fn on_notification(&mut self, notification: &Notification) -> NotificationOutcome {
        let symbol = notification.symbol();
        let Some(agg) = self.symbols.get_mut(symbol) else {
            warn!(symbol, "notification for unknown symbol ignored");
            return NotificationOutcome::Ignored;
        };
        let outcome = agg.on_notification(notification);
        if let NotificationOutcome::Closed { realized_pnl } = outcome {
            self.stats.record_close(realized_pnl);
            info!(
                symbol,
                realized_pnl,
                closed = self.stats.count_trades,
                win_rate = self.stats.win_rate(),
                "trade closed"
            );
        }
        outcome
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    pub fn state_of(&self, symbol: &str) -> Option<OrderState> {
        self.symbols.get(symbol).map(SymbolAggregate::state)
    }

    pub fn aggregate(&self, symbol: &str) -> Option<&SymbolAggregate> {
        self.symbols.get(symbol)
    }

    pub fn closed_trade_counts(&self) -> BTreeMap<String, u64> {
        self.symbols
            .iter()
            .map(|(s, agg)| (s.clone(), agg.closed_trades()))
            .collect()
    }

    pub fn total_closed_trades(&self) -> u64 {
        self.symbols.values().map(SymbolAggregate::closed_trades).sum()
    }

    pub fn kelly_stats(&self) -> &KellyStats {
        &self.stats
    }

    /// Current risk fraction for the next entry.
    pub fn risk_fraction(&self) -> f64 {
        self.sizer.risk_fraction(&self.stats)
    }
}
