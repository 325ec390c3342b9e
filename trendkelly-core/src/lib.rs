//! TrendKelly Core — incremental indicators, signal combination, order lifecycle, Kelly sizing.
//!
//! This crate contains the deterministic heart of the strategy:
//! - Domain types (bars, correlation ids, order intents, venue notifications)
//! - Five stateful indicators stepped one bar at a time, each on its own timeframe
//! - Per-symbol signal combiner with bounded rolling windows
//! - Per-symbol order state machine (Idle → PendingEntry → Open → Idle)
//! - Run-wide Kelly statistics and sizer
//! - Strategy orchestrator dispatching bars and notifications per symbol
//!
//! No I/O, no wall clock, no randomness: the same bars and parameters always
//! produce the same intents.

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod params;
pub mod signals;
pub mod sizers;

pub use engine::Orchestrator;
pub use params::{ConfigError, ParamMap, ParamValue, RiskParams, StrategyParams};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything handed across threads is Send + Sync.
    ///
    /// Symbol aggregates are stepped on rayon workers; the runner may move the
    /// orchestrator onto a worker thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::OrderIntent>();
        require_sync::<domain::OrderIntent>();
        require_send::<domain::Notification>();
        require_sync::<domain::Notification>();
        require_send::<domain::OrderId>();
        require_sync::<domain::OrderId>();
        require_send::<domain::TradeId>();
        require_sync::<domain::TradeId>();

        // Indicators
        require_send::<indicators::HalfTrend>();
        require_sync::<indicators::HalfTrend>();
        require_send::<indicators::AtrTrailingStop>();
        require_sync::<indicators::AtrTrailingStop>();
        require_send::<indicators::StGrab>();
        require_sync::<indicators::StGrab>();
        require_send::<indicators::HtfEma>();
        require_sync::<indicators::HtfEma>();
        require_send::<indicators::HullSuite>();
        require_sync::<indicators::HullSuite>();

        // Engine types
        require_send::<engine::SymbolAggregate>();
        require_sync::<engine::SymbolAggregate>();
        require_send::<engine::Orchestrator>();
        require_sync::<engine::Orchestrator>();
        require_send::<sizers::KellyStats>();
        require_sync::<sizers::KellyStats>();
        require_send::<params::StrategyParams>();
        require_sync::<params::StrategyParams>();
    }

    /// Architecture contract: the combiner never sees order or account state.
    ///
    /// `evaluate` takes a bar and an indicator snapshot only. If someone adds a
    /// state-machine or cash parameter, this stops compiling.
    #[test]
    fn combiner_has_no_account_parameter() {
        fn _check(
            comb: &mut signals::SignalCombiner,
            bar: &domain::Bar,
            snap: &signals::IndicatorSnapshot,
        ) -> signals::SignalOutput {
            comb.evaluate(bar, snap)
        }
    }

    /// Architecture contract: sizing reads the stats through a shared borrow.
    #[test]
    fn sizer_reads_stats_immutably() {
        fn _check(sizer: &dyn sizers::Sizer, stats: &sizers::KellyStats) -> f64 {
            sizer.risk_fraction(stats)
        }
    }
}
