//! Position Sizers — determine order quantity
//!
//! Sizers turn available cash and a reference price into a quantity, using
//! run-wide trade statistics. They never decide entry/exit.

pub mod kelly;

pub use kelly::{KellySizer, KellyStats};

/// Position sizing logic
///
/// # Responsibilities
/// - Convert closed-trade statistics into a risk fraction
/// - Convert cash + fraction + price into a quantity
///
/// # Non-Responsibilities
/// - Sizers do NOT decide entry/exit (that's the combiner's job)
/// - Sizers do NOT mutate statistics (the orchestrator owns them)
pub trait Sizer: Send + Sync {
    /// Fraction of available cash to commit to the next entry.
    fn risk_fraction(&self, stats: &KellyStats) -> f64;

    /// Quantity for an entry at `price`. Zero when price or cash is not positive.
    fn size(&self, stats: &KellyStats, cash: f64, price: f64) -> f64 {
        let tradable = price > 0.0 && cash > 0.0;
        if !tradable {
            return 0.0;
        }
        cash * self.risk_fraction(stats) / price
    }

    /// Sizer name for logging
    fn name(&self) -> &str;
}
