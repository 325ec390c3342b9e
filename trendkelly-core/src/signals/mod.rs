//! Signal combination — per-symbol boolean conditions derived from indicator outputs.
//!
//! Signals never see order or account state. They answer "should we be arming an
//! entry, cancelling one, or protecting a position" purely from market data.

pub mod combiner;
pub mod window;

pub use combiner::{Conditions, IndicatorSnapshot, SignalCombiner, SignalOutput, PROTECTIVE_OFFSET};
pub use window::{EdgeWindow, RollingAny, HULL_WINDOW_CAPACITY};
