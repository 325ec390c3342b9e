//! Bar sources and resampling

pub mod provider;
pub mod resample;

pub use provider::{validate_bars, BarSource, DataError, DataSource};
pub use resample::{compression, CalendarResampler, Resampler};
