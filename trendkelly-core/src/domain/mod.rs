//! Domain types for TrendKelly

pub mod bar;
pub mod ids;
pub mod order;

pub use bar::Bar;
pub use ids::{IdGen, OrderId, TradeId};
pub use order::{Notification, OrderIntent};
