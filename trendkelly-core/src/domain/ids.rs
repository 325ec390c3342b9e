//! Opaque correlation identifiers shared with the execution venue.
//!
//! The venue owns the order and trade objects; the core only ever holds these ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order ID, minted by the core when it emits a submit intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ord-{}", self.0)
    }
}

/// Trade ID, minted by the execution venue when a position opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trd-{}", self.0)
    }
}

/// Monotonic order-id generator. One per orchestrator, so ids are unique run-wide.
#[derive(Debug, Clone)]
pub struct IdGen {
    next_order: u64,
}

impl Default for IdGen {
    fn default() -> Self {
        Self { next_order: 1 }
    }
}

impl IdGen {
    pub fn next_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order);
        self.next_order += 1;
        id
    }
}
