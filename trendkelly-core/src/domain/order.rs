//! Order intents emitted by the core and notifications returned by the venue.

use super::ids::{OrderId, TradeId};
use serde::{Deserialize, Serialize};

/// An instruction for the execution venue. Long-only: entries buy, exits sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderIntent {
    /// Buy `size` once price trades at or above `price`.
    SubmitStopEntry {
        symbol: String,
        order_id: OrderId,
        price: f64,
        size: f64,
    },
    /// Cancel an outstanding order. Unknown or finished ids are a no-op at the venue.
    Cancel { symbol: String, order_id: OrderId },
    /// Sell the whole open position once price trades at or below `price`.
    SubmitStopExit {
        symbol: String,
        order_id: OrderId,
        price: f64,
    },
    /// Close the whole open position at market.
    CloseAtMarket { symbol: String },
}

impl OrderIntent {
    pub fn symbol(&self) -> &str {
        match self {
            Self::SubmitStopEntry { symbol, .. }
            | Self::Cancel { symbol, .. }
            | Self::SubmitStopExit { symbol, .. }
            | Self::CloseAtMarket { symbol } => symbol,
        }
    }
}

/// Fill/trade events reported back by the venue, possibly several bars after the
/// intent that caused them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notification {
    PositionOpened {
        symbol: String,
        trade_id: TradeId,
        fill_price: f64,
        size: f64,
    },
    PositionClosed {
        symbol: String,
        trade_id: TradeId,
        realized_pnl: f64,
    },
}

impl Notification {
    pub fn symbol(&self) -> &str {
        match self {
            Self::PositionOpened { symbol, .. } | Self::PositionClosed { symbol, .. } => symbol,
        }
    }
}
