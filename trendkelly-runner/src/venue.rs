//! Simulated execution venue — a single-account cash broker.
//!
//! Orders accepted after a bar execute from the next bar of their symbol:
//!
//! - market close: fills at the open
//! - buy stop-entry: triggers when `high >= stop`, fills at `max(open, stop)`
//! - sell stop-exit: triggers when `low <= stop`, fills at `min(open, stop)`
//!
//! Gap-through fills take the open. An entry that costs more than the available
//! cash is rejected and dropped. Cancelling an unknown or finished order is a
//! no-op. Long-only: at most one position per symbol.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use trendkelly_core::domain::{Bar, Notification, OrderId, OrderIntent, TradeId};

/// How a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopExit,
    Market,
}

/// A completed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub trade_id: u64,
    pub symbol: String,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OrderKind {
    StopEntry { stop: f64, size: f64 },
    StopExit { stop: f64 },
}

#[derive(Debug, Clone)]
struct WorkingOrder {
    symbol: String,
    kind: OrderKind,
}

#[derive(Debug, Clone)]
struct Position {
    trade_id: TradeId,
    size: f64,
    entry_price: f64,
    entry_time: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct SimVenue {
    cash: f64,
    orders: BTreeMap<OrderId, WorkingOrder>,
    /// Symbols with a market close waiting for their next bar.
    market_closes: Vec<String>,
    positions: BTreeMap<String, Position>,
    last_close: BTreeMap<String, f64>,
    next_trade: u64,
    closed: Vec<ClosedTrade>,
    rejected: u64,
}

impl SimVenue {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            orders: BTreeMap::new(),
            market_closes: Vec::new(),
            positions: BTreeMap::new(),
            last_close: BTreeMap::new(),
            next_trade: 1,
            closed: Vec::new(),
            rejected: 0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Cash plus open positions marked at their last close.
    pub fn account_value(&self) -> f64 {
        self.cash
            + self
                .positions
                .iter()
                .map(|(symbol, p)| {
                    let mark = self.last_close.get(symbol).copied().unwrap_or(p.entry_price);
                    p.size * mark
                })
                .sum::<f64>()
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed
    }

    pub fn into_closed_trades(self) -> Vec<ClosedTrade> {
        self.closed
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn working_order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn rejected_orders(&self) -> u64 {
        self.rejected
    }

    /// Accept intents emitted after the current bar.
    pub fn submit(&mut self, intents: &[OrderIntent]) {
        for intent in intents {
            match intent {
                OrderIntent::SubmitStopEntry {
                    symbol,
                    order_id,
                    price,
                    size,
                } => {
                    self.orders.insert(
                        *order_id,
                        WorkingOrder {
                            symbol: symbol.clone(),
                            kind: OrderKind::StopEntry {
                                stop: *price,
                                size: *size,
                            },
                        },
                    );
                }
                OrderIntent::SubmitStopExit {
                    symbol,
                    order_id,
                    price,
                } => {
                    self.orders.insert(
                        *order_id,
                        WorkingOrder {
                            symbol: symbol.clone(),
                            kind: OrderKind::StopExit { stop: *price },
                        },
                    );
                }
                OrderIntent::Cancel { order_id, .. } => {
                    if self.orders.remove(order_id).is_some() {
                        debug!(%order_id, "order cancelled");
                    }
                }
                OrderIntent::CloseAtMarket { symbol } => {
                    if !self.market_closes.contains(symbol) {
                        self.market_closes.push(symbol.clone());
                    }
                }
            }
        }
    }

    /// Execute working orders against the next bar of `bar.symbol` and mark it.
    pub fn on_bar(&mut self, bar: &Bar) -> Vec<Notification> {
        let mut out = Vec::new();
        if bar.is_void() {
            return out;
        }
        let symbol = bar.symbol.as_str();

        if let Some(i) = self.market_closes.iter().position(|s| s == symbol) {
            self.market_closes.swap_remove(i);
            if let Some(n) = self.close_position(symbol, bar.open, bar.timestamp, ExitReason::Market) {
                out.push(n);
            }
        }

        let ids: Vec<OrderId> = self
            .orders
            .iter()
            .filter(|(_, o)| o.symbol == symbol)
            .map(|(id, _)| *id)
            .collect();

        for id in ids {
            let Some(kind) = self.orders.get(&id).map(|o| o.kind) else {
                continue;
            };
            match kind {
                OrderKind::StopEntry { stop, size } => {
                    if self.positions.contains_key(symbol) || bar.high < stop {
                        continue;
                    }
                    self.orders.remove(&id);
                    let price = bar.open.max(stop);
                    let cost = price * size;
                    if cost > self.cash {
                        self.rejected += 1;
                        warn!(symbol, order_id = %id, cost, cash = self.cash, "entry rejected: insufficient cash");
                        continue;
                    }
                    self.cash -= cost;
                    let trade_id = TradeId(self.next_trade);
                    self.next_trade += 1;
                    self.positions.insert(
                        symbol.to_string(),
                        Position {
                            trade_id,
                            size,
                            entry_price: price,
                            entry_time: bar.timestamp,
                        },
                    );
                    debug!(symbol, order_id = %id, %trade_id, price, size, "entry filled");
                    out.push(Notification::PositionOpened {
                        symbol: symbol.to_string(),
                        trade_id,
                        fill_price: price,
                        size,
                    });
                }
                OrderKind::StopExit { stop } => {
                    if !self.positions.contains_key(symbol) {
                        // Nothing left to protect.
                        self.orders.remove(&id);
                        continue;
                    }
                    if bar.low > stop {
                        continue;
                    }
                    self.orders.remove(&id);
                    let price = bar.open.min(stop);
                    if let Some(n) = self.close_position(symbol, price, bar.timestamp, ExitReason::StopExit) {
                        out.push(n);
                    }
                }
            }
        }

        self.last_close.insert(symbol.to_string(), bar.close);
        out
    }

    fn close_position(
        &mut self,
        symbol: &str,
        price: f64,
        at: NaiveDateTime,
        reason: ExitReason,
    ) -> Option<Notification> {
        let position = self.positions.remove(symbol)?;
        self.orders
            .retain(|_, o| !(o.symbol == symbol && matches!(o.kind, OrderKind::StopExit { .. })));
        self.cash += position.size * price;
        let pnl = position.size * (price - position.entry_price);
        debug!(symbol, trade_id = %position.trade_id, price, pnl, ?reason, "position closed");
        self.closed.push(ClosedTrade {
            trade_id: position.trade_id.0,
            symbol: symbol.to_string(),
            entry_time: position.entry_time,
            exit_time: at,
            entry_price: position.entry_price,
            exit_price: price,
            size: position.size,
            pnl,
            exit_reason: reason,
        });
        Some(Notification::PositionClosed {
            symbol: symbol.to_string(),
            trade_id: position.trade_id,
            realized_pnl: pnl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(hour: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            symbol: "SPY".into(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            open,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    fn entry(id: u64, price: f64, size: f64) -> OrderIntent {
        OrderIntent::SubmitStopEntry {
            symbol: "SPY".into(),
            order_id: OrderId(id),
            price,
            size,
        }
    }

    fn exit(id: u64, price: f64) -> OrderIntent {
        OrderIntent::SubmitStopExit {
            symbol: "SPY".into(),
            order_id: OrderId(id),
            price,
        }
    }

    #[test]
    fn stop_entry_waits_for_high_then_fills_at_stop() {
        let mut v = SimVenue::new(1_000.0);
        v.submit(&[entry(1, 105.0, 2.0)]);
        assert!(v.on_bar(&bar(1, 100.0, 104.0, 99.0, 103.0)).is_empty());
        let n = v.on_bar(&bar(2, 103.0, 106.0, 102.0, 104.0));
        assert_eq!(
            n,
            vec![Notification::PositionOpened {
                symbol: "SPY".into(),
                trade_id: TradeId(1),
                fill_price: 105.0,
                size: 2.0,
            }]
        );
        assert_eq!(v.cash(), 790.0);
        assert_eq!(v.account_value(), 790.0 + 2.0 * 104.0);
    }

    #[test]
    fn gap_up_entry_fills_at_open() {
        let mut v = SimVenue::new(1_000.0);
        v.submit(&[entry(1, 105.0, 1.0)]);
        let n = v.on_bar(&bar(1, 110.0, 112.0, 109.0, 111.0));
        assert!(matches!(n[0], Notification::PositionOpened { fill_price, .. } if fill_price == 110.0));
    }

    #[test]
    fn entry_beyond_cash_is_rejected() {
        let mut v = SimVenue::new(100.0);
        v.submit(&[entry(1, 105.0, 1.0)]);
        assert!(v.on_bar(&bar(1, 104.0, 106.0, 103.0, 105.0)).is_empty());
        assert_eq!(v.rejected_orders(), 1);
        assert_eq!(v.working_order_count(), 0);
        assert_eq!(v.cash(), 100.0);
    }

    #[test]
    fn stop_exit_fills_at_min_of_open_and_stop() {
        let mut v = SimVenue::new(1_000.0);
        v.submit(&[entry(1, 100.0, 1.0)]);
        v.on_bar(&bar(1, 100.0, 101.0, 99.0, 100.0));
        v.submit(&[exit(2, 95.0)]);
        assert!(v.on_bar(&bar(2, 100.0, 101.0, 96.0, 97.0)).is_empty());
        let n = v.on_bar(&bar(3, 93.0, 94.0, 90.0, 91.0));
        assert_eq!(
            n,
            vec![Notification::PositionClosed {
                symbol: "SPY".into(),
                trade_id: TradeId(1),
                realized_pnl: -7.0,
            }]
        );
        assert_eq!(v.cash(), 993.0);
        assert_eq!(v.closed_trades()[0].exit_reason, ExitReason::StopExit);
    }

    #[test]
    fn market_close_fills_at_next_open_and_drops_exit_orders() {
        let mut v = SimVenue::new(1_000.0);
        v.submit(&[entry(1, 100.0, 2.0)]);
        v.on_bar(&bar(1, 100.0, 101.0, 99.0, 100.0));
        v.submit(&[exit(2, 90.0), OrderIntent::CloseAtMarket { symbol: "SPY".into() }]);
        let n = v.on_bar(&bar(2, 104.0, 105.0, 80.0, 81.0));
        assert_eq!(n.len(), 1);
        assert!(matches!(n[0], Notification::PositionClosed { realized_pnl, .. } if realized_pnl == 8.0));
        assert_eq!(v.working_order_count(), 0);
        assert_eq!(v.open_position_count(), 0);
    }

    #[test]
    fn cancel_of_unknown_order_is_noop() {
        let mut v = SimVenue::new(1_000.0);
        v.submit(&[entry(1, 100.0, 1.0)]);
        v.submit(&[OrderIntent::Cancel {
            symbol: "SPY".into(),
            order_id: OrderId(99),
        }]);
        assert_eq!(v.working_order_count(), 1);
        v.submit(&[OrderIntent::Cancel {
            symbol: "SPY".into(),
            order_id: OrderId(1),
        }]);
        assert_eq!(v.working_order_count(), 0);
        assert!(v.on_bar(&bar(1, 100.0, 120.0, 99.0, 110.0)).is_empty());
    }

    #[test]
    fn other_symbols_bars_do_not_fill() {
        let mut v = SimVenue::new(1_000.0);
        v.submit(&[entry(1, 100.0, 1.0)]);
        let mut other = bar(1, 100.0, 120.0, 99.0, 110.0);
        other.symbol = "QQQ".into();
        assert!(v.on_bar(&other).is_empty());
        assert_eq!(v.working_order_count(), 1);
    }
}
