//! Per-symbol order lifecycle — Idle → PendingEntry → Open → Idle.
//!
//! The machine holds only correlation ids; the venue owns the actual orders and
//! trades. Transitions are driven by two inputs:
//!
//! - `on_signal`, once per base bar, with the combiner output
//! - `on_notification`, whenever the venue reports an open or a close
//!
//! Invariant: a symbol never holds a pending entry and an open trade at once, and
//! an exit order id exists only while Open.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{IdGen, Notification, OrderId, OrderIntent, TradeId};
use crate::signals::SignalOutput;
use crate::sizers::{KellyStats, Sizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderState {
    #[default]
    Idle,
    /// Stop-entry order outstanding, no position yet.
    PendingEntry { entry: OrderId },
    /// Position open, optionally protected by a stop-exit order.
    Open {
        trade: TradeId,
        exit: Option<OrderId>,
    },
    /// Market close requested, waiting for the venue to report the close.
    PendingExitUpdate { trade: TradeId },
}

impl OrderState {
    pub fn pending_entry(&self) -> Option<OrderId> {
        match self {
            Self::PendingEntry { entry } => Some(*entry),
            _ => None,
        }
    }

    pub fn open_trade(&self) -> Option<TradeId> {
        match self {
            Self::Open { trade, .. } | Self::PendingExitUpdate { trade } => Some(*trade),
            _ => None,
        }
    }

    pub fn exit_order(&self) -> Option<OrderId> {
        match self {
            Self::Open { exit, .. } => *exit,
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Read-only sizing inputs for one decision: a consistent stats snapshot and the
/// cash available at that moment.
#[derive(Clone, Copy)]
pub struct SizingContext<'a> {
    pub sizer: &'a dyn Sizer,
    pub stats: &'a KellyStats,
    pub cash: f64,
}

/// What a notification did to the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotificationOutcome {
    Opened,
    /// Accepted close; the caller folds `realized_pnl` into the run-wide stats.
    Closed { realized_pnl: f64 },
    /// Out-of-order or unexpected; logged and dropped.
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct OrderStateMachine {
    state: OrderState,
    closed_trades: u64,
}

impl OrderStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn closed_trades(&self) -> u64 {
        self.closed_trades
    }

    /// Per-bar decision. Returns the intents to send to the venue, in order.
    pub fn on_signal(
        &mut self,
        symbol: &str,
        signal: &SignalOutput,
        sizing: SizingContext<'_>,
        ids: &mut IdGen,
    ) -> Vec<OrderIntent> {
        let mut intents = Vec::new();
        match self.state {
            OrderState::Idle => {
                if !signal.entry_trigger {
                    return intents;
                }
                let price = signal.entry_price;
                let size = sizing.sizer.size(sizing.stats, sizing.cash, price);
                if !size.is_finite() || size <= 0.0 {
                    debug!(symbol, price, size, "entry trigger skipped: non-positive size");
                    return intents;
                }
                let order_id = ids.next_order_id();
                debug!(symbol, %order_id, price, size, "submit stop entry");
                intents.push(OrderIntent::SubmitStopEntry {
                    symbol: symbol.to_string(),
                    order_id,
                    price,
                    size,
                });
                self.state = OrderState::PendingEntry { entry: order_id };
            }
            OrderState::PendingEntry { entry } => {
                if signal.cancel_trigger {
                    debug!(symbol, order_id = %entry, "cancel pending entry");
                    intents.push(OrderIntent::Cancel {
                        symbol: symbol.to_string(),
                        order_id: entry,
                    });
                    self.state = OrderState::Idle;
                }
            }
            OrderState::Open { trade, exit } => {
                if let Some(order_id) = exit {
                    intents.push(OrderIntent::Cancel {
                        symbol: symbol.to_string(),
                        order_id,
                    });
                }
                if signal.exit_now {
                    debug!(symbol, %trade, "close at market on short bias");
                    intents.push(OrderIntent::CloseAtMarket {
                        symbol: symbol.to_string(),
                    });
                    self.state = OrderState::PendingExitUpdate { trade };
                } else if signal.exit_stop_price.is_finite() {
                    let order_id = ids.next_order_id();
                    intents.push(OrderIntent::SubmitStopExit {
                        symbol: symbol.to_string(),
                        order_id,
                        price: signal.exit_stop_price,
                    });
                    self.state = OrderState::Open {
                        trade,
                        exit: Some(order_id),
                    };
                } else {
                    self.state = OrderState::Open { trade, exit: None };
                }
            }
            OrderState::PendingExitUpdate { .. } => {}
        }
        intents
    }

    pub fn on_notification(&mut self, notification: &Notification) -> NotificationOutcome {
        match *notification {
            Notification::PositionOpened {
                ref symbol,
                trade_id,
                fill_price,
                size,
            } => match self.state {
                OrderState::PendingEntry { .. } | OrderState::Idle => {
                    if self.state.is_idle() {
                        warn!(symbol = %symbol, %trade_id, "entry filled after cancel; adopting position");
                    }
                    debug!(symbol = %symbol, %trade_id, fill_price, size, "position opened");
                    self.state = OrderState::Open {
                        trade: trade_id,
                        exit: None,
                    };
                    NotificationOutcome::Opened
                }
                state => {
                    warn!(symbol = %symbol, %trade_id, ?state, "unexpected position-opened notification ignored");
                    NotificationOutcome::Ignored
                }
            },
            Notification::PositionClosed {
                ref symbol,
                trade_id,
                realized_pnl,
            } => match self.state {
                OrderState::Open { trade, .. } | OrderState::PendingExitUpdate { trade } => {
                    if trade != trade_id {
                        warn!(symbol = %symbol, expected = %trade, got = %trade_id, "close for a different trade ignored");
                        return NotificationOutcome::Ignored;
                    }
                    debug!(symbol = %symbol, %trade_id, realized_pnl, "position closed");
                    self.state = OrderState::Idle;
                    self.closed_trades += 1;
                    NotificationOutcome::Closed { realized_pnl }
                }
                state => {
                    warn!(symbol = %symbol, %trade_id, ?state, "close notification without an open position ignored");
                    NotificationOutcome::Ignored
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RiskParams;
    use crate::signals::Conditions;
    use crate::sizers::KellySizer;

    fn signal() -> SignalOutput {
        SignalOutput {
            entry_trigger: false,
            cancel_trigger: false,
            exit_stop_price: f64::NAN,
            exit_now: false,
            entry_price: 50.0,
            conditions: Conditions::default(),
        }
    }

    fn entry() -> SignalOutput {
        SignalOutput {
            entry_trigger: true,
            ..signal()
        }
    }

    struct Fixture {
        sizer: KellySizer,
        stats: KellyStats,
        ids: IdGen,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                sizer: KellySizer::new(RiskParams::default()),
                stats: KellyStats::new(),
                ids: IdGen::default(),
            }
        }

        fn step(&mut self, sm: &mut OrderStateMachine, s: &SignalOutput) -> Vec<OrderIntent> {
            let ctx = SizingContext {
                sizer: &self.sizer,
                stats: &self.stats,
                cash: 100_000.0,
            };
            sm.on_signal("AAPL", s, ctx, &mut self.ids)
        }
    }

    fn opened(trade: u64) -> Notification {
        Notification::PositionOpened {
            symbol: "AAPL".into(),
            trade_id: TradeId(trade),
            fill_price: 50.0,
            size: 20.0,
        }
    }

    fn closed(trade: u64, pnl: f64) -> Notification {
        Notification::PositionClosed {
            symbol: "AAPL".into(),
            trade_id: TradeId(trade),
            realized_pnl: pnl,
        }
    }

    #[test]
    fn entry_trigger_submits_sized_stop_entry() {
        let mut fx = Fixture::new();
        let mut sm = OrderStateMachine::new();
        let intents = fx.step(&mut sm, &entry());
        // default 1% of 100_000 at 50
        assert_eq!(
            intents,
            vec![OrderIntent::SubmitStopEntry {
                symbol: "AAPL".into(),
                order_id: OrderId(1),
                price: 50.0,
                size: 20.0,
            }]
        );
        assert_eq!(sm.state(), OrderState::PendingEntry { entry: OrderId(1) });
    }

    #[test]
    fn repeated_entry_trigger_while_pending_is_ignored() {
        let mut fx = Fixture::new();
        let mut sm = OrderStateMachine::new();
        fx.step(&mut sm, &entry());
        assert!(fx.step(&mut sm, &entry()).is_empty());
    }

    #[test]
    fn cancel_trigger_cancels_pending_entry() {
        let mut fx = Fixture::new();
        let mut sm = OrderStateMachine::new();
        fx.step(&mut sm, &entry());
        let cancel = SignalOutput {
            cancel_trigger: true,
            ..signal()
        };
        let intents = fx.step(&mut sm, &cancel);
        assert_eq!(
            intents,
            vec![OrderIntent::Cancel {
                symbol: "AAPL".into(),
                order_id: OrderId(1)
            }]
        );
        assert!(sm.state().is_idle());
    }

    #[test]
    fn open_position_rearms_protective_stop_every_bar() {
        let mut fx = Fixture::new();
        let mut sm = OrderStateMachine::new();
        fx.step(&mut sm, &entry());
        assert_eq!(sm.on_notification(&opened(7)), NotificationOutcome::Opened);
        assert_eq!(sm.state().pending_entry(), None);

        let protect = SignalOutput {
            exit_stop_price: 48.0,
            ..signal()
        };
        let first = fx.step(&mut sm, &protect);
        assert_eq!(
            first,
            vec![OrderIntent::SubmitStopExit {
                symbol: "AAPL".into(),
                order_id: OrderId(2),
                price: 48.0
            }]
        );
        let second = fx.step(&mut sm, &protect);
        assert_eq!(second.len(), 2);
        assert_eq!(
            second[0],
            OrderIntent::Cancel {
                symbol: "AAPL".into(),
                order_id: OrderId(2)
            }
        );
        assert_eq!(sm.state().exit_order(), Some(OrderId(3)));
    }

    #[test]
    fn exit_now_closes_at_market_without_rearming() {
        let mut fx = Fixture::new();
        let mut sm = OrderStateMachine::new();
        fx.step(&mut sm, &entry());
        sm.on_notification(&opened(7));
        fx.step(
            &mut sm,
            &SignalOutput {
                exit_stop_price: 48.0,
                ..signal()
            },
        );
        let intents = fx.step(
            &mut sm,
            &SignalOutput {
                exit_now: true,
                exit_stop_price: 48.0,
                ..signal()
            },
        );
        assert!(matches!(intents[0], OrderIntent::Cancel { .. }));
        assert_eq!(
            intents[1],
            OrderIntent::CloseAtMarket {
                symbol: "AAPL".into()
            }
        );
        assert_eq!(intents.len(), 2);
        assert_eq!(sm.state(), OrderState::PendingExitUpdate { trade: TradeId(7) });
        assert_eq!(sm.state().exit_order(), None);

        assert_eq!(
            sm.on_notification(&closed(7, -12.5)),
            NotificationOutcome::Closed { realized_pnl: -12.5 }
        );
        assert!(sm.state().is_idle());
        assert_eq!(sm.closed_trades(), 1);
    }

    #[test]
    fn close_while_idle_is_ignored() {
        let mut sm = OrderStateMachine::new();
        assert_eq!(sm.on_notification(&closed(1, 10.0)), NotificationOutcome::Ignored);
        assert!(sm.state().is_idle());
        assert_eq!(sm.closed_trades(), 0);
    }

    #[test]
    fn close_while_pending_entry_is_ignored() {
        let mut fx = Fixture::new();
        let mut sm = OrderStateMachine::new();
        fx.step(&mut sm, &entry());
        assert_eq!(sm.on_notification(&closed(1, 10.0)), NotificationOutcome::Ignored);
        assert_eq!(sm.state().pending_entry(), Some(OrderId(1)));
    }

    #[test]
    fn fill_after_cancel_is_adopted() {
        let mut fx = Fixture::new();
        let mut sm = OrderStateMachine::new();
        fx.step(&mut sm, &entry());
        fx.step(
            &mut sm,
            &SignalOutput {
                cancel_trigger: true,
                ..signal()
            },
        );
        assert_eq!(sm.on_notification(&opened(3)), NotificationOutcome::Opened);
        assert_eq!(sm.state().open_trade(), Some(TradeId(3)));
    }

    #[test]
    fn zero_size_skips_entry() {
        let mut fx = Fixture::new();
        // 10 losing trades push the Kelly fraction below zero → clamped to 0
        for _ in 0..10 {
            fx.stats.record_close(-5.0);
        }
        let mut sm = OrderStateMachine::new();
        assert!(fx.step(&mut sm, &entry()).is_empty());
        assert!(sm.state().is_idle());
    }
}
