//! Strategy engine — per-symbol order state machines driven by combined signals.
//!
//! Per timestamp batch the orchestrator:
//!
//! 1. Steps each symbol's indicators (through their resamplers) and combiner
//! 2. Runs each symbol's state machine, sizing entries from the Kelly stats
//! 3. Returns order intents for the venue
//!
//! Venue notifications flow back through `Orchestrator::on_notification`.

pub mod orchestrator;
pub mod order_state;
pub mod symbol;

pub use orchestrator::Orchestrator;
pub use order_state::{NotificationOutcome, OrderState, OrderStateMachine, SizingContext};
pub use symbol::SymbolAggregate;
