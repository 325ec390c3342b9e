//! Per-symbol aggregate — the five indicators on their own timeframes, the
//! combiner and the order state machine for one symbol.
//!
//! Each indicator sits behind its own resampler. It is stepped only when a coarse
//! bar completes; between completions its latest output is carried forward.
//! HalfTrend's flip flag is reported only on the base bar that completed the
//! flipping coarse bar, so an entry fires at most once per flip. A base bar after
//! a gap can complete two coarse bars at once; a flip on either is kept.

use tracing::trace;

use crate::data::{CalendarResampler, Resampler};
use crate::domain::{Bar, IdGen, Notification, OrderIntent};
use crate::indicators::{
    AtrTrailingStop, HalfTrend, HalfTrendOutput, HtfEma, HullSuite, Indicator, StGrab,
};
use crate::params::StrategyParams;
use crate::signals::{IndicatorSnapshot, SignalCombiner, SignalOutput};

use super::order_state::{NotificationOutcome, OrderState, OrderStateMachine, SizingContext};

/// An indicator fed through a resampler, remembering its latest output.
#[derive(Debug, Clone)]
struct Timeframed<I: Indicator> {
    resampler: CalendarResampler,
    indicator: I,
    latest: I::Output,
}

impl<I> Timeframed<I>
where
    I: Indicator,
    I::Output: Copy,
{
    fn new(indicator: I, compression: u32, base_minutes: u32, initial: I::Output) -> Self {
        Self {
            resampler: CalendarResampler::new(compression, base_minutes),
            indicator,
            latest: initial,
        }
    }

    /// Push a base bar; returns the output of every coarse bar it completed, oldest first.
    fn step(&mut self, bar: &Bar) -> Vec<I::Output> {
        let outputs: Vec<I::Output> = self
            .resampler
            .push(bar)
            .iter()
            .map(|coarse| self.indicator.update(coarse))
            .collect();
        if let Some(last) = outputs.last() {
            self.latest = *last;
        }
        outputs
    }

    /// Base bars needed before the indicator's first defined output, with full buckets.
    fn warmup_bars(&self) -> usize {
        (self.indicator.lookback() + 1) * self.resampler.compression() as usize
    }
}

/// HalfTrend as seen by one base bar, given the coarse outputs it completed.
///
/// Nothing completed: the latest output with the flip and arrows cleared.
/// Otherwise the newest output, carrying the most recent flip among them.
fn halftrend_view(latest: HalfTrendOutput, completed: &[HalfTrendOutput]) -> HalfTrendOutput {
    let Some(newest) = completed.last() else {
        return HalfTrendOutput {
            just_flipped: false,
            arrow_up: None,
            arrow_down: None,
            ..latest
        };
    };
    match completed.iter().rev().find(|o| o.just_flipped) {
        Some(flip) => HalfTrendOutput {
            just_flipped: true,
            arrow_up: flip.arrow_up,
            arrow_down: flip.arrow_down,
            ..*newest
        },
        None => *newest,
    }
}

#[derive(Debug, Clone)]
pub struct SymbolAggregate {
    symbol: String,
    halftrend: Timeframed<HalfTrend>,
    atr_stop: Timeframed<AtrTrailingStop>,
    st_grab: Timeframed<StGrab>,
    htf_ema: Timeframed<HtfEma>,
    hull: Timeframed<HullSuite>,
    /// HalfTrend output as seen by the current base bar.
    halftrend_view: HalfTrendOutput,
    combiner: SignalCombiner,
    machine: OrderStateMachine,
    pending_signal: Option<SignalOutput>,
    bars_seen: u64,
}

impl SymbolAggregate {
    pub fn new(symbol: impl Into<String>, params: &StrategyParams, base_minutes: u32) -> Self {
        let c = params.compressions(base_minutes);
        let warm = IndicatorSnapshot::warming_up();
        Self {
            symbol: symbol.into(),
            halftrend: Timeframed::new(
                HalfTrend::new(params.amplitude, params.channel_deviation),
                c.halftrend,
                base_minutes,
                warm.halftrend,
            ),
            atr_stop: Timeframed::new(
                AtrTrailingStop::new(params.natr_period, params.natr_multiplier),
                c.atr_stop,
                base_minutes,
                warm.stop,
            ),
            st_grab: Timeframed::new(
                StGrab::new(params.st_grab_period),
                c.st_grab,
                base_minutes,
                warm.st_grab,
            ),
            htf_ema: Timeframed::new(
                HtfEma::new(params.ema_length_1, params.ema_length_2, params.ema_length_3),
                c.htf_ema,
                base_minutes,
                warm.htf_ema,
            ),
            hull: Timeframed::new(
                HullSuite::new(params.hull_length, params.hull_mode, params.hull_src),
                c.hull,
                base_minutes,
                warm.hull,
            ),
            halftrend_view: warm.halftrend,
            combiner: SignalCombiner::new(),
            machine: OrderStateMachine::new(),
            pending_signal: None,
            bars_seen: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> OrderState {
        self.machine.state()
    }

    pub fn closed_trades(&self) -> u64 {
        self.machine.closed_trades()
    }

    pub fn bars_seen(&self) -> u64 {
        self.bars_seen
    }

    /// Base bars needed before every indicator has produced a value.
    pub fn warmup_bars(&self) -> usize {
        [
            self.halftrend.warmup_bars(),
            self.atr_stop.warmup_bars(),
            self.st_grab.warmup_bars(),
            self.htf_ema.warmup_bars(),
            self.hull.warmup_bars(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// `warmup_bars` for a fresh aggregate built from `params`.
    pub fn required_bars(params: &StrategyParams, base_minutes: u32) -> usize {
        Self::new(String::new(), params, base_minutes).warmup_bars()
    }

    /// Indicator outputs as seen by the most recent base bar.
    pub fn snapshot(&self) -> IndicatorSnapshot {
        IndicatorSnapshot {
            halftrend: self.halftrend_view,
            stop: self.atr_stop.latest,
            st_grab: self.st_grab.latest,
            htf_ema: self.htf_ema.latest,
            hull: self.hull.latest,
        }
    }

    /// Step every indicator and the combiner with one base bar. Touches only this
    /// symbol's state, so it is safe to run for many symbols in parallel.
    pub fn step_signal(&mut self, bar: &Bar) -> SignalOutput {
        self.bars_seen += 1;

        let completed = self.halftrend.step(bar);
        self.halftrend_view = halftrend_view(self.halftrend.latest, &completed);
        self.atr_stop.step(bar);
        self.st_grab.step(bar);
        self.htf_ema.step(bar);
        self.hull.step(bar);

        let signal = self.combiner.evaluate(bar, &self.snapshot());
        trace!(symbol = %self.symbol, ts = %bar.timestamp, ?signal.conditions, "signal");
        self.pending_signal = Some(signal);
        signal
    }

    /// Run the state machine on the signal computed by the last `step_signal`.
    /// Consumes that signal; a second call without a new bar emits nothing.
    pub fn decide(&mut self, sizing: SizingContext<'_>, ids: &mut IdGen) -> Vec<OrderIntent> {
        match self.pending_signal.take() {
            Some(signal) => self.machine.on_signal(&self.symbol, &signal, sizing, ids),
            None => Vec::new(),
        }
    }

    pub fn on_notification(&mut self, notification: &Notification) -> NotificationOutcome {
        self.machine.on_notification(notification)
    }
}
