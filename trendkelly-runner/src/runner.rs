//! Backtest runner — wires the bar loader, the strategy orchestrator and the
//! simulated venue into one timestamp-ordered loop.
//!
//! Per timestamp:
//!
//! 1. each symbol's bar is shown to the venue first, so orders accepted on
//!    earlier bars can fill; resulting notifications go to the orchestrator
//! 2. the batch goes to the orchestrator, which steps indicators and decides
//! 3. the emitted intents are handed to the venue for the following bars
//!
//! Two entry points:
//! - `run_backtest()`: validates parameters, loads data, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded data, no I/O.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{info, warn};

use trendkelly_core::data::DataSource;
use trendkelly_core::domain::Bar;
use trendkelly_core::engine::SymbolAggregate;
use trendkelly_core::{ConfigError, Orchestrator, StrategyParams};

use crate::config::{ConfigFileError, RunConfig};
use crate::data_loader::{load_universe, CsvBarSource, LoadError, LoadedData, SyntheticBarSource};
use crate::report::{BacktestResult, ReportError, SCHEMA_VERSION};
use crate::venue::SimVenue;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("config file error: {0}")]
    ConfigFile(#[from] ConfigFileError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("report error: {0}")]
    Report(#[from] ReportError),
}

/// Run a backtest described by `config`.
///
/// Strategy parameters are validated before any data is touched. A symbol with
/// fewer bars than the strategy needs to warm up every indicator is excluded.
pub fn run_backtest(config: &RunConfig) -> Result<BacktestResult, RunError> {
    let params = config.strategy_params()?;
    let run = &config.run;
    let min_bars = SymbolAggregate::required_bars(&params, run.base_resolution);

    let loaded = if run.synthetic {
        let source = SyntheticBarSource::new(run.seed, run.synthetic_bars, run.base_resolution);
        load_universe(&source, DataSource::Synthetic, &run.symbols, min_bars)?
    } else {
        let source = CsvBarSource::new(&run.data_dir);
        load_universe(&source, DataSource::Csv, &run.symbols, min_bars)?
    };

    run_backtest_from_data(config, &params, &loaded)
}

/// Run a backtest over pre-loaded bars — no I/O.
pub fn run_backtest_from_data(
    config: &RunConfig,
    params: &StrategyParams,
    loaded: &LoadedData,
) -> Result<BacktestResult, RunError> {
    let symbols = loaded.symbols();
    let base = config.run.base_resolution;
    let mut orchestrator = Orchestrator::new(&symbols, params, config.risk.clone(), base);
    let mut venue = SimVenue::new(config.run.initial_capital);

    let timeline = merge_timeline(&loaded.bars);
    info!(
        symbols = symbols.len(),
        excluded = loaded.excluded.len(),
        timestamps = timeline.len(),
        base_resolution = base,
        "backtest started"
    );

    for batch in timeline.values() {
        for bar in batch {
            for notification in venue.on_bar(bar) {
                orchestrator.on_notification(&notification);
            }
        }
        let intents = orchestrator.on_bars(batch, venue.cash());
        venue.submit(&intents);
    }

    if venue.open_position_count() > 0 {
        warn!(
            open = venue.open_position_count(),
            "positions still open at end of data; marked at last close"
        );
    }

    let closed_trades_by_symbol = orchestrator.closed_trade_counts();
    let total_closed_trades = orchestrator.total_closed_trades();
    let kelly = *orchestrator.kelly_stats();
    let final_risk_fraction = orchestrator.risk_fraction();
    let final_cash = venue.cash();
    let final_account_value = venue.account_value();
    let open_positions = venue.open_position_count();
    let rejected_orders = venue.rejected_orders();

    info!(
        closed = total_closed_trades,
        win_rate = kelly.win_rate(),
        final_account_value,
        "backtest finished"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(&loaded.dataset_hash)?,
        dataset_hash: loaded.dataset_hash.clone(),
        data_source: loaded.source,
        symbols,
        excluded: loaded.excluded.clone(),
        closed_trades_by_symbol,
        total_closed_trades,
        kelly,
        final_risk_fraction,
        initial_capital: config.run.initial_capital,
        final_cash,
        final_account_value,
        open_positions,
        rejected_orders,
        bar_count: timeline.len(),
        params: params.clone(),
        risk: config.risk.clone(),
        trades: venue.into_closed_trades(),
    })
}

/// Group every symbol's bars by timestamp. Within a batch bars keep symbol order.
fn merge_timeline(bars: &BTreeMap<String, Vec<Bar>>) -> BTreeMap<NaiveDateTime, Vec<Bar>> {
    let mut timeline: BTreeMap<NaiveDateTime, Vec<Bar>> = BTreeMap::new();
    for series in bars.values() {
        for bar in series {
            timeline.entry(bar.timestamp).or_default().push(bar.clone());
        }
    }
    timeline
}
