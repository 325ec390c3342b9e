//! TrendKelly CLI — run, params, and synthetic data commands.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file and save its artifacts
//! - `params` — print a starter config with the default strategy parameters
//! - `synthetic` — write seeded random-walk CSV bars for a list of symbols

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trendkelly_core::data::BarSource;
use trendkelly_runner::{run_backtest, write_bars_csv, RunConfig, SyntheticBarSource};

#[derive(Parser)]
#[command(
    name = "trendkelly",
    about = "TrendKelly CLI — multi-timeframe trend strategy with Kelly sizing"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory; artifacts go into a per-run subdirectory.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Print a starter config with the default strategy parameters.
    Params {
        /// Symbols to put in the [run] section.
        #[arg(default_values_t = vec!["SPY".to_string()])]
        symbols: Vec<String>,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write seeded synthetic bars as `{SYMBOL}.csv` files.
    Synthetic {
        /// Symbols to generate (e.g., AAPL MSFT).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Bars per symbol.
        #[arg(long, default_value_t = 2_000)]
        bars: usize,

        /// Base bar resolution in minutes.
        #[arg(long, default_value_t = 60)]
        base_resolution: u32,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Directory to write into. Defaults to ./data.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { config, output_dir } => run_cmd(&config, &output_dir),
        Commands::Params { symbols, output } => params_cmd(&symbols, output.as_deref()),
        Commands::Synthetic {
            symbols,
            bars,
            base_resolution,
            seed,
            data_dir,
        } => synthetic_cmd(&symbols, bars, base_resolution, seed, &data_dir),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_cmd(config_path: &Path, output_dir: &Path) -> Result<()> {
    let config = RunConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let result = run_backtest(&config)?;
    print!("{}", result.summary());

    let short_id: String = result.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(short_id);
    let paths = result.save(&run_dir)?;
    info!(run_id = %result.run_id, "artifacts saved");
    println!("Artifacts saved to: {}", run_dir.display());
    println!("  {}", paths.result_json.display());
    println!("  {}", paths.trades_csv.display());

    Ok(())
}

fn params_cmd(symbols: &[String], output: Option<&Path>) -> Result<()> {
    let symbols: Vec<&str> = symbols.iter().map(String::as_str).collect();
    let text = RunConfig::template(&symbols).to_toml()?;
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("Config template written to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn synthetic_cmd(
    symbols: &[String],
    bars: usize,
    base_resolution: u32,
    seed: u64,
    data_dir: &Path,
) -> Result<()> {
    if bars == 0 {
        bail!("--bars must be at least 1");
    }
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;

    let source = SyntheticBarSource::new(seed, bars, base_resolution);
    for symbol in symbols {
        let series = source.load(symbol)?;
        let path = data_dir.join(format!("{symbol}.csv"));
        write_bars_csv(&path, &series)?;
        println!("{symbol}: {} bars -> {}", series.len(), path.display());
    }
    Ok(())
}
