//! TickerLab CLI: collect, backtest and valuate commands.
//!
//! Commands:
//! - `collect`: fetch every ticker in the universe from the configured sources
//!   and write one CSV per (ticker, source), plus the failed-tickers manifest
//! - `backtest`: run the moving-average crossover over collected price files
//!   and write the trade ledger
//! - `valuate`: value a trade ledger and align it with the SPY benchmark

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tickerlab_core::data::{SourceKind, Universe};
use tickerlab_runner::{
    build_adapters, run_collection, run_directory, run_valuation, write_ledger, CancelToken,
    CollectConfig, CrossoverParams,
};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "tickerlab",
    about = "TickerLab CLI: concurrent market-data collection and crossover backtests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect data for every ticker in the universe.
    Collect(CollectArgs),
    /// Backtest the moving-average crossover over collected price files.
    Backtest {
        /// Directory holding `{ticker}_yahoo_finance.csv` files.
        #[arg(long, default_value = "collected_data")]
        data_dir: PathBuf,

        /// Trade ledger to write.
        #[arg(long, default_value = "generated_data/trade_ledger.txt")]
        ledger: PathBuf,

        /// Short SMA window.
        #[arg(long, default_value_t = 50)]
        short: usize,

        /// Long SMA window.
        #[arg(long, default_value_t = 200)]
        long: usize,

        /// Dollars committed per trade.
        #[arg(long, default_value_t = 1000.0)]
        unit_size: f64,
    },
    /// Value a trade ledger against the SPY buy-and-hold benchmark.
    Valuate {
        /// Trade ledger to read.
        #[arg(long, default_value = "generated_data/trade_ledger.txt")]
        ledger: PathBuf,

        /// Directory holding `SPY_yahoo_finance.csv`.
        #[arg(long, default_value = "collected_data")]
        data_dir: PathBuf,

        /// Starting portfolio value.
        #[arg(long, default_value_t = 10_000.0)]
        initial_capital: f64,

        /// Where to write the performance and marker CSVs.
        #[arg(long, default_value = "generated_data")]
        output_dir: PathBuf,
    },
}

#[derive(clap::Args)]
struct CollectArgs {
    /// TOML collection config. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Universe file (TOML `tickers = [...]` or one ticker per line).
    /// Defaults to the built-in S&P 500 list.
    #[arg(long)]
    universe: Option<PathBuf>,

    /// Start date (YYYY-MM-DD).
    #[arg(long = "start_date", alias = "start-date", value_parser = parse_date)]
    start_date: Option<NaiveDate>,

    /// End date (YYYY-MM-DD).
    #[arg(long = "end_date", alias = "end-date", value_parser = parse_date)]
    end_date: Option<NaiveDate>,

    /// Maximum concurrent tasks.
    #[arg(long = "max_workers", alias = "max-workers")]
    max_workers: Option<usize>,

    /// Output directory for CSVs, the manifest and the run report.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Source to collect from; repeat for several.
    #[arg(long = "source", value_parser = parse_source)]
    sources: Vec<SourceKind>,

    /// Minimum pause after each task, in milliseconds.
    #[arg(long)]
    min_delay_ms: Option<u64>,

    /// Maximum pause after each task, in milliseconds.
    #[arg(long)]
    max_delay_ms: Option<u64>,

    /// Stop starting new tasks after this many seconds.
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Polygon API key.
    #[arg(long, env = "POLYGON_API_KEY", hide_env_values = true)]
    polygon_api_key: Option<String>,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{s}': {e}"))
}

fn parse_source(s: &str) -> Result<SourceKind, String> {
    SourceKind::parse(s).ok_or_else(|| {
        let known: Vec<&str> = SourceKind::ALL.iter().map(|k| k.file_tag()).collect();
        format!("unknown source '{s}' (expected one of: {})", known.join(", "))
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Collect(args) => run_collect_cmd(args),
        Commands::Backtest {
            data_dir,
            ledger,
            short,
            long,
            unit_size,
        } => run_backtest_cmd(
            &data_dir,
            &ledger,
            CrossoverParams {
                short,
                long,
                unit_size,
            },
        ),
        Commands::Valuate {
            ledger,
            data_dir,
            initial_capital,
            output_dir,
        } => run_valuate_cmd(&ledger, &data_dir, initial_capital, &output_dir),
    }
}

/// File config first, then flag overrides.
fn resolve_config(args: &CollectArgs) -> Result<CollectConfig> {
    let mut config = match &args.config {
        Some(path) => CollectConfig::from_file(path)?,
        None => CollectConfig::default(),
    };
    if let Some(d) = args.start_date {
        config.start_date = d;
    }
    if let Some(d) = args.end_date {
        config.end_date = d;
    }
    if let Some(n) = args.max_workers {
        config.max_workers = n;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if !args.sources.is_empty() {
        config.sources = args.sources.clone();
    }
    if let Some(ms) = args.min_delay_ms {
        config.throttle.min_delay_ms = ms;
    }
    if let Some(ms) = args.max_delay_ms {
        config.throttle.max_delay_ms = ms;
    }
    if let Some(s) = args.deadline_secs {
        config.deadline_secs = Some(s);
    }
    if let Some(key) = &args.polygon_api_key {
        config.polygon.api_key = Some(key.clone());
    }
    if let Some(path) = &args.universe {
        config.universe = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

fn run_collect_cmd(args: CollectArgs) -> Result<()> {
    let config = resolve_config(&args)?;

    let universe = match &config.universe {
        Some(path) => Universe::from_file(path)
            .with_context(|| format!("Failed to load universe {}", path.display()))?,
        None => Universe::sp500(),
    };
    let adapters = build_adapters(&config).context("Failed to build source adapters")?;
    let cancel = match config.deadline() {
        Some(timeout) => CancelToken::with_deadline(timeout),
        None => CancelToken::new(),
    };

    let summary = run_collection(&config, &universe, &adapters, &cancel)?;

    println!(
        "Collected {} of {} tasks in {:.1}s",
        summary.persisted(),
        summary.outcomes.len(),
        summary.elapsed.as_secs_f64()
    );
    if let Some(path) = &summary.manifest_path {
        println!(
            "{} failed; tickers listed in {}",
            summary.failed(),
            path.display()
        );
    }
    println!("Report: {}", summary.report_path.display());

    // Failed tickers are reported through the manifest, not the exit status.
    Ok(())
}

fn run_backtest_cmd(data_dir: &Path, ledger: &Path, params: CrossoverParams) -> Result<()> {
    let run = run_directory(data_dir, &params)
        .with_context(|| format!("Backtest over {} failed", data_dir.display()))?;
    write_ledger(ledger, &run.trades)?;
    info!(path = %ledger.display(), trades = run.trades.len(), "ledger written");

    println!("{:<10} {:>8} {:>14} {:>10}", "Ticker", "Trades", "Total P/L", "Win rate");
    println!("{}", "-".repeat(45));
    for s in &run.summaries {
        println!(
            "{:<10} {:>8} {:>14.2} {:>9.1}%",
            s.ticker,
            s.trades,
            s.total_pl,
            s.win_rate * 100.0
        );
    }
    let total: f64 = run.trades.iter().map(|t| t.pl_abs).sum();
    println!();
    println!("Trades: {}  Total P/L: {total:.2}", run.trades.len());
    println!("Ledger: {}", ledger.display());
    Ok(())
}

fn run_valuate_cmd(ledger: &Path, data_dir: &Path, initial: f64, output_dir: &Path) -> Result<()> {
    let summary = run_valuation(ledger, data_dir, initial, output_dir)?;

    println!("Trades:          {}", summary.trades);
    match summary.final_value {
        Some(v) => println!("Portfolio value: {v:.2}"),
        None => println!("Portfolio value: n/a (empty ledger)"),
    }
    match summary.benchmark_final {
        Some(v) => println!("Benchmark value: {v:.2}"),
        None => println!("Benchmark value: n/a"),
    }
    println!("Performance:     {}", summary.performance_path.display());
    println!("Markers:         {}", summary.markers_path.display());
    Ok(())
}
