//! TickerLab Runner: collection orchestration and downstream analysis.
//!
//! This crate builds on `tickerlab-core` to provide:
//! - Task planning over a ticker universe and a set of source adapters
//! - A bounded worker pool with panic isolation, throttling and cancellation
//! - Race-free outcome collection, the failed-ticker manifest and a JSON run report
//! - TOML collection config
//! - The moving-average crossover backtest and its pipe-delimited trade ledger
//! - Ledger valuation against a buy-and-hold benchmark

pub mod cancel;
pub mod collector;
pub mod config;
pub mod crossover;
pub mod ledger;
pub mod manifest;
pub mod orchestrator;
pub mod pool;
pub mod report;
pub mod sources;
pub mod task;
pub mod throttle;
pub mod valuation;

pub use cancel::CancelToken;
pub use collector::{CollectorError, OutcomeCollector};
pub use config::{CollectConfig, ConfigError};
pub use crossover::{backtest, run_directory, sma, BacktestRun, CrossoverParams, TickerSummary};
pub use ledger::{parse_ledger, read_ledger, write_ledger, LedgerError, Trade};
pub use manifest::{failed_tickers, write_manifest, MANIFEST_FILE};
pub use orchestrator::{run_collection, CollectionSummary};
pub use pool::{PoolError, WorkerPool};
pub use report::{CollectionReport, REPORT_FILE};
pub use sources::build_adapters;
pub use task::{execute, plan_tasks, FailureReason, TaskOutcome, TaskUnit};
pub use throttle::Throttle;
pub use valuation::{
    benchmark_curve, portfolio_curve, run_valuation, trade_markers, CurvePoint, TradeMarker,
    ValuationSummary,
};
