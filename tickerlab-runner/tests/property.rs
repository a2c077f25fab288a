//! Concurrency invariance: for any universe and worker count, a run yields one
//! outcome per task, and the outcome set matches a single-worker run.

use proptest::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tickerlab_core::data::{
    DataError, DateRange, FailureKind, RawFrame, SourceAdapter, SourceKind, SyntheticAdapter,
    Universe,
};
use tickerlab_runner::config::ThrottleConfig;
use tickerlab_runner::{run_collection, CancelToken, CollectConfig};

/// Synthetic prices, except `BAD*` tickers which have no data.
struct Flaky(SyntheticAdapter);

impl SourceAdapter for Flaky {
    fn kind(&self) -> SourceKind {
        SourceKind::Synthetic
    }

    fn fetch(&self, ticker: &str, range: DateRange) -> Result<RawFrame, DataError> {
        if ticker.starts_with("BAD") {
            return Err(DataError::no_data(ticker));
        }
        self.0.fetch(ticker, range)
    }
}

fn run(dir: &Path, universe: &Universe, workers: usize) -> Vec<(String, Option<FailureKind>)> {
    let config = CollectConfig {
        max_workers: workers,
        output_dir: dir.to_path_buf(),
        start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
        throttle: ThrottleConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
        },
        ..CollectConfig::default()
    };
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(Flaky(SyntheticAdapter::new()))];
    run_collection(&config, universe, &adapters, &CancelToken::new())
        .unwrap()
        .outcomes
        .iter()
        .map(|o| (o.ticker().to_string(), o.failure_kind()))
        .collect()
}

fn ticker() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[A-Z]{1,4}",
        1 => "BAD[A-Z]{0,2}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn outcomes_match_single_worker_run(
        tickers in prop::collection::vec(ticker(), 0..24),
        workers in 1usize..8,
    ) {
        let universe = Universe::new(tickers.clone());

        let serial_dir = tempfile::tempdir().unwrap();
        let parallel_dir = tempfile::tempdir().unwrap();
        let serial = run(serial_dir.path(), &universe, 1);
        let parallel = run(parallel_dir.path(), &universe, workers);

        prop_assert_eq!(parallel.len(), tickers.len());
        prop_assert_eq!(&serial, &parallel);

        let failed: Vec<&str> = parallel
            .iter()
            .filter(|(_, k)| k.is_some())
            .map(|(t, _)| t.as_str())
            .collect();
        let expected: Vec<&str> = tickers
            .iter()
            .filter(|t| t.starts_with("BAD"))
            .map(String::as_str)
            .collect();
        prop_assert_eq!(failed, expected);
    }
}
