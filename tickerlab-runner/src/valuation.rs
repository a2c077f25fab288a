//! Portfolio valuation from a trade ledger, aligned against a buy-and-hold
//! benchmark.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tickerlab_core::data::persist::write_bytes_atomic;
use tracing::{info, warn};

use crate::crossover::{load_columns, PRICE_FILE_SUFFIX};
use crate::ledger::{read_ledger, Trade};

pub const BENCHMARK_TICKER: &str = "SPY";
pub const BENCHMARK_COLUMN: &str = "OPEN";
pub const PERFORMANCE_FILE: &str = "portfolio_performance.csv";
pub const MARKERS_FILE: &str = "trade_markers.csv";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeMarker {
    pub date: NaiveDate,
    pub value: f64,
    pub winning: bool,
}

/// Capital after each trade closes, starting from `initial` at the earliest
/// entry date. Trades are applied in the order given.
pub fn portfolio_curve(trades: &[Trade], initial: f64) -> Vec<CurvePoint> {
    let Some(first) = trades.iter().map(|t| t.entry_date).min() else {
        return Vec::new();
    };
    let mut capital = initial;
    let mut curve = Vec::with_capacity(trades.len() + 1);
    curve.push(CurvePoint {
        date: first,
        value: initial,
    });
    for trade in trades {
        capital += trade.pl_abs;
        curve.push(CurvePoint {
            date: trade.exit_date,
            value: capital,
        });
    }
    curve.sort_by_key(|p| p.date);
    curve
}

/// Buy-and-hold value of `initial` invested at the first benchmark price,
/// sampled at each portfolio date. `prices` must be sorted by date. A date
/// before the first price carries `initial`.
pub fn benchmark_curve(
    prices: &[(NaiveDate, f64)],
    portfolio: &[CurvePoint],
    initial: f64,
) -> Option<Vec<CurvePoint>> {
    let &(_, first_price) = prices.first()?;
    if first_price == 0.0 {
        return None;
    }
    let shares = initial / first_price;
    Some(
        portfolio
            .iter()
            .map(|p| {
                let upto = prices.partition_point(|(d, _)| *d <= p.date);
                let value = match upto {
                    0 => initial,
                    n => shares * prices[n - 1].1,
                };
                CurvePoint {
                    date: p.date,
                    value,
                }
            })
            .collect(),
    )
}

/// Benchmark price series from `{dir}/SPY_yahoo_finance.csv`, sorted by date.
/// `None` (with a warning) when the file or its price column is unusable.
pub fn load_benchmark_prices(data_dir: &Path) -> Option<Vec<(NaiveDate, f64)>> {
    let path = data_dir.join(format!("{BENCHMARK_TICKER}{PRICE_FILE_SUFFIX}"));
    if !path.exists() {
        warn!(path = %path.display(), "benchmark file not found");
        return None;
    }
    match load_columns(&path, &[BENCHMARK_COLUMN]) {
        Ok(rows) => {
            let mut prices: Vec<(NaiveDate, f64)> =
                rows.into_iter().map(|(d, v)| (d, v[0])).collect();
            prices.sort_by_key(|(d, _)| *d);
            if prices.is_empty() {
                warn!(path = %path.display(), "benchmark file has no usable rows");
                return None;
            }
            Some(prices)
        }
        Err(err) => {
            warn!(error = %err, "benchmark unavailable");
            None
        }
    }
}

/// Cumulative capital after each trade, in trade order.
pub fn trade_markers(trades: &[Trade], initial: f64) -> Vec<TradeMarker> {
    trades
        .iter()
        .scan(initial, |capital, t| {
            *capital += t.pl_abs;
            Some(TradeMarker {
                date: t.exit_date,
                value: *capital,
                winning: t.is_winner(),
            })
        })
        .collect()
}

pub fn write_performance_csv(
    path: &Path,
    portfolio: &[CurvePoint],
    benchmark: Option<&[CurvePoint]>,
) -> Result<()> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["DATE", "PORTFOLIO_VALUE", "BENCHMARK_VALUE"])?;
    for (i, p) in portfolio.iter().enumerate() {
        let bench = benchmark
            .and_then(|b| b.get(i))
            .map(|b| b.value.to_string())
            .unwrap_or_default();
        w.write_record([p.date.to_string(), p.value.to_string(), bench])?;
    }
    persist_csv(path, w)
}

pub fn write_markers_csv(path: &Path, markers: &[TradeMarker]) -> Result<()> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["DATE", "VALUE", "OUTCOME"])?;
    for m in markers {
        let outcome = if m.winning { "win" } else { "loss" };
        w.write_record([m.date.to_string(), m.value.to_string(), outcome.to_string()])?;
    }
    persist_csv(path, w)
}

/// Flush an in-memory CSV writer and write its bytes atomically to `path`.
fn persist_csv(path: &Path, writer: csv::Writer<Vec<u8>>) -> Result<()> {
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("failed to render {}: {}", path.display(), e.error()))?;
    write_bytes_atomic(path, &bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[derive(Debug)]
pub struct ValuationSummary {
    pub trades: usize,
    pub final_value: Option<f64>,
    pub benchmark_final: Option<f64>,
    pub performance_path: PathBuf,
    pub markers_path: PathBuf,
}

/// Read the ledger, value it, align the benchmark and write both CSVs into
/// `output_dir`.
pub fn run_valuation(
    ledger: &Path,
    data_dir: &Path,
    initial: f64,
    output_dir: &Path,
) -> Result<ValuationSummary> {
    let trades = read_ledger(ledger)?;
    if trades.is_empty() {
        warn!(ledger = %ledger.display(), "ledger contains no trades");
    }

    let portfolio = portfolio_curve(&trades, initial);
    let benchmark = load_benchmark_prices(data_dir)
        .and_then(|prices| benchmark_curve(&prices, &portfolio, initial));
    let markers = trade_markers(&trades, initial);

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let performance_path = output_dir.join(PERFORMANCE_FILE);
    let markers_path = output_dir.join(MARKERS_FILE);
    write_performance_csv(&performance_path, &portfolio, benchmark.as_deref())?;
    write_markers_csv(&markers_path, &markers)?;

    let summary = ValuationSummary {
        trades: trades.len(),
        final_value: portfolio.last().map(|p| p.value),
        benchmark_final: benchmark.as_ref().and_then(|b| b.last()).map(|p| p.value),
        performance_path,
        markers_path,
    };
    info!(
        trades = summary.trades,
        final_value = ?summary.final_value,
        benchmark_final = ?summary.benchmark_final,
        "valuation written"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, m, day).unwrap()
    }

    fn trade(entry: NaiveDate, exit: NaiveDate, pl: f64) -> Trade {
        Trade {
            ticker: "T".into(),
            entry_date: entry,
            exit_date: exit,
            entry_price: 100.0,
            exit_price: 100.0 + pl / 10.0,
            pl_pct: pl / 1000.0,
            pl_abs: pl,
        }
    }

    #[test]
    fn curve_starts_at_initial_and_accumulates() {
        let trades = vec![
            trade(d(1, 5), d(3, 1), 100.0),
            trade(d(2, 1), d(2, 15), -50.0),
        ];
        let curve = portfolio_curve(&trades, 10_000.0);
        let pts: Vec<(NaiveDate, f64)> = curve.iter().map(|p| (p.date, p.value)).collect();
        // Applied in entry order, then sorted by date.
        assert_eq!(
            pts,
            vec![(d(1, 5), 10_000.0), (d(2, 15), 10_050.0), (d(3, 1), 10_100.0)]
        );
    }

    #[test]
    fn empty_ledger_empty_curve() {
        assert!(portfolio_curve(&[], 10_000.0).is_empty());
    }

    #[test]
    fn benchmark_uses_last_price_on_or_before() {
        let prices = vec![(d(1, 3), 100.0), (d(1, 10), 110.0), (d(2, 1), 120.0)];
        let portfolio = [
            CurvePoint { date: d(1, 1), value: 0.0 },
            CurvePoint { date: d(1, 10), value: 0.0 },
            CurvePoint { date: d(1, 20), value: 0.0 },
            CurvePoint { date: d(3, 1), value: 0.0 },
        ];
        let bench = benchmark_curve(&prices, &portfolio, 1_000.0).unwrap();
        let values: Vec<f64> = bench.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1_000.0, 1_100.0, 1_100.0, 1_200.0]);
    }

    #[test]
    fn no_prices_no_benchmark() {
        assert!(benchmark_curve(&[], &[], 1_000.0).is_none());
    }

    #[test]
    fn markers_track_cumulative_value() {
        let trades = vec![
            trade(d(1, 5), d(1, 20), 200.0),
            trade(d(1, 6), d(1, 25), -300.0),
        ];
        let markers = trade_markers(&trades, 10_000.0);
        assert_eq!(markers[0].value, 10_200.0);
        assert!(markers[0].winning);
        assert_eq!(markers[1].value, 9_900.0);
        assert!(!markers[1].winning);
    }

    #[test]
    fn missing_benchmark_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_benchmark_prices(dir.path()).is_none());
    }

    #[test]
    fn benchmark_file_without_open_is_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("SPY_yahoo_finance.csv"),
            "DATE,CLOSE\n2023-01-03,380\n",
        )
        .unwrap();
        assert!(load_benchmark_prices(dir.path()).is_none());
    }

    #[test]
    fn benchmark_prices_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("SPY_yahoo_finance.csv"),
            "Date,Open\n2023-01-04,2\nbad,9\n2023-01-03,1\n",
        )
        .unwrap();
        let prices = load_benchmark_prices(dir.path()).unwrap();
        assert_eq!(prices, vec![(d(1, 3), 1.0), (d(1, 4), 2.0)]);
    }

    #[test]
    fn performance_csv_leaves_benchmark_empty_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PERFORMANCE_FILE);
        let curve = [CurvePoint { date: d(1, 5), value: 10_000.0 }];
        write_performance_csv(&path, &curve, None).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "DATE,PORTFOLIO_VALUE,BENCHMARK_VALUE\n2023-01-05,10000,\n");
    }

    #[test]
    fn outputs_replace_prior_files_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");
        let path = out.join(MARKERS_FILE);
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(&path, "stale contents that are longer than the new file\n".repeat(20)).unwrap();

        let markers = [TradeMarker { date: d(2, 1), value: 10_100.0, winning: true }];
        write_markers_csv(&path, &markers).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "DATE,VALUE,OUTCOME\n2023-02-01,10100,win\n"
        );
        let entries: Vec<_> = std::fs::read_dir(&out).unwrap().collect();
        assert_eq!(entries.len(), 1, "temp file left behind");
    }

    #[test]
    fn performance_csv_creates_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(PERFORMANCE_FILE);
        let curve = [CurvePoint { date: d(1, 5), value: 10_000.0 }];
        let bench = [CurvePoint { date: d(1, 5), value: 9_950.5 }];
        write_performance_csv(&path, &curve, Some(&bench)).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "DATE,PORTFOLIO_VALUE,BENCHMARK_VALUE\n2023-01-05,10000,9950.5\n"
        );
    }
}
