//! Moving-average crossover backtest over collected price files.
//!
//! Golden cross (short SMA crosses above long SMA) opens a fixed-dollar
//! position at that bar's open; death cross closes it at the open. A position
//! still open after the last bar is closed at the last bar's open.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::ledger::{LedgerError, Trade};

/// File suffix of the price files the backtest reads.
pub const PRICE_FILE_SUFFIX: &str = "_yahoo_finance.csv";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossoverParams {
    pub short: usize,
    pub long: usize,
    /// Dollars committed per trade.
    pub unit_size: f64,
}

impl Default for CrossoverParams {
    fn default() -> Self {
        Self {
            short: 50,
            long: 200,
            unit_size: 1000.0,
        }
    }
}

impl CrossoverParams {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.short == 0 {
            return Err(LedgerError::InvalidParams("short window must be >= 1".into()));
        }
        if self.long <= self.short {
            return Err(LedgerError::InvalidParams(format!(
                "long window ({}) must be greater than short window ({})",
                self.long, self.short
            )));
        }
        if !(self.unit_size.is_finite() && self.unit_size > 0.0) {
            return Err(LedgerError::InvalidParams(format!(
                "unit size must be positive, got {}",
                self.unit_size
            )));
        }
        Ok(())
    }
}

/// One daily bar as the backtest sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
}

/// Per-ticker totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerSummary {
    pub ticker: String,
    pub trades: usize,
    pub total_pl: f64,
    pub win_rate: f64,
}

#[derive(Debug, Default)]
pub struct BacktestRun {
    /// All trades, sorted by entry date then ticker.
    pub trades: Vec<Trade>,
    /// Sorted by total P/L, best first.
    pub summaries: Vec<TickerSummary>,
    /// Files that could not be used, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Rolling mean. Values before index `window - 1` are NaN.
pub fn sma(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }
    let mut sum: f64 = values[..window].iter().sum();
    result[window - 1] = sum / window as f64;
    for i in window..n {
        sum += values[i] - values[i - window];
        result[i] = sum / window as f64;
    }
    result
}

/// Run the crossover rules over one ticker's bars. Fewer than `long` bars
/// produce no trades.
pub fn backtest(ticker: &str, bars: &[PriceRow], params: &CrossoverParams) -> Vec<Trade> {
    let n = bars.len();
    if n < params.long || params.long < 2 {
        return Vec::new();
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let short = sma(&closes, params.short);
    let long = sma(&closes, params.long);

    let mut trades = Vec::new();
    let mut open: Option<(NaiveDate, f64)> = None;

    for i in params.long..n {
        let (cs, ps) = (short[i], short[i - 1]);
        let (cl, pl) = (long[i], long[i - 1]);
        let bar = &bars[i];

        if cs > cl && ps <= pl && open.is_none() {
            open = Some((bar.date, bar.open));
        } else if cs < cl && ps >= pl {
            if let Some((entry_date, entry_price)) = open.take() {
                trades.push(Trade::close(
                    ticker,
                    entry_date,
                    entry_price,
                    bar.date,
                    bar.open,
                    params.unit_size,
                ));
            }
        }
    }

    if let (Some((entry_date, entry_price)), Some(last)) = (open, bars.last()) {
        trades.push(Trade::close(
            ticker,
            entry_date,
            entry_price,
            last.date,
            last.open,
            params.unit_size,
        ));
    }
    trades
}

/// Ticker encoded in a price file name, e.g. `AAPL_yahoo_finance.csv` -> `AAPL`.
pub fn ticker_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let ticker = name.strip_suffix(PRICE_FILE_SUFFIX)?;
    (!ticker.is_empty()).then(|| ticker.to_string())
}

/// Read `DATE` plus the named numeric columns from a CSV file. Header names
/// are matched upper-cased and trimmed; rows whose date or any requested value
/// does not parse are dropped. Row order is preserved.
pub fn load_columns(
    path: &Path,
    columns: &[&str],
) -> Result<Vec<(NaiveDate, Vec<f64>)>, LedgerError> {
    let read_err = |message: String| LedgerError::Read {
        path: path.display().to_string(),
        message,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| read_err(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| read_err(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_uppercase())
        .collect();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let mut missing = Vec::new();
    let date_idx = position("DATE");
    if date_idx.is_none() {
        missing.push("DATE");
    }
    let value_idx: Vec<Option<usize>> = columns.iter().map(|c| position(*c)).collect();
    for (name, idx) in columns.iter().zip(&value_idx) {
        if idx.is_none() {
            missing.push(*name);
        }
    }
    let (Some(date_idx), true) = (date_idx, missing.is_empty()) else {
        return Err(read_err(format!("missing columns: {}", missing.join(","))));
    };
    let value_idx: Vec<usize> = value_idx.into_iter().flatten().collect();

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| read_err(e.to_string()))?;
        let date = record.get(date_idx).and_then(parse_date);
        let values: Option<Vec<f64>> = value_idx
            .iter()
            .map(|&i| {
                record
                    .get(i)
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .filter(|v| v.is_finite())
            })
            .collect();
        match (date, values) {
            (Some(date), Some(values)) => rows.push((date, values)),
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(path = %path.display(), dropped, "dropped unparsable price rows");
    }
    Ok(rows)
}

/// Accepts `YYYY-MM-DD` with an optional time suffix.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
}

pub fn load_price_file(path: &Path) -> Result<Vec<PriceRow>, LedgerError> {
    Ok(load_columns(path, &["OPEN", "CLOSE"])?
        .into_iter()
        .map(|(date, v)| PriceRow {
            date,
            open: v[0],
            close: v[1],
        })
        .collect())
}

/// Price files in `dir`, sorted by name.
pub fn price_files(dir: &Path) -> Result<Vec<PathBuf>, LedgerError> {
    let entries = std::fs::read_dir(dir).map_err(|e| LedgerError::Read {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && ticker_from_path(p).is_some())
        .collect();
    files.sort();
    Ok(files)
}

/// Backtest every price file in `dir` in parallel and merge the results.
pub fn run_directory(dir: &Path, params: &CrossoverParams) -> Result<BacktestRun, LedgerError> {
    params.validate()?;
    let files = price_files(dir)?;
    info!(dir = %dir.display(), files = files.len(), short = params.short, long = params.long, "backtest started");

    let per_file: Vec<(PathBuf, Result<(String, Vec<Trade>), String>)> = files
        .par_iter()
        .map(|path| (path.clone(), backtest_file(path, params)))
        .collect();

    let mut run = BacktestRun::default();
    for (path, result) in per_file {
        match result {
            Ok((ticker, trades)) => {
                debug!(ticker = %ticker, trades = trades.len(), "ticker backtested");
                run.summaries.push(summarize(&ticker, &trades));
                run.trades.extend(trades);
            }
            Err(reason) => {
                warn!(path = %path.display(), reason = %reason, "price file skipped");
                run.skipped.push((path, reason));
            }
        }
    }

    run.trades
        .sort_by(|a, b| a.entry_date.cmp(&b.entry_date).then_with(|| a.ticker.cmp(&b.ticker)));
    run.summaries.sort_by(|a, b| {
        b.total_pl
            .total_cmp(&a.total_pl)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    info!(
        trades = run.trades.len(),
        tickers = run.summaries.len(),
        skipped = run.skipped.len(),
        "backtest finished"
    );
    Ok(run)
}

fn backtest_file(path: &Path, params: &CrossoverParams) -> Result<(String, Vec<Trade>), String> {
    let ticker = ticker_from_path(path).ok_or_else(|| "not a price file".to_string())?;
    let bars = load_price_file(path).map_err(|e| e.to_string())?;
    if bars.len() < params.long {
        return Err(format!(
            "not enough data: {} rows, need {}",
            bars.len(),
            params.long
        ));
    }
    let trades = backtest(&ticker, &bars, params);
    Ok((ticker, trades))
}

pub fn summarize(ticker: &str, trades: &[Trade]) -> TickerSummary {
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    TickerSummary {
        ticker: ticker.to_string(),
        trades: trades.len(),
        total_pl: trades.iter().map(|t| t.pl_abs).sum(),
        win_rate: if trades.is_empty() {
            0.0
        } else {
            winners as f64 / trades.len() as f64
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn bars(closes: &[f64]) -> Vec<PriceRow> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceRow {
                date: start + chrono::Days::new(i as u64),
                open: c + 0.5,
                close: c,
            })
            .collect()
    }

    fn small() -> CrossoverParams {
        CrossoverParams {
            short: 2,
            long: 4,
            unit_size: 1000.0,
        }
    }

    #[test]
    fn sma_basic() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_eq!(&out[2..], &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn sma_window_longer_than_series() {
        assert!(sma(&[1.0, 2.0], 3).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn golden_then_death_cross() {
        // Flat, rise (golden cross), then fall (death cross).
        let closes = [10.0, 10.0, 10.0, 10.0, 10.0, 14.0, 18.0, 18.0, 10.0, 5.0, 5.0];
        let b = bars(&closes);
        let trades = backtest("T", &b, &small());
        assert_eq!(trades.len(), 1);
        let t = &trades[0];
        assert_eq!(t.entry_date, b[5].date);
        assert_eq!(t.entry_price, b[5].open);
        assert_eq!(t.exit_date, b[8].date);
        assert_eq!(t.exit_price, b[8].open);
        assert!((t.pl_abs - (10.5 - 14.5) * (1000.0 / 14.5)).abs() < 1e-9);
    }

    #[test]
    fn open_position_closes_at_last_open() {
        let closes = [10.0, 10.0, 10.0, 10.0, 10.0, 12.0, 14.0, 16.0];
        let b = bars(&closes);
        let trades = backtest("T", &b, &small());
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_date, b[7].date);
        assert_eq!(trades[0].exit_price, 16.5);
        assert!(trades[0].is_winner());
    }

    #[test]
    fn too_few_bars_no_trades() {
        assert!(backtest("T", &bars(&[1.0, 2.0, 3.0]), &small()).is_empty());
    }

    #[test]
    fn params_validation() {
        assert!(CrossoverParams::default().validate().is_ok());
        let bad = CrossoverParams {
            short: 5,
            long: 5,
            unit_size: 1.0,
        };
        assert!(matches!(bad.validate(), Err(LedgerError::InvalidParams(_))));
    }

    #[test]
    fn ticker_from_file_name() {
        assert_eq!(
            ticker_from_path(Path::new("data/BRK-B_yahoo_finance.csv")).as_deref(),
            Some("BRK-B")
        );
        assert_eq!(ticker_from_path(Path::new("data/AAPL_polygon.csv")), None);
        assert_eq!(ticker_from_path(Path::new("_yahoo_finance.csv")), None);
    }

    #[test]
    fn loader_uppercases_headers_and_drops_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("X_yahoo_finance.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, " date ,Open,High,Low,close,Volume").unwrap();
        writeln!(f, "2023-01-03,1.0,2,0.5,1.5,100").unwrap();
        writeln!(f, "not-a-date,1.0,2,0.5,1.5,100").unwrap();
        writeln!(f, "2023-01-04 00:00:00,2.0,2,0.5,,100").unwrap();
        writeln!(f, "2023-01-05 00:00:00,3.0,3,2.5,2.75,100").unwrap();
        drop(f);

        let rows = load_price_file(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2023, 1, 5).unwrap());
        assert_eq!(rows[1].close, 2.75);
    }

    #[test]
    fn loader_reports_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("X_yahoo_finance.csv");
        std::fs::write(&path, "DATE,HIGH\n2023-01-03,1\n").unwrap();
        let err = load_price_file(&path).unwrap_err().to_string();
        assert!(err.contains("missing columns: OPEN,CLOSE"), "{err}");
    }

    #[test]
    fn summary_win_rate() {
        let d = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let trades = vec![
            Trade::close("A", d, 10.0, d, 11.0, 1000.0),
            Trade::close("A", d, 10.0, d, 9.0, 1000.0),
        ];
        let s = summarize("A", &trades);
        assert_eq!(s.trades, 2);
        assert_eq!(s.win_rate, 0.5);
        assert!(s.total_pl.abs() < 1e-9);
    }
}
