//! Pipe-delimited trade ledger.
//!
//! Layout (fixed-width columns, two header lines):
//!
//! ```text
//! Ticker     | Entry Date   | Exit Date    | Entry Price  | Exit Price   | P/L %        | P/L ($)
//! ----------------------------------------------------------------------------------------------------
//! AAPL       | 2023-03-01   | 2023-09-12   | 145.50       | 176.51       | 21.31       % | 213.13
//! ```
//!
//! The backtest writes it; valuation reads it back. Parsing is lenient: rows
//! whose numbers or dates do not parse are dropped.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tickerlab_core::data::persist::write_bytes_atomic;
use tracing::debug;

pub const LEDGER_FILE: &str = "trade_ledger.txt";

const SEPARATOR_WIDTH: usize = 100;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("read {path}: {message}")]
    Read { path: String, message: String },

    #[error("write {path}: {message}")]
    Write { path: String, message: String },

    #[error("invalid backtest parameters: {0}")]
    InvalidParams(String),
}

/// One closed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub ticker: String,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Fractional return, 0.05 = 5%.
    pub pl_pct: f64,
    /// Dollar P/L for the position.
    pub pl_abs: f64,
}

impl Trade {
    /// Close a position of `unit_size` dollars opened at `entry_price`.
    pub fn close(
        ticker: &str,
        entry_date: NaiveDate,
        entry_price: f64,
        exit_date: NaiveDate,
        exit_price: f64,
        unit_size: f64,
    ) -> Self {
        let shares = unit_size / entry_price;
        Self {
            ticker: ticker.to_string(),
            entry_date,
            exit_date,
            entry_price,
            exit_price,
            pl_pct: (exit_price - entry_price) / entry_price,
            pl_abs: (exit_price - entry_price) * shares,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pl_abs > 0.0
    }
}

pub fn header_line() -> String {
    format!(
        "{:<10} | {:<12} | {:<12} | {:<12} | {:<12} | {:<12} | {:<15}",
        "Ticker", "Entry Date", "Exit Date", "Entry Price", "Exit Price", "P/L %", "P/L ($)"
    )
}

pub fn format_row(trade: &Trade) -> String {
    format!(
        "{:<10} | {:<12} | {:<12} | {:<12.2} | {:<12.2} | {:<12.2}% | {:<15.2}",
        trade.ticker,
        trade.entry_date.format("%Y-%m-%d").to_string(),
        trade.exit_date.format("%Y-%m-%d").to_string(),
        trade.entry_price,
        trade.exit_price,
        trade.pl_pct * 100.0,
        trade.pl_abs,
    )
}

/// Render the full ledger, rows in the order given.
pub fn render(trades: &[Trade]) -> String {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = writeln!(out, "{}", header_line());
    let _ = writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH));
    for trade in trades {
        let _ = writeln!(out, "{}", format_row(trade));
    }
    String::from_utf8_lossy(&out).into_owned()
}

pub fn write_ledger(path: &Path, trades: &[Trade]) -> Result<(), LedgerError> {
    write_bytes_atomic(path, render(trades).as_bytes()).map_err(|e| LedgerError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

pub fn read_ledger(path: &Path) -> Result<Vec<Trade>, LedgerError> {
    let content = std::fs::read_to_string(path).map_err(|e| LedgerError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(parse_ledger(&content))
}

/// Parse ledger text, skipping the two header lines. The result is sorted by
/// entry date; rows with equal entry dates keep their file order.
pub fn parse_ledger(content: &str) -> Vec<Trade> {
    let mut trades: Vec<Trade> = content
        .lines()
        .skip(2)
        .enumerate()
        .filter_map(|(i, line)| {
            let parsed = parse_row(line);
            if parsed.is_none() && !line.trim().is_empty() {
                debug!(line = i + 3, "dropping unparsable ledger row");
            }
            parsed
        })
        .collect();
    trades.sort_by_key(|t| t.entry_date);
    trades
}

fn parse_row(line: &str) -> Option<Trade> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() < 7 {
        return None;
    }
    let number = |s: &str| s.trim().parse::<f64>().ok().filter(|v| v.is_finite());
    let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();

    Some(Trade {
        ticker: fields[0].to_string(),
        entry_date: date(fields[1])?,
        exit_date: date(fields[2])?,
        entry_price: number(fields[3])?,
        exit_price: number(fields[4])?,
        pl_pct: number(fields[5].replace('%', "").as_str())? / 100.0,
        pl_abs: number(fields[6])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> Trade {
        Trade::close("AAPL", d(2023, 3, 1), 100.0, d(2023, 9, 12), 125.0, 1000.0)
    }

    #[test]
    fn close_sizes_by_unit() {
        let t = sample();
        assert!((t.pl_pct - 0.25).abs() < 1e-12);
        assert!((t.pl_abs - 250.0).abs() < 1e-9);
        assert!(t.is_winner());
    }

    #[test]
    fn row_matches_fixed_widths() {
        assert_eq!(
            format_row(&sample()),
            "AAPL       | 2023-03-01   | 2023-09-12   | 100.00       | 125.00       | 25.00       % | 250.00         "
        );
        assert_eq!(
            header_line(),
            "Ticker     | Entry Date   | Exit Date    | Entry Price  | Exit Price   | P/L %        | P/L ($)        "
        );
    }

    #[test]
    fn render_then_parse_recovers_trades() {
        let loser = Trade::close("MSFT", d(2023, 1, 5), 250.0, d(2023, 2, 1), 240.0, 1000.0);
        let text = render(&[sample(), loser.clone()]);
        assert_eq!(text.lines().nth(1).unwrap(), "-".repeat(100));

        let parsed = parse_ledger(&text);
        assert_eq!(parsed.len(), 2);
        // Sorted by entry date.
        assert_eq!(parsed[0].ticker, "MSFT");
        assert!((parsed[0].pl_pct - -0.04).abs() < 1e-9);
        assert!((parsed[0].pl_abs - -40.0).abs() < 1e-9);
        assert_eq!(parsed[1].exit_date, d(2023, 9, 12));
    }

    #[test]
    fn bad_rows_are_dropped() {
        let text = format!(
            "{}\n{}\n{}\nGARBAGE | x | y | z | 1 | 2% | 3\nAAPL | 2023-01-01 | 2023-02-01 | abc | 1 | 2% | 3\n\n",
            header_line(),
            "-".repeat(100),
            format_row(&sample()),
        );
        let parsed = parse_ledger(&text);
        assert_eq!(parsed, vec![sample_rounded()]);
    }

    /// `sample()` after a trip through two-decimal formatting.
    fn sample_rounded() -> Trade {
        Trade {
            pl_pct: 0.25,
            pl_abs: 250.0,
            ..sample()
        }
    }

    #[test]
    fn ledger_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LEDGER_FILE);
        write_ledger(&path, &[sample()]).unwrap();
        assert_eq!(read_ledger(&path).unwrap(), vec![sample_rounded()]);
    }

    #[test]
    fn missing_ledger_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_ledger(&dir.path().join("nope.txt")),
            Err(LedgerError::Read { .. })
        ));
    }
}
