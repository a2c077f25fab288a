//! Synthetic price adapter for offline runs and demos.
//!
//! Produces a weekday random walk from a starting price of 100.0, seeded by the
//! BLAKE3 hash of the ticker so the same ticker always yields the same series.
//! Output is clearly fake and tagged `synthetic` in the file name.

use super::frame::{Field, RawFrame};
use super::provider::{DataError, DateRange, SourceAdapter, SourceKind};
use super::schema::PRICE;
use chrono::{Datelike, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Default)]
pub struct SyntheticAdapter;

impl SyntheticAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SourceAdapter for SyntheticAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Synthetic
    }

    fn fetch(&self, ticker: &str, range: DateRange) -> Result<RawFrame, DataError> {
        Ok(random_walk(ticker, range))
    }
}

/// Deterministic OHLCV walk over the weekdays of `range`.
pub fn random_walk(ticker: &str, range: DateRange) -> RawFrame {
    let seed: [u8; 32] = *blake3::hash(ticker.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut frame = RawFrame::new(PRICE.required.iter().copied());
    let mut price = 100.0_f64;

    for current in range.start.iter_days().take_while(|d| *d <= range.end) {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000i64);

        frame.push_row(vec![
            Field::Date(current),
            Field::Float(open),
            Field::Float(high),
            Field::Float(low),
            Field::Float(close),
            Field::Int(volume),
        ]);
        price = close;
    }

    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
    }

    #[test]
    fn same_ticker_same_series() {
        let r = range((2024, 1, 1), (2024, 3, 31));
        assert_eq!(random_walk("SPY", r), random_walk("SPY", r));
        assert_ne!(random_walk("SPY", r), random_walk("QQQ", r));
    }

    #[test]
    fn weekends_are_skipped_and_bars_are_consistent() {
        // 2024-01-06 and 2024-01-07 are a weekend.
        let frame = random_walk("SPY", range((2024, 1, 1), (2024, 1, 7)));
        assert_eq!(frame.len(), 5);
        for row in frame.rows() {
            let (o, h, l, c) = (
                row[1].as_f64().unwrap(),
                row[2].as_f64().unwrap(),
                row[3].as_f64().unwrap(),
                row[4].as_f64().unwrap(),
            );
            assert!(h >= o.max(c));
            assert!(l <= o.min(c));
        }
    }

    #[test]
    fn weekend_only_range_is_empty() {
        let frame = random_walk("SPY", range((2024, 1, 6), (2024, 1, 7)));
        assert!(frame.is_empty());
    }
}
