//! Yahoo Finance price history adapter.
//!
//! Fetches daily bars from Yahoo's v8 chart API and adjusts OHLC by the
//! adjusted-close factor, so splits and dividends are folded into the prices.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes;
//! any payload we cannot read surfaces as `ResponseFormatChanged`.

use super::frame::{Field, RawFrame};
use super::http;
use super::provider::{DataError, DateRange, SourceAdapter, SourceKind};
use super::schema::PRICE;
use chrono::NaiveTime;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance daily price adapter.
pub struct YahooAdapter {
    client: reqwest::blocking::Client,
}

impl YahooAdapter {
    pub fn new() -> Result<Self, DataError> {
        Ok(Self {
            client: http::build_client()?,
        })
    }

    /// Query parameters for an inclusive date range.
    fn query(range: DateRange) -> Vec<(&'static str, String)> {
        let start_ts = range.start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = range.end.and_time(NaiveTime::MIN).and_utc().timestamp() + 86_399;
        vec![
            ("period1", start_ts.to_string()),
            ("period2", end_ts.to_string()),
            ("interval", "1d".to_string()),
            ("includeAdjustedClose", "true".to_string()),
        ]
    }
}

impl SourceAdapter for YahooAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::YahooFinance
    }

    fn fetch(&self, ticker: &str, range: DateRange) -> Result<RawFrame, DataError> {
        debug!(ticker, %range, "yahoo chart request");
        let url = format!("{CHART_URL}/{ticker}");
        let resp = http::get(&self.client, &url, &Self::query(range))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(DataError::no_data(ticker));
        }
        if !resp.status().is_success() {
            return Err(http::status_error(resp));
        }

        let body = http::body_text(resp)?;
        parse_chart(ticker, &body)
    }
}

/// Parse a chart API payload into a PRICE-shaped frame.
pub fn parse_chart(ticker: &str, body: &str) -> Result<RawFrame, DataError> {
    let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
        DataError::ResponseFormatChanged(format!("failed to parse chart for {ticker}: {e}"))
    })?;

    let result = match resp.chart.result {
        Some(result) => result,
        None => {
            return Err(match resp.chart.error {
                Some(err) if err.code == "Not Found" => DataError::no_data(ticker),
                Some(err) => {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
                None => DataError::ResponseFormatChanged("empty result with no error".into()),
            })
        }
    };

    let mut frame = RawFrame::new(PRICE.required.iter().copied());

    let Some(data) = result.into_iter().next() else {
        return Ok(frame);
    };
    // Yahoo omits timestamps entirely when the range holds no trading days.
    let Some(timestamps) = data.timestamp else {
        return Ok(frame);
    };

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();

        // Holidays and halted sessions come back as all-null rows
        if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none()
        {
            continue;
        }

        let adj_close = adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten());
        let factor = match (adj_close, close) {
            (Some(adj), Some(c)) if c != 0.0 => adj / c,
            _ => 1.0,
        };
        let adjust = |v: Option<f64>| Field::opt_float(v.map(|p| p * factor));

        frame.push_row(vec![
            Field::Date(date),
            adjust(open),
            adjust(high),
            adjust(low),
            adjust(close),
            Field::opt_int(volume.map(|v| v as i64)),
        ]);
    }

    Ok(frame)
}
