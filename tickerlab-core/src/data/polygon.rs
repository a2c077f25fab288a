//! Polygon.io aggregates adapter.
//!
//! One request per ticker against `/v2/aggs/ticker/{t}/range/{mult}/{span}/{from}/{to}`
//! with `sort=asc` and the maximum page size. Results beyond one page are not
//! followed.

use super::frame::{Field, RawFrame};
use super::http;
use super::provider::{DataError, DateRange, SourceAdapter, SourceKind};
use super::schema::PRICE;
use serde::Deserialize;
use tracing::debug;

const AGGS_URL: &str = "https://api.polygon.io/v2/aggs/ticker";
const PAGE_LIMIT: u32 = 50_000;

#[derive(Debug, Deserialize)]
struct AggsResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    results: Option<Vec<AggBar>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AggBar {
    /// Window start, Unix milliseconds.
    t: i64,
    o: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    c: Option<f64>,
    v: Option<f64>,
}

/// Polygon aggregates adapter. `multiplier` and `timespan` follow Polygon's
/// own vocabulary (`minute`, `hour`, `day`, `week`, `month`, `quarter`, `year`).
pub struct PolygonAdapter {
    client: reqwest::blocking::Client,
    api_key: String,
    multiplier: u32,
    timespan: String,
}

impl PolygonAdapter {
    pub fn new(
        api_key: impl Into<String>,
        multiplier: u32,
        timespan: impl Into<String>,
    ) -> Result<Self, DataError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DataError::Config("Polygon API key is empty".into()));
        }
        Ok(Self {
            client: http::build_client()?,
            api_key,
            multiplier: multiplier.max(1),
            timespan: timespan.into(),
        })
    }

    fn url(&self, ticker: &str, range: DateRange) -> String {
        format!(
            "{AGGS_URL}/{ticker}/range/{}/{}/{}/{}",
            self.multiplier, self.timespan, range.start, range.end
        )
    }
}

impl SourceAdapter for PolygonAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Polygon
    }

    fn fetch(&self, ticker: &str, range: DateRange) -> Result<RawFrame, DataError> {
        debug!(ticker, %range, timespan = %self.timespan, "polygon aggregates request");
        let query = [
            ("apiKey", self.api_key.clone()),
            ("sort", "asc".to_string()),
            ("limit", PAGE_LIMIT.to_string()),
        ];
        let resp = http::get(&self.client, &self.url(ticker, range), &query)?;
        if !resp.status().is_success() {
            return Err(http::status_error(resp));
        }
        let body = http::body_text(resp)?;
        parse_aggs(ticker, &body, is_intraday(&self.timespan))
    }
}

/// Sub-daily timespans keep the time of day in `DATE`.
pub fn is_intraday(timespan: &str) -> bool {
    matches!(timespan, "second" | "minute" | "hour")
}

/// Parse an aggregates payload into a PRICE-shaped frame.
pub fn parse_aggs(ticker: &str, body: &str, intraday: bool) -> Result<RawFrame, DataError> {
    let resp: AggsResponse = serde_json::from_str(body).map_err(|e| {
        DataError::ResponseFormatChanged(format!("failed to parse aggregates for {ticker}: {e}"))
    })?;

    if resp.status.as_deref() == Some("ERROR") {
        let detail = resp
            .error
            .or(resp.message)
            .unwrap_or_else(|| "unknown error".into());
        return Err(DataError::ResponseFormatChanged(detail));
    }

    let mut frame = RawFrame::new(PRICE.required.iter().copied());
    if resp.status.as_deref() == Some("NOT_FOUND") {
        return Ok(frame);
    }

    for bar in resp.results.unwrap_or_default() {
        let ts = chrono::DateTime::from_timestamp_millis(bar.t).ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("invalid timestamp: {}", bar.t))
        })?;
        let date = if intraday {
            Field::DateTime(ts.naive_utc())
        } else {
            Field::Date(ts.naive_utc().date())
        };
        frame.push_row(vec![
            date,
            Field::opt_float(bar.o),
            Field::opt_float(bar.h),
            Field::opt_float(bar.l),
            Field::opt_float(bar.c),
            Field::opt_int(bar.v.map(|v| v.round() as i64)),
        ]);
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAILY: &str = r#"{
        "ticker": "AAPL", "status": "OK", "resultsCount": 2,
        "results": [
            {"v": 1.5e6, "vw": 185.1, "o": 187.15, "c": 185.64, "h": 188.44, "l": 183.89, "t": 1704171600000, "n": 1008871},
            {"v": 2.0e6, "vw": 184.3, "o": 184.22, "c": 184.25, "h": 185.88, "l": 183.43, "t": 1704258000000, "n": 656853}
        ]
    }"#;

    #[test]
    fn daily_bars_use_calendar_dates() {
        let frame = parse_aggs("AAPL", DAILY, false).unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.rows()[0][0].to_string(), "2024-01-02");
        assert_eq!(frame.rows()[0][4], Field::Float(185.64));
        assert_eq!(frame.rows()[1][5], Field::Int(2_000_000));
    }

    #[test]
    fn intraday_bars_keep_the_time() {
        let frame = parse_aggs("AAPL", DAILY, true).unwrap();
        assert_eq!(frame.rows()[0][0].to_string(), "2024-01-02 05:00:00");
    }

    #[test]
    fn not_found_and_empty_results_are_empty_frames() {
        let frame = parse_aggs("ZZZZ", r#"{"status":"NOT_FOUND"}"#, false).unwrap();
        assert!(frame.is_empty());
        let frame = parse_aggs("AAPL", r#"{"status":"OK","resultsCount":0}"#, false).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn error_status_is_a_provider_error() {
        let err = parse_aggs("AAPL", r#"{"status":"ERROR","error":"Unknown API Key"}"#, false)
            .unwrap_err();
        assert_eq!(err, DataError::ResponseFormatChanged("Unknown API Key".into()));
    }

    #[test]
    fn timespan_classification() {
        assert!(is_intraday("minute"));
        assert!(!is_intraday("day"));
        assert!(!is_intraday("week"));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(
            PolygonAdapter::new("  ", 1, "day"),
            Err(DataError::Config(_))
        ));
    }
}
