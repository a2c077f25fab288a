//! Google Trends interest-over-time adapter.
//!
//! Trends has no public API. A fetch is two requests: `explore` returns a set of
//! widgets, the TIMESERIES widget carries a token and a request blob, and those
//! are replayed against `widgetdata/multiline`. Both payloads start with an
//! anti-XSSI prefix (`)]}'`) that has to be cut before JSON parsing.

use super::frame::{Field, RawFrame};
use super::http;
use super::provider::{DataError, DateRange, SourceAdapter, SourceKind};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const EXPLORE_URL: &str = "https://trends.google.com/trends/api/explore";
const MULTILINE_URL: &str = "https://trends.google.com/trends/api/widgetdata/multiline";
const HOST_LANGUAGE: &str = "en-US";
const TZ_OFFSET: &str = "360";

#[derive(Debug, Deserialize)]
struct ExploreResponse {
    widgets: Vec<Widget>,
}

#[derive(Debug, Deserialize)]
struct Widget {
    id: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    request: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct MultilineResponse {
    default: Timeline,
}

#[derive(Debug, Deserialize)]
struct Timeline {
    #[serde(rename = "timelineData", default)]
    timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Deserialize)]
struct TimelinePoint {
    /// Unix seconds, as a string.
    time: String,
    #[serde(default)]
    value: Vec<i64>,
}

/// Token and request blob lifted from the TIMESERIES widget.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetToken {
    pub token: String,
    pub request: Value,
}

/// Interest-over-time adapter. The ticker is used as the search keyword.
pub struct TrendsAdapter {
    client: reqwest::blocking::Client,
    timeframe: Option<String>,
}

impl TrendsAdapter {
    /// `timeframe` overrides the range-derived window (e.g. `"today 3-m"`).
    pub fn new(timeframe: Option<String>) -> Result<Self, DataError> {
        Ok(Self {
            client: http::build_client()?,
            timeframe,
        })
    }

    fn timeframe_for(&self, range: DateRange) -> String {
        self.timeframe
            .clone()
            .unwrap_or_else(|| format!("{} {}", range.start, range.end))
    }

    fn explore(&self, keyword: &str, timeframe: &str) -> Result<WidgetToken, DataError> {
        let req = json!({
            "comparisonItem": [{ "keyword": keyword, "geo": "", "time": timeframe }],
            "category": 0,
            "property": "",
        });
        let query = [
            ("hl", HOST_LANGUAGE.to_string()),
            ("tz", TZ_OFFSET.to_string()),
            ("req", req.to_string()),
        ];
        let resp = http::get(&self.client, EXPLORE_URL, &query)?;
        if !resp.status().is_success() {
            return Err(http::status_error(resp));
        }
        parse_explore(&http::body_text(resp)?)
    }
}

impl SourceAdapter for TrendsAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::GoogleTrends
    }

    fn fetch(&self, ticker: &str, range: DateRange) -> Result<RawFrame, DataError> {
        let timeframe = self.timeframe_for(range);
        debug!(keyword = ticker, %timeframe, "trends explore request");
        let widget = self.explore(ticker, &timeframe)?;
        let query = [
            ("hl", HOST_LANGUAGE.to_string()),
            ("tz", TZ_OFFSET.to_string()),
            ("req", widget.request.to_string()),
            ("token", widget.token),
        ];
        let resp = http::get(&self.client, MULTILINE_URL, &query)?;
        if !resp.status().is_success() {
            return Err(http::status_error(resp));
        }
        parse_multiline(&http::body_text(resp)?)
    }
}

/// Drop everything before the first `{`.
fn strip_xssi(body: &str) -> &str {
    body.find('{').map_or(body, |i| &body[i..])
}

/// Extract the TIMESERIES widget from an explore payload.
pub fn parse_explore(body: &str) -> Result<WidgetToken, DataError> {
    let resp: ExploreResponse = serde_json::from_str(strip_xssi(body))
        .map_err(|e| DataError::ResponseFormatChanged(format!("explore payload: {e}")))?;
    let widget = resp
        .widgets
        .into_iter()
        .find(|w| w.id == "TIMESERIES")
        .ok_or_else(|| DataError::ResponseFormatChanged("no TIMESERIES widget".into()))?;
    match (widget.token, widget.request) {
        (Some(token), Some(request)) => Ok(WidgetToken { token, request }),
        _ => Err(DataError::ResponseFormatChanged(
            "TIMESERIES widget without token".into(),
        )),
    }
}

/// Parse a multiline payload into a `DATE,INTEREST` frame.
pub fn parse_multiline(body: &str) -> Result<RawFrame, DataError> {
    let resp: MultilineResponse = serde_json::from_str(strip_xssi(body))
        .map_err(|e| DataError::ResponseFormatChanged(format!("multiline payload: {e}")))?;

    let mut frame = RawFrame::new(["DATE", "INTEREST"]);
    for point in resp.default.timeline_data {
        let secs: i64 = point.time.parse().map_err(|_| {
            DataError::ResponseFormatChanged(format!("invalid timeline time: {}", point.time))
        })?;
        let date = chrono::DateTime::from_timestamp(secs, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {secs}")))?;
        frame.push_row(vec![
            Field::Date(date),
            Field::opt_int(point.value.first().copied()),
        ]);
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explore_yields_timeseries_token() {
        let body = r#")]}'
{"widgets":[
  {"id":"GEO_MAP","token":"geo"},
  {"id":"TIMESERIES","token":"APP6_abc","request":{"time":"2023-01-01 2024-01-01","resolution":"WEEK"}}
]}"#;
        let widget = parse_explore(body).unwrap();
        assert_eq!(widget.token, "APP6_abc");
        assert_eq!(widget.request["resolution"], "WEEK");
    }

    #[test]
    fn explore_without_timeseries_is_format_change() {
        let err = parse_explore(r#")]}' {"widgets":[]}"#).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn multiline_parses_weekly_points() {
        let body = r#")]}',
{"default":{"timelineData":[
  {"time":"1672531200","formattedTime":"Jan 1 - 7, 2023","value":[57],"hasData":[true]},
  {"time":"1673136000","formattedTime":"Jan 8 - 14, 2023","value":[63],"hasData":[true],"isPartial":true}
],"averages":[]}}"#;
        let frame = parse_multiline(body).unwrap();
        assert_eq!(frame.columns(), ["DATE", "INTEREST"]);
        assert_eq!(frame.rows()[0][0].to_string(), "2023-01-01");
        assert_eq!(frame.rows()[1][1], Field::Int(63));
    }

    #[test]
    fn empty_timeline_is_an_empty_frame() {
        let frame = parse_multiline(r#")]}', {"default":{"timelineData":[]}}"#).unwrap();
        assert!(frame.is_empty());
    }
}
