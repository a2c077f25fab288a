//! StockTwits symbol stream adapter.
//!
//! The stream returns the most recent messages for a symbol; it has no date
//! filter, so the requested range is ignored.

use super::frame::{Field, RawFrame};
use super::http;
use super::provider::{DataError, DateRange, SourceAdapter, SourceKind};
use super::schema::MESSAGES;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

const STREAM_URL: &str = "https://api.stocktwits.com/api/2/streams/symbol";

/// Maximum messages per request accepted by the API.
pub const MAX_LIMIT: u32 = 200;

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    id: Option<i64>,
    body: Option<String>,
    created_at: Option<String>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    symbols: Vec<Symbol>,
    #[serde(default)]
    entities: Option<Entities>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: Option<i64>,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Symbol {
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Entities {
    #[serde(default)]
    sentiment: Option<Sentiment>,
}

#[derive(Debug, Deserialize)]
struct Sentiment {
    basic: Option<String>,
}

pub struct StockTwitsAdapter {
    client: reqwest::blocking::Client,
    limit: u32,
}

impl StockTwitsAdapter {
    /// `limit` is clamped to [`MAX_LIMIT`].
    pub fn new(limit: u32) -> Result<Self, DataError> {
        Ok(Self {
            client: http::build_client()?,
            limit: limit.min(MAX_LIMIT),
        })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

impl SourceAdapter for StockTwitsAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::StockTwits
    }

    fn fetch(&self, ticker: &str, _range: DateRange) -> Result<RawFrame, DataError> {
        debug!(ticker, limit = self.limit, "stocktwits stream request");
        let url = format!("{STREAM_URL}/{ticker}.json");
        let resp = http::get(&self.client, &url, &[("limit", self.limit.to_string())])?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(DataError::no_data(ticker));
        }
        if !resp.status().is_success() {
            return Err(http::status_error(resp));
        }
        parse_stream(&http::body_text(resp)?)
    }
}

/// Flatten a stream payload into a MESSAGES-shaped frame.
pub fn parse_stream(body: &str) -> Result<RawFrame, DataError> {
    let resp: StreamResponse = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("stream payload: {e}")))?;

    let mut frame = RawFrame::new(MESSAGES.required.iter().copied());
    for msg in resp.messages {
        let symbols = msg
            .symbols
            .into_iter()
            .filter_map(|s| s.symbol)
            .collect::<Vec<_>>()
            .join(";");
        let sentiment = msg.entities.and_then(|e| e.sentiment).and_then(|s| s.basic);
        let (user_id, username) = match msg.user {
            Some(u) => (u.id, u.username),
            None => (None, None),
        };
        frame.push_row(vec![
            Field::opt_int(msg.id),
            Field::opt_text(msg.body),
            Field::opt_text(msg.created_at),
            Field::opt_text(username),
            Field::opt_int(user_id),
            Field::Text(symbols),
            Field::opt_text(sentiment),
        ]);
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = r#"{
        "symbol": {"symbol": "AAPL"},
        "messages": [
            {
                "id": 555001,
                "body": "$AAPL breaking out",
                "created_at": "2024-01-05T15:30:00Z",
                "user": {"id": 42, "username": "chartist"},
                "symbols": [{"symbol": "AAPL"}, {"symbol": "SPY"}],
                "entities": {"sentiment": {"basic": "Bullish"}}
            },
            {
                "id": 555000,
                "body": "watching",
                "created_at": "2024-01-05T15:29:00Z",
                "user": {"id": 7, "username": "lurker"},
                "symbols": [{"symbol": "AAPL"}],
                "entities": {"sentiment": null}
            }
        ]
    }"#;

    #[test]
    fn messages_are_flattened() {
        let frame = parse_stream(STREAM).unwrap();
        assert_eq!(frame.len(), 2);
        let first = &frame.rows()[0];
        assert_eq!(first[0], Field::Int(555001));
        assert_eq!(first[3], Field::Text("chartist".into()));
        assert_eq!(first[5], Field::Text("AAPL;SPY".into()));
        assert_eq!(first[6], Field::Text("Bullish".into()));
        assert!(frame.rows()[1][6].is_null());
    }

    #[test]
    fn missing_messages_is_an_empty_frame() {
        let frame = parse_stream(r#"{"response":{"status":200}}"#).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn limit_is_clamped() {
        let adapter = StockTwitsAdapter::new(1_000).unwrap();
        assert_eq!(adapter.limit(), MAX_LIMIT);
    }
}
