//! Shared blocking HTTP plumbing for the network adapters.

use super::provider::DataError;
use reqwest::blocking::{Client, Response};
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Blocking client with a 30 s timeout and a browser user agent.
pub fn build_client() -> Result<Client, DataError> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| DataError::Config(format!("failed to build HTTP client: {e}")))
}

/// Send a GET and map transport failures. Non-2xx statuses are returned to the
/// caller so each adapter can decide what a 404 means.
pub(crate) fn get(client: &Client, url: &str, query: &[(&str, String)]) -> Result<Response, DataError> {
    client
        .get(url)
        .query(query)
        .send()
        .map_err(|e| DataError::NetworkUnreachable(e.to_string()))
}

/// Read the body of a non-2xx response into an `HttpStatus` error.
pub(crate) fn status_error(resp: Response) -> DataError {
    let status = resp.status().as_u16();
    let detail = resp
        .text()
        .map(|t| t.chars().take(200).collect::<String>())
        .unwrap_or_default();
    DataError::HttpStatus { status, detail }
}

/// Read the body as text.
pub(crate) fn body_text(resp: Response) -> Result<String, DataError> {
    resp.text()
        .map_err(|e| DataError::NetworkUnreachable(format!("read body: {e}")))
}
