//! HTTP transport for AnkiConnect.

use super::{parse_envelope, CardStore, Request};
use crate::error::{Error, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

/// Generous because a large `multi` can keep Anki busy for a while.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// AnkiConnect client over HTTP.
pub struct AnkiClient {
    client: reqwest::Client,
    url: String,
}

impl AnkiClient {
    /// Create a client for the AnkiConnect endpoint at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CardStore for AnkiClient {
    async fn invoke(&self, request: &Request) -> Result<Value> {
        debug!(action = %request.action, url = %self.url, "AnkiConnect request");
        trace!(params = %request.params, "Request params");

        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    Error::AnkiUnreachable(e.to_string())
                } else {
                    Error::Http(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Protocol(format!("HTTP {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Protocol(format!("Failed to parse AnkiConnect response: {e}")))?;

        parse_envelope(&body)
    }
}
