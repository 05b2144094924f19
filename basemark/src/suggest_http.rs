//! Suggestion source backed by an HTTP completion endpoint.
//!
//! The endpoint receives the cursor context as JSON (camelCase keys) and
//! answers `{ "suggestion": "..." }`. An empty string or `EMPTY` means there is
//! nothing to suggest.

use std::time::Duration;

use async_trait::async_trait;
use basemark_core::error::{CoreError, Result};
use basemark_core::suggest::{SuggestionContext, SuggestionSource};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::Deserialize;

const USER_AGENT_VALUE: &str = concat!("basemark/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct SuggestionResponse {
    #[serde(default)]
    suggestion: String,
}

#[derive(Debug, Clone)]
pub struct HttpSuggestionSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSuggestionSource {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CoreError::Suggestion(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, endpoint: endpoint.into() })
    }
}

#[async_trait]
impl SuggestionSource for HttpSuggestionSource {
    async fn fetch(&self, context: &SuggestionContext) -> Result<Option<String>> {
        tracing::debug!(endpoint = %self.endpoint, line = context.line_number, "requesting suggestion");

        let response = self
            .client
            .post(&self.endpoint)
            .json(context)
            .send()
            .await
            .map_err(|e| CoreError::Suggestion(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::Suggestion(format!("endpoint returned {status}: {body}")));
        }

        let body: SuggestionResponse =
            response.json().await.map_err(|e| CoreError::Suggestion(e.to_string()))?;
        Ok(Some(body.suggestion))
    }
}
