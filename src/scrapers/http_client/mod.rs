//! HTTP client for server-rendered category pages.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use super::config::{HttpConfig, DEFAULT_USER_AGENT};
use super::ScrapeError;

/// Short-lived GET client; no pagination, no retries.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Client with the default agent.
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        Self::with_user_agent(timeout, DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(timeout: Duration, user_agent: &str) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self, ScrapeError> {
        Self::with_user_agent(Duration::from_secs(config.timeout_secs), config.user_agent())
    }

    /// Wrap a pre-built client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetch the server-rendered markup of `url`.
    ///
    /// Non-success statuses surface as transport errors.
    pub async fn fetch_static(&self, url: &str) -> Result<String, ScrapeError> {
        let parsed = parse_http_url(url)?;
        info!("Fetching {}", parsed);
        let response = self.client.get(parsed).send().await?.error_for_status()?;
        let body = response.text().await?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

fn parse_http_url(url: &str) -> Result<Url, ScrapeError> {
    let invalid = |reason: String| ScrapeError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(invalid(format!("unsupported scheme {}", other))),
    }
}
