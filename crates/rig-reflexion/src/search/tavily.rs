//! Tavily search provider
//!
//! - Every attempt waits for a token from a shared [`TokenBucketLimiter`]
//! - Transient failures (timeout, connect, 429, 5xx) retry with exponential backoff
//! - Everything else is returned on the first attempt

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::SearchProvider;
use crate::error::SearchError;
use crate::safety::TokenBucketLimiter;
use crate::state::SearchResult;

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Tavily accepts 1..=20 results per request
const MAX_RESULTS_LIMIT: usize = 20;

/// Tavily Search API client
pub struct TavilySearch {
    api_key: String,
    client: Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    limiter: Option<Arc<TokenBucketLimiter>>,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            limiter: None,
        }
    }

    /// Create from environment variable TAVILY_API_KEY
    pub fn from_env() -> Result<Self, SearchError> {
        let api_key = std::env::var("TAVILY_API_KEY")
            .map_err(|_| SearchError::MissingApiKey("TAVILY_API_KEY".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Point at a different API host (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<TokenBucketLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Post `request`, retrying transient failures up to `max_retries` times.
    /// Every attempt takes a limiter token.
    async fn send_with_retry(&self, request: &TavilyRequest<'_>) -> Result<TavilyResponse, SearchError> {
        let mut retries = 0;
        loop {
            if let Some(limiter) = &self.limiter {
                limiter.acquire(1).await;
            }

            let error = match self.send(request).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };
            if !error.is_retryable() || retries >= self.max_retries {
                return Err(error);
            }

            let delay = self.backoff(retries);
            retries += 1;
            warn!(retries, delay_ms = delay.as_millis() as u64, error = %error, "Tavily request failed, retrying");
            tokio::time::sleep(delay).await;
        }
    }

    /// `base * 2^n`, saturating
    fn backoff(&self, retries: u32) -> Duration {
        self.retry_base_delay.saturating_mul(2u32.saturating_pow(retries))
    }

    async fn send(&self, request: &TavilyRequest<'_>) -> Result<TavilyResponse, SearchError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        response.json().await.map_err(|e| SearchError::ParseError(e.to_string()))
    }
}

fn transport_error(error: reqwest::Error) -> SearchError {
    if error.is_timeout() {
        SearchError::Timeout
    } else if error.is_connect() {
        SearchError::Connection(error.to_string())
    } else {
        SearchError::Network(error.to_string())
    }
}

/// Classify a non-success response. Only 429 and 5xx are retryable.
fn status_error(status: StatusCode, body: String) -> SearchError {
    match status {
        StatusCode::UNAUTHORIZED => SearchError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => SearchError::RateLimited,
        StatusCode::BAD_REQUEST => SearchError::BadRequest(body),
        s if s.is_server_error() => SearchError::ServerError(s.as_u16(), body),
        s => SearchError::HttpError(s.as_u16(), body),
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        let request = TavilyRequest {
            query,
            max_results: max_results.clamp(1, MAX_RESULTS_LIMIT),
            include_raw_content: false,
        };

        debug!(query, max_results = request.max_results, "Tavily search");
        let response = self.send_with_retry(&request).await?;

        Ok(response.results.into_iter().map(SearchResult::from).collect())
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f64,
    raw_content: Option<String>,
}

impl From<TavilyResult> for SearchResult {
    fn from(result: TavilyResult) -> Self {
        Self {
            url: result.url,
            title: result.title,
            content: result.content,
            score: result.score,
            raw_content: result.raw_content,
        }
    }
}
