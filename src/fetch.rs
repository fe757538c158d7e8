use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use tracing::{debug, error, warn};

/// Hard ceiling for a single request. Per-request timeouts are clamped to it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const LANGUAGE_PREFERENCE: &str = "en-US,en;q=0.9";

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("fetch failed with HTTP {status}")]
    Status { status: u16 },
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("malformed content: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Network-class failures, rate limiting and server errors are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status } => *status == 429 || (500..=599).contains(status),
            FetchError::Timeout | FetchError::Network(_) => true,
            FetchError::InvalidRequest(_) | FetchError::Malformed(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_builder() || e.is_redirect() {
            FetchError::InvalidRequest(e.to_string())
        } else if e.is_decode() {
            FetchError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Status {
                status: status.as_u16(),
            }
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// A single outbound retrieval: a web page, a search API call or an LLM call.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// POSTed as JSON when present; otherwise the request is a GET.
    pub body: Option<serde_json::Value>,
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            body: Some(body),
            ..Self::get(url)
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The caller's timeout, never longer than the fetcher ceiling.
    pub fn effective_timeout(&self, ceiling: Duration) -> Duration {
        self.timeout.map(|t| t.min(ceiling)).unwrap_or(ceiling)
    }
}

#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError>;
}

/// Bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt cap is reached.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, url: &str, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Fetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(url, attempt, error = %e, "Fetch failed");
                return Err(e);
            }
        }
    }
}

/// reqwest-backed fetcher with a browser-like identity.
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
    timeout: Duration,
    /// Courtesy pause after every completed call.
    pause: Duration,
}

impl HttpFetcher {
    pub fn new(retry: RetryPolicy, pause: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(LANGUAGE_PREFERENCE));

        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(DEFAULT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            retry,
            timeout: DEFAULT_TIMEOUT,
            pause,
        })
    }

    async fn send_once(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let mut builder = match &request.body {
            Some(body) => self.client.post(&request.url).json(body),
            None => self.client.get(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
            // Caller headers replace the client defaults (User-Agent, Accept-Language).
            if name == USER_AGENT || name == ACCEPT_LANGUAGE {
                debug!(header = %name, "Overriding default client header");
            }
            builder = builder.header(name, value);
        }

        let resp = builder
            .timeout(request.effective_timeout(self.timeout))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        Ok(resp.text().await?)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let result = with_retry(&self.retry, &request.url, || self.send_once(request)).await;
        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }
        result
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Serves canned bodies by URL and records every request. Unknown URLs 404.
    #[derive(Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, Result<String, FetchError>>,
        pub requests: Mutex<Vec<FetchRequest>>,
    }

    impl StaticFetcher {
        pub fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), Ok(body.to_string()));
            self
        }

        pub fn failing(mut self, url: &str, error: FetchError) -> Self {
            self.pages.insert(url.to_string(), Err(error));
            self
        }

        pub fn requests(&self) -> Vec<FetchRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetch for StaticFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
            self.requests.lock().unwrap().push(request.clone());
            self.pages
                .get(&request.url)
                .cloned()
                .unwrap_or(Err(FetchError::Status { status: 404 }))
        }
    }
}
