//! Single-URL HTTP GET with bounded retries.
//!
//! Every outbound request in doccrawl goes through [`Fetcher::fetch`]. The
//! retry policy is the same for all sources:
//! - at most `max_attempts` attempts in total
//! - 404 is final on the first attempt
//! - rate limiting waits for `Retry-After` (+1s) when the server sends it,
//!   otherwise `base_delay * attempt`
//! - any other HTTP error or transport failure waits `base_delay * attempt`
//! - no single wait exceeds [`MAX_RETRY_WAIT`]
//!
//! Interpreting the body (JSON, XML, HTML) is left to the caller; a body that
//! does not parse is never retried.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use tracing::{debug, error, warn};

use doccrawl_shared::{DocCrawlError, Result};

/// Maximum number of redirects to follow per request.
const MAX_REDIRECTS: usize = 5;

/// Extra wait added on top of a server-provided `Retry-After`.
const RETRY_AFTER_BUFFER: Duration = Duration::from_secs(1);

/// Longest single wait between attempts, whatever the server asks for.
pub const MAX_RETRY_WAIT: Duration = Duration::from_secs(15 * 60);

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How many times to try a request and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first try).
    pub max_attempts: u32,
    /// Delay unit; attempt `n` is followed by a wait of `n * base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// How long to wait after failed attempt number `attempt` (1-based).
    ///
    /// Never longer than [`MAX_RETRY_WAIT`].
    pub fn delay_after(&self, err: &DocCrawlError, attempt: u32) -> Duration {
        let wanted = match err {
            DocCrawlError::RateLimited {
                retry_after: Some(secs),
                ..
            } => Duration::from_secs(*secs).saturating_add(RETRY_AFTER_BUFFER),
            _ => self.base_delay.saturating_mul(attempt),
        };
        if wanted > MAX_RETRY_WAIT {
            warn!(
                requested_secs = wanted.as_secs(),
                cap_secs = MAX_RETRY_WAIT.as_secs(),
                "retry delay capped"
            );
            return MAX_RETRY_WAIT;
        }
        wanted
    }
}

// ---------------------------------------------------------------------------
// FetcherConfig / FetchedResponse
// ---------------------------------------------------------------------------

/// Everything needed to build a [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Headers sent with every request (besides `User-Agent`).
    pub headers: Vec<(String, String)>,
    pub retry: RetryPolicy,
}

/// A successful (2xx/3xx) response with its body read.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    /// Lower-cased `Content-Type` header, if present.
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedResponse {
    /// Whether the `Content-Type` header says this is HTML.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("html"))
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// HTTP client wrapper that applies [`RetryPolicy`] to every GET.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
    authenticated: bool,
}

impl Fetcher {
    /// Build a fetcher with the given headers, timeout, and retry policy.
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| DocCrawlError::config(format!("invalid header name {name:?}: {e}")))?;
            let mut value = HeaderValue::from_str(value)
                .map_err(|e| DocCrawlError::config(format!("invalid value for header {name}: {e}")))?;
            if name == reqwest::header::AUTHORIZATION {
                value.set_sensitive(true);
            }
            headers.insert(name, value);
        }
        let authenticated = headers.contains_key(reqwest::header::AUTHORIZATION);

        let client = Client::builder()
            .user_agent(config.user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(config.timeout)
            .build()
            .map_err(|e| DocCrawlError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry: config.retry,
            authenticated,
        })
    }

    /// Whether requests carry an `Authorization` header.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// GET `url`, retrying transient failures per the [`RetryPolicy`].
    ///
    /// Each failed attempt is logged once; the final error is returned.
    pub async fn fetch(&self, url: &str) -> Result<FetchedResponse> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match self.attempt(url).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            warn!(%url, attempt, max_attempts, error = %err, "fetch attempt failed");

            if !err.is_retryable() || attempt >= max_attempts {
                error!(%url, attempts = attempt, error = %err, "giving up");
                return Err(err);
            }

            let delay = self.retry.delay_after(&err, attempt);
            if let DocCrawlError::RateLimited { .. } = err {
                warn!(%url, delay_secs = delay.as_secs_f64(), "rate limited, backing off");
            } else {
                debug!(%url, delay_ms = delay.as_millis() as u64, "retrying after delay");
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// One GET, with the response classified into the error taxonomy.
    async fn attempt(&self, url: &str) -> Result<FetchedResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DocCrawlError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_lowercase);

        if status.is_success() || status.is_redirection() {
            let body = response
                .text()
                .await
                .map_err(|e| DocCrawlError::Network(format!("{url}: failed to read body: {e}")))?;
            return Ok(FetchedResponse {
                status: status.as_u16(),
                content_type,
                body,
            });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(DocCrawlError::NotFound {
                url: url.to_string(),
            });
        }

        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();

        if is_rate_limited(status, &body) {
            return Err(DocCrawlError::RateLimited {
                url: url.to_string(),
                retry_after,
            });
        }

        Err(DocCrawlError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// 429 always; 403 only when GitHub says so in the body.
fn is_rate_limited(status: StatusCode, body: &str) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && body.to_lowercase().contains("rate limit exceeded"))
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
