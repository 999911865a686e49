use crate::job::posting::{JobPosting, PageResponse};
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const MAX_PAGE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Default listing endpoint.
pub const DEFAULT_API_URL: &str = "https://testapi.getlokalapp.com/common/jobs";

/// Errors that can occur while fetching a page of postings.
///
/// The feed treats every variant the same way: the page failed and the
/// previously loaded items stay where they are.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out")]
    Timeout,
    /// Body was not the expected `{ results: [...] }` JSON
    #[error("Parse error: {0}")]
    Parse(String),
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

impl FetchError {
    /// Client-level timeouts surface as [`FetchError::Timeout`], like the
    /// per-attempt deadline.
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err)
        }
    }
}

/// A paginated source of job postings.
///
/// Pages are 1-based. There is no end-of-pages signal; an exhausted source
/// simply keeps returning empty pages.
pub trait PageSource {
    fn fetch_page(&self, page: u32)
        -> impl Future<Output = Result<Vec<JobPosting>, FetchError>> + Send;
}

/// HTTP client for the job listing endpoint.
#[derive(Debug, Clone)]
pub struct JobsClient {
    http: reqwest::Client,
    api_url: Url,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl JobsClient {
    pub fn new(http: reqwest::Client, api_url: Url) -> Self {
        Self {
            http,
            api_url,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }

    /// Time limit for one attempt, from sending the request to the last byte
    /// of the body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries apply to 429, 5xx and truncated bodies. Delay doubles per attempt.
    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = base_delay;
        self
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn page_url(&self, page: u32) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut().append_pair("page", &page.to_string());
        url
    }

    fn backoff(&self, retry_count: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(retry_count))
    }

    /// Fetch one page of postings.
    ///
    /// # Arguments
    ///
    /// * `page` - 1-based page number, sent as the `page` query parameter
    ///
    /// # Behavior
    ///
    /// - Each attempt has one deadline covering the request and the body read
    /// - 429 and 5xx responses are retried with exponential backoff, as are
    ///   bodies shorter than their `Content-Length`
    /// - Other non-2xx statuses fail at once
    /// - Bodies over 10MB are rejected
    ///
    /// # Errors
    ///
    /// * `FetchError::Timeout` - an attempt missed its deadline
    /// * `FetchError::Network` - connection, DNS or TLS failure
    /// * `FetchError::HttpStatus` - non-2xx status (after retries for 5xx)
    /// * `FetchError::RateLimited` - still 429 after all retries
    /// * `FetchError::ResponseTooLarge` / `FetchError::IncompleteResponse`
    /// * `FetchError::Parse` - body is not `{ "results": [...] }`
    async fn fetch(&self, page: u32) -> Result<Vec<JobPosting>, FetchError> {
        let url = self.page_url(page);
        let mut retry_count = 0;

        let bytes = loop {
            // One deadline per attempt, shared by the request and the body read
            let deadline = tokio::time::Instant::now() + self.timeout;
            let response = tokio::time::timeout_at(deadline, self.http.get(url.clone()).send())
                .await
                .map_err(|_| FetchError::Timeout)?
                .map_err(FetchError::from_reqwest)?;

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if retry_count >= self.max_retries {
                    return Err(FetchError::RateLimited(self.max_retries));
                }
                let delay = self.backoff(retry_count);
                tracing::warn!(
                    page,
                    retry = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            if status.is_server_error() {
                if retry_count >= self.max_retries {
                    return Err(FetchError::HttpStatus(status.as_u16()));
                }
                let delay = self.backoff(retry_count);
                tracing::warn!(
                    page,
                    status = %status,
                    retry = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Server error, retrying after delay"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            // 4xx fails immediately
            if !status.is_success() {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            let body = tokio::time::timeout_at(deadline, read_limited_bytes(response, MAX_PAGE_SIZE))
                .await
                .map_err(|_| FetchError::Timeout)?;
            match body {
                Ok(bytes) => break bytes,
                Err(FetchError::IncompleteResponse { expected, received }) => {
                    if retry_count >= self.max_retries {
                        return Err(FetchError::IncompleteResponse { expected, received });
                    }
                    let delay = self.backoff(retry_count);
                    tracing::debug!(
                        page,
                        expected,
                        received,
                        attempt = retry_count + 1,
                        "Retrying incomplete download"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
        };

        let body: PageResponse =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

        tracing::debug!(page, count = body.results.len(), "Fetched job page");
        Ok(body.results)
    }
}

impl PageSource for JobsClient {
    fn fetch_page(
        &self,
        page: u32,
    ) -> impl Future<Output = Result<Vec<JobPosting>, FetchError>> + Send {
        self.fetch(page)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::from_reqwest)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
