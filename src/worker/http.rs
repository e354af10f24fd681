//! HTTP boundary used by the network-facing subtasks

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::HttpSettings;
use crate::fulfillment::{CancellationFlag, Credentials};
use crate::subtasks::FulfillmentError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Response larger than {limit} bytes")]
    TooLarge { limit: u64, actual: u64 },
}

impl From<FetchError> for FulfillmentError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::TooLarge { limit, actual } => FulfillmentError::TooLarge { actual, limit },
            other => FulfillmentError::Http(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// One GET request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub auth: Option<Credentials>,
    pub accept: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: None,
            accept: None,
        }
    }

    pub fn with_auth(mut self, auth: Option<Credentials>) -> Self {
        self.auth = auth;
        self
    }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<Bytes>;
}

/// Run `request` unless `cancellation` fires first. Returns `None` when
/// cancelled; the in-flight request and any retry backoff are dropped.
pub async fn fetch_until_cancelled(
    fetcher: &dyn Fetcher,
    request: FetchRequest,
    cancellation: &CancellationFlag,
) -> Option<Result<Bytes>> {
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => None,
        result = fetcher.fetch(request) => Some(result),
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub user_agent: String,
    pub max_body_bytes: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_retries: 3,
            user_agent: concat!("opds-fulfill/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: 512 * 1024 * 1024,
        }
    }
}

impl From<&HttpSettings> for HttpConfig {
    fn from(settings: &HttpSettings) -> Self {
        Self {
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            max_retries: settings.max_retries,
            user_agent: settings.user_agent.clone(),
            max_body_bytes: settings.max_download_bytes.as_u64(),
        }
    }
}

/// reqwest-backed fetcher with retry and exponential backoff
pub struct HttpFetcher {
    client: Client,
    config: HttpConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    async fn fetch_once(&self, request: &FetchRequest) -> Result<Bytes> {
        debug!(url = %request.url, "Starting fetch");

        let mut builder = self.client.get(&request.url);
        if let Some(accept) = &request.accept {
            builder = builder.header(reqwest::header::ACCEPT, accept);
        }
        builder = apply_auth(builder, request.auth.as_ref());

        let mut response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_builder() {
                FetchError::InvalidUrl(request.url.clone())
            } else {
                FetchError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        let limit = self.config.max_body_bytes;
        if let Some(length) = response.content_length() {
            if length > limit {
                return Err(FetchError::TooLarge {
                    limit,
                    actual: length,
                });
            }
        }

        // Chunked responses carry no length; stop as soon as the limit is passed
        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::RequestFailed(format!("Failed to read body: {}", e)))?
        {
            let actual = (body.len() + chunk.len()) as u64;
            if actual > limit {
                return Err(FetchError::TooLarge { limit, actual });
            }
            body.extend_from_slice(&chunk);
        }
        let bytes = body.freeze();

        debug!(url = %request.url, size = bytes.len(), "Fetch completed");
        Ok(bytes)
    }
}

fn apply_auth(builder: RequestBuilder, auth: Option<&Credentials>) -> RequestBuilder {
    match auth {
        Some(Credentials::Basic { username, password }) => {
            builder.basic_auth(username, Some(password))
        }
        Some(Credentials::Bearer(token)) => builder.bearer_auth(token),
        None => builder,
    }
}

/// Client errors other than rate limiting will not improve on retry.
fn is_retryable(err: &FetchError) -> bool {
    match err {
        FetchError::Status { status, .. } => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
        }
        FetchError::Timeout | FetchError::RequestFailed(_) => true,
        FetchError::InvalidUrl(_) | FetchError::TooLarge { .. } => false,
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<Bytes> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.fetch_once(&request).await {
                Ok(bytes) => {
                    if attempts > 1 {
                        debug!(url = %request.url, attempts, "Fetch succeeded after retry");
                    }
                    return Ok(bytes);
                }
                Err(e) if !is_retryable(&e) || attempts >= self.config.max_retries => {
                    warn!(url = %request.url, attempts, error = %e, "Fetch failed");
                    return Err(e);
                }
                Err(e) => {
                    warn!(url = %request.url, attempts, error = %e, "Fetch failed, retrying");

                    // 1s, 2s, 4s, ...
                    let backoff = Duration::from_secs(2u64.pow(attempts - 1));
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
