//! Minimal HTTP transport: GET/HEAD/Range with typed errors and deadlines.
//!
//! This is the single place in the workspace that talks `reqwest` directly.
//! Retry, proxy fallthrough, and chunking live one layer up in
//! `fetch-orchestrator`; this crate only knows how to make one request and
//! turn the response into bytes or a typed [`HydroError`].

use std::time::Duration;

use bytes::Bytes;
use hydro_common::HydroError;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

/// Default per-request deadline when the caller doesn't override it.
pub const DEFAULT_DEADLINE_SECS: u64 = 60;

/// An inclusive byte range for a `Range: bytes=start-end` request.
#[derive(Debug, Clone, Copy)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    pub fn from_start(start: u64) -> Self {
        Self { start, end: None }
    }

    pub fn bounded(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    fn header_value(&self) -> String {
        match self.end {
            Some(end) => format!("bytes={}-{}", self.start, end),
            None => format!("bytes={}-", self.start),
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub range: Option<ByteRange>,
    pub deadline_secs: Option<u64>,
}

/// The outcome of a GET/HEAD request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub content_length: Option<u64>,
    pub accepts_ranges: bool,
    pub body: Bytes,
}

/// Thin wrapper over a `reqwest::Client` producing [`HydroError`]s instead
/// of `reqwest::Error`.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, HydroError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| HydroError::TransportError {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// `GET` a URL, optionally with a byte range. Returns the body and the
    /// response metadata needed to drive chunked-download decisions.
    #[instrument(skip(self, options), fields(url = %url))]
    pub async fn get(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, HydroError> {
        let deadline = Duration::from_secs(options.deadline_secs.unwrap_or(DEFAULT_DEADLINE_SECS));

        let mut request = self.client.get(url).timeout(deadline);
        if let Some(range) = options.range {
            request = request.header(reqwest::header::RANGE, range.header_value());
        }

        let response = request.send().await.map_err(|e| classify_send_error(url, e))?;
        let status = response.status();

        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Err(HydroError::HttpError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        classify_status(url, status)?;

        let content_length = content_length_of(&response);
        let accepts_ranges = accepts_ranges_of(&response);

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_send_error(url, e))?;

        debug!(bytes = body.len(), status = %status, "GET complete");

        Ok(HttpResponse {
            status,
            content_length,
            accepts_ranges,
            body,
        })
    }

    /// `HEAD` a URL to probe size and range support without a body transfer.
    #[instrument(skip(self, options), fields(url = %url))]
    pub async fn head(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, HydroError> {
        let deadline = Duration::from_secs(options.deadline_secs.unwrap_or(DEFAULT_DEADLINE_SECS));

        let response = self
            .client
            .head(url)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| classify_send_error(url, e))?;

        let status = response.status();
        classify_status(url, status)?;

        Ok(HttpResponse {
            content_length: content_length_of(&response),
            accepts_ranges: accepts_ranges_of(&response),
            status,
            body: Bytes::new(),
        })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new().expect("default reqwest client configuration is always valid")
    }
}

fn content_length_of(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}

fn accepts_ranges_of(response: &reqwest::Response) -> bool {
    match response.headers().get(reqwest::header::ACCEPT_RANGES) {
        Some(value) => value.to_str().map(|v| v != "none").unwrap_or(true),
        // Many servers omit the header but still honor Range requests.
        None => true,
    }
}

fn classify_status(url: &str, status: StatusCode) -> Result<(), HydroError> {
    match status {
        StatusCode::OK | StatusCode::PARTIAL_CONTENT => Ok(()),
        StatusCode::NOT_FOUND => Err(HydroError::not_found_retention(url, "unknown")),
        StatusCode::FORBIDDEN => Err(HydroError::Forbidden { url: url.to_string() }),
        StatusCode::TOO_MANY_REQUESTS => Err(HydroError::RateLimited { url: url.to_string() }),
        other => Err(HydroError::HttpError {
            url: url.to_string(),
            status: other.as_u16(),
        }),
    }
}

fn classify_send_error(url: &str, err: reqwest::Error) -> HydroError {
    if err.is_timeout() {
        HydroError::Timeout { url: url.to_string() }
    } else {
        HydroError::TransportError {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
