use async_trait::async_trait;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::ReadAt;
use crate::error::{FetchError, OpenError};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for [`HttpRangeReader`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout. `None` lets a stalled server block a read forever.
    pub timeout: Option<Duration>,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP Range reader for a fixed-size remote object
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    requests: AtomicU64,
    transferred_bytes: AtomicU64,
}

impl HttpRangeReader {
    /// Open a remote object with default settings.
    pub async fn open(url: impl Into<String>) -> Result<Self, OpenError> {
        Self::open_with(url, &HttpConfig::default()).await
    }

    /// Open a remote object.
    ///
    /// Sends a HEAD request to learn the object's size. The object must report
    /// a positive `Content-Length`.
    pub async fn open_with(url: impl Into<String>, config: &HttpConfig) -> Result<Self, OpenError> {
        let url = url.into();

        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(OpenError::Client)?;

        debug!(%url, "probing remote object");
        let resp = client
            .head(&url)
            .send()
            .await
            .map_err(|source| OpenError::Probe {
                url: url.clone(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(OpenError::Status {
                url,
                status: resp.status(),
            });
        }

        let accepts_bytes = resp
            .headers()
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("bytes"));
        if !accepts_bytes {
            warn!(%url, "server did not advertise byte ranges; trying anyway");
        }

        // The header is read directly: a HEAD response has no body, so the
        // client's own body length would always be zero.
        let size: u64 = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| OpenError::UnknownLength { url: url.clone() })?;

        if size == 0 {
            return Err(OpenError::ZeroLength { url });
        }

        debug!(%url, size, "head complete");

        Ok(Self {
            client,
            url,
            size,
            requests: AtomicU64::new(0),
            transferred_bytes: AtomicU64::new(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of ranged requests issued so far.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, FetchError> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        // Half-open span [offset, end), sent as an inclusive HTTP range.
        let end = offset.saturating_add(buf.len() as u64).min(self.size);
        let wanted = (end - offset) as usize;
        let range = format!("bytes={}-{}", offset, end - 1);

        self.requests.fetch_add(1, Ordering::Relaxed);
        debug!(url = %self.url, %range, "range request");

        let mut resp = self
            .client
            .get(&self.url)
            .header(RANGE, &range)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                range: range.clone(),
                source,
            })?;

        let whole_object = offset == 0 && end == self.size;
        let status = resp.status();
        if status != StatusCode::PARTIAL_CONTENT && !(status == StatusCode::OK && whole_object) {
            return Err(FetchError::Status { range, status });
        }

        if status == StatusCode::PARTIAL_CONTENT {
            match resp.headers().get(CONTENT_RANGE) {
                Some(value) => {
                    let got = String::from_utf8_lossy(value.as_bytes()).into_owned();
                    if parse_content_range(&got) != Some((offset, end - 1, self.size)) {
                        return Err(FetchError::WrongRange { range, got });
                    }
                }
                None => warn!(url = %self.url, %range, "partial response without content-range"),
            }
        }

        // `resp` owns the connection; every return below drops it.
        let dst = &mut buf[..wanted];
        let mut got = 0;
        while got < wanted {
            let chunk = resp.chunk().await.map_err(|source| FetchError::Request {
                range: range.clone(),
                source,
            })?;
            let Some(chunk) = chunk else {
                break;
            };
            let n = chunk.len().min(wanted - got);
            dst[got..got + n].copy_from_slice(&chunk[..n]);
            got += n;
        }

        self.transferred_bytes.fetch_add(got as u64, Ordering::Relaxed);

        if got < wanted {
            return Err(FetchError::ShortBody { range, wanted, got });
        }

        Ok(got)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// Parse a `Content-Range: bytes A-B/N` value into `(A, B, N)`.
fn parse_content_range(value: &str) -> Option<(u64, u64, u64)> {
    let (span, total) = value.trim().strip_prefix("bytes ")?.split_once('/')?;
    let (start, end) = span.split_once('-')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?, total.trim().parse().ok()?))
}
