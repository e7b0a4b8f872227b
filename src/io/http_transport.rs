use std::ops::Range;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, NaiveDateTime, Utc};
use http::{header, HeaderMap, StatusCode};

use super::remote::{range_ignored, HeadInfo, HttpTransport, RangeReply};
use crate::error::{redact_credentials, IoError};

/// reqwest-backed implementation of [`HttpTransport`].
///
/// Wait time is bounded by the client's request and connect timeouts; a
/// timeout surfaces as `IoError::Transient`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wrap an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client with explicit timeouts.
    pub fn with_timeouts(
        timeout: Duration,
        connect_timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, IoError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| IoError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn head(&self, url: &str) -> Result<HeadInfo, IoError> {
        let resp = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| map_request_error(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(map_status(url, status));
        }

        Ok(parse_head(resp.headers()))
    }

    async fn get_range(&self, url: &str, range: Range<u64>) -> Result<RangeReply, IoError> {
        if range.is_empty() {
            return Ok(RangeReply::Partial(Bytes::new()));
        }

        // HTTP ranges are inclusive on both ends
        let range_header = format!("bytes={}-{}", range.start, range.end - 1);
        let resp = self
            .client
            .get(url)
            .header(header::RANGE, range_header)
            .send()
            .await
            .map_err(|e| map_request_error(url, e))?;

        let status = resp.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            // Cursor is at or past the end of the resource
            return Ok(RangeReply::Unsatisfiable);
        }
        if !status.is_success() {
            return Err(map_status(url, status));
        }

        let partial = match content_range_start(resp.headers()) {
            Some(start) if start == range.start => true,
            Some(start) => {
                return Err(IoError::Transport(format!(
                    "{}: Content-Range starts at {} for a request at {}",
                    redact_credentials(url),
                    start,
                    range.start
                )))
            }
            None => status == StatusCode::PARTIAL_CONTENT,
        };

        // Checked before the body is read, so the resource is never downloaded
        if !partial && range.start > 0 {
            return Err(range_ignored(url, range.start));
        }

        let body = read_bounded(resp, url, range.end - range.start).await?;
        Ok(if partial {
            RangeReply::Partial(body)
        } else {
            RangeReply::Whole(body)
        })
    }
}

/// Read a response body, giving up as soon as it is known to exceed `limit`.
async fn read_bounded(
    mut resp: reqwest::Response,
    url: &str,
    limit: u64,
) -> Result<Bytes, IoError> {
    let capacity = usize::try_from(limit).unwrap_or(usize::MAX);

    if let Some(len) = resp.content_length() {
        if len > limit {
            return Err(IoError::BufferOverflow {
                capacity,
                received: usize::try_from(len).unwrap_or(usize::MAX),
            });
        }
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = resp.chunk().await.map_err(|e| map_request_error(url, e))? {
        let received = body.len() + chunk.len();
        if received as u64 > limit {
            return Err(IoError::BufferOverflow { capacity, received });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

/// First byte position of a `Content-Range: bytes <start>-<end>/<len>` header.
fn content_range_start(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(header::CONTENT_RANGE)?.to_str().ok()?;
    let (start, _) = value.trim().strip_prefix("bytes ")?.split_once('-')?;
    start.trim().parse().ok()
}

/// Pull `Content-Length` and `Last-Modified` out of a HEAD response.
///
/// The header is read directly because a HEAD body is always empty.
pub(crate) fn parse_head(headers: &HeaderMap) -> HeadInfo {
    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let last_modified = headers
        .get(header::LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_http_date(v.trim()));

    HeadInfo {
        content_length,
        last_modified,
    }
}

/// Parse any of the three HTTP-date forms: IMF-fixdate, RFC 850 and asctime.
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc2822(value) {
        return Some(t.with_timezone(&Utc));
    }
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|t| t.and_utc())
}

fn map_request_error(url: &str, err: reqwest::Error) -> IoError {
    let url = redact_credentials(url);
    // The URL may carry credentials; report the redacted one instead
    let err = err.without_url();
    if err.is_timeout() || err.is_connect() {
        IoError::Transient(format!("{}: {}", url, err))
    } else {
        IoError::Transport(format!("{}: {}", url, err))
    }
}

fn map_status(url: &str, status: StatusCode) -> IoError {
    let url = redact_credentials(url);
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => IoError::NotFound(url),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            IoError::Transient(format!("{}: HTTP {}", url, status))
        }
        s if s.is_server_error() => IoError::Transient(format!("{}: HTTP {}", url, status)),
        _ => IoError::Transport(format!("{}: HTTP {}", url, status)),
    }
}
