use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{ByteHandle, ByteSource, FileStat};
use crate::error::{redact_credentials, IoError};

/// Response metadata from a HEAD-equivalent probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadInfo {
    /// Value of `Content-Length`, if the server sent one
    pub content_length: Option<u64>,

    /// Value of `Last-Modified`, if the server sent a parseable one
    pub last_modified: Option<DateTime<Utc>>,
}

/// Outcome of a ranged fetch, as far as the server's reply shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeReply {
    /// `206 Partial Content`, or a reply whose `Content-Range` starts at the
    /// requested offset: the bytes at `range.start..`
    Partial(Bytes),

    /// `200 OK` without a matching `Content-Range`: the server ignored the
    /// `Range` header and sent the resource from offset 0
    Whole(Bytes),

    /// `416 Range Not Satisfiable`: the offset is at or past the end
    Unsatisfiable,
}

/// Minimal HTTP capability needed by [`RemoteSource`].
///
/// Implementations are responsible for bounding wait time and must surface
/// timeouts as `IoError::Transient` rather than blocking indefinitely.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Probe a URL without transferring its body.
    async fn head(&self, url: &str) -> Result<HeadInfo, IoError>;

    /// Fetch the half-open byte range `range` of a URL.
    ///
    /// Implementations must not hold more than `range.end - range.start`
    /// bytes of body: once a reply is known to be longer they stop reading
    /// and fail with `IoError::BufferOverflow`.
    async fn get_range(&self, url: &str, range: Range<u64>) -> Result<RangeReply, IoError>;
}

/// Error for a server that answered a ranged request at `offset > 0` with
/// the resource from its start.
pub fn range_ignored(url: &str, offset: u64) -> IoError {
    IoError::Transport(format!(
        "{}: server ignored Range request at offset {}",
        redact_credentials(url),
        offset
    ))
}

/// Remote HTTP(S) implementation of [`ByteSource`].
///
/// Emulates random access with one ranged fetch per read. Opening a handle
/// makes no network call.
#[derive(Clone)]
pub struct RemoteSource {
    transport: Arc<dyn HttpTransport>,
}

impl RemoteSource {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ByteSource for RemoteSource {
    async fn stat(&self, path: &str) -> Result<FileStat, IoError> {
        let head = self.transport.head(path).await?;

        // Both a modification time and a non-empty body are required before
        // the resource counts as a regular file
        let modified = head.last_modified.filter(|t| t.timestamp() >= 0);
        let size = head.content_length.filter(|&len| len > 0);

        match (modified, size) {
            (Some(modified), Some(size)) => Ok(FileStat {
                is_regular: true,
                size,
                modified,
            }),
            _ => {
                debug!(
                    url = %redact_credentials(path),
                    content_length = ?head.content_length,
                    last_modified = ?head.last_modified,
                    "Remote probe incomplete, treating as not found"
                );
                Err(IoError::NotFound(redact_credentials(path)))
            }
        }
    }

    async fn open(&self, path: &str) -> Result<Box<dyn ByteHandle>, IoError> {
        Ok(Box::new(RemoteHandle {
            url: path.to_string(),
            transport: Some(Arc::clone(&self.transport)),
            cursor: 0,
            end: None,
        }))
    }

    async fn expand(&self, _pattern: &str) -> Result<Vec<String>, IoError> {
        Err(IoError::Unsupported("pattern expansion on remote sources"))
    }

    fn is_remote(&self) -> bool {
        true
    }
}

/// Read cursor over a remote resource.
///
/// The cursor only moves after a bounds-checked copy succeeds.
struct RemoteHandle {
    url: String,
    transport: Option<Arc<dyn HttpTransport>>,
    cursor: u64,
    /// Known resource length, once a server has sent it whole
    end: Option<u64>,
}

#[async_trait]
impl ByteHandle for RemoteHandle {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        let transport = self.transport.as_ref().ok_or(IoError::Closed)?;
        if buf.is_empty() {
            return Ok(0);
        }
        if self.end.is_some_and(|end| self.cursor >= end) {
            return Ok(0);
        }

        let range = self.cursor..self.cursor + buf.len() as u64;
        let data = match transport.get_range(&self.url, range).await? {
            RangeReply::Partial(data) => data,
            RangeReply::Whole(data) => {
                // Bytes from offset 0 are only usable while the cursor is there
                if self.cursor > 0 {
                    return Err(range_ignored(&self.url, self.cursor));
                }
                if data.len() <= buf.len() {
                    self.end = Some(data.len() as u64);
                }
                data
            }
            RangeReply::Unsatisfiable => return Ok(0),
        };

        if data.len() > buf.len() {
            return Err(IoError::BufferOverflow {
                capacity: buf.len(),
                received: data.len(),
            });
        }

        buf[..data.len()].copy_from_slice(&data);
        self.cursor += data.len() as u64;
        debug!(
            url = %redact_credentials(&self.url),
            bytes = data.len(),
            cursor = self.cursor,
            "Ranged read"
        );
        Ok(data.len())
    }

    async fn close(&mut self) {
        self.transport.take();
    }

    fn position(&self) -> u64 {
        self.cursor
    }
}
