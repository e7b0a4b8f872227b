use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::IoError;

/// Result of probing a path on a backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// True for a regular file; directories and special files are false
    pub is_regular: bool,

    /// Size in bytes
    pub size: u64,

    /// Last modification time
    pub modified: DateTime<Utc>,
}

/// Stat/open/expand over one backing store.
///
/// Two implementations exist: [`crate::io::LocalSource`] for the local
/// filesystem and [`crate::io::RemoteSource`] for HTTP(S) range transports.
/// An image source picks one at initialisation time from the path scheme and
/// talks to it only through this trait.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Probe `path`.
    ///
    /// Returns `IoError::NotFound` when the store cannot resolve the path, and
    /// `IoError::Transient` for timeouts and retryable transport failures.
    async fn stat(&self, path: &str) -> Result<FileStat, IoError>;

    /// Open `path` for sequential reading.
    async fn open(&self, path: &str) -> Result<Box<dyn ByteHandle>, IoError>;

    /// Expand a glob pattern into the matching paths, sorted.
    ///
    /// Only pattern-constrained lookups are supported; this is not a general
    /// directory listing.
    async fn expand(&self, pattern: &str) -> Result<Vec<String>, IoError>;

    /// True when this store reaches data over the network.
    fn is_remote(&self) -> bool;
}

/// An open read cursor on one resource.
#[async_trait]
pub trait ByteHandle: Send {
    /// Read up to `buf.len()` bytes at the cursor and advance it.
    ///
    /// Returns the number of bytes copied; zero means end of data. Never
    /// writes past `buf.len()`.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError>;

    /// Release the underlying file or transport session.
    ///
    /// Closing twice is a no-op. Reads after close fail with `IoError::Closed`.
    async fn close(&mut self);

    /// Current cursor position in bytes.
    fn position(&self) -> u64;
}

/// Read until `buf` is full or the handle reports end of data.
///
/// Returns the number of bytes read, which is less than `buf.len()` only at
/// end of data.
pub async fn read_full(handle: &mut dyn ByteHandle, buf: &mut [u8]) -> Result<usize, IoError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = handle.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
