use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use super::{ByteHandle, ByteSource, FileStat};
use crate::error::IoError;

/// Local filesystem implementation of [`ByteSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSource;

impl LocalSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ByteSource for LocalSource {
    async fn stat(&self, path: &str) -> Result<FileStat, IoError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| IoError::from_io(path, e))?;
        let modified = meta.modified().map_err(|e| IoError::from_io(path, e))?;

        Ok(FileStat {
            is_regular: meta.is_file(),
            size: meta.len(),
            modified: DateTime::<Utc>::from(modified),
        })
    }

    async fn open(&self, path: &str) -> Result<Box<dyn ByteHandle>, IoError> {
        let file = File::open(path)
            .await
            .map_err(|e| IoError::from_io(path, e))?;
        Ok(Box::new(LocalHandle {
            path: path.to_string(),
            file: Some(file),
            position: 0,
        }))
    }

    async fn expand(&self, pattern: &str) -> Result<Vec<String>, IoError> {
        let pattern = pattern.to_string();
        tokio::task::spawn_blocking(move || expand_blocking(&pattern))
            .await
            .map_err(|e| IoError::Local(format!("glob task failed: {}", e)))?
    }

    fn is_remote(&self) -> bool {
        false
    }
}

fn expand_blocking(pattern: &str) -> Result<Vec<String>, IoError> {
    let entries = glob::glob(pattern)
        .map_err(|e| IoError::Local(format!("invalid pattern {}: {}", pattern, e)))?;

    let mut matches = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => match path.to_str() {
                Some(s) => matches.push(s.to_string()),
                None => debug!(path = ?path, "Skipping non UTF-8 path"),
            },
            // Unreadable directories are skipped, as glob(3) does without GLOB_ERR
            Err(e) => warn!(pattern = pattern, "Skipping unreadable glob entry: {}", e),
        }
    }
    matches.sort();
    Ok(matches)
}

/// Open local file with a tracked cursor.
struct LocalHandle {
    path: String,
    file: Option<File>,
    position: u64,
}

#[async_trait]
impl ByteHandle for LocalHandle {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        let file = self.file.as_mut().ok_or(IoError::Closed)?;
        let n = file
            .read(buf)
            .await
            .map_err(|e| IoError::from_io(&self.path, e))?;
        self.position += n as u64;
        Ok(n)
    }

    async fn close(&mut self) {
        // Dropping the tokio File closes the descriptor
        self.file.take();
    }

    fn position(&self) -> u64 {
        self.position
    }
}
