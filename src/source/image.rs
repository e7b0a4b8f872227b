//! The per-request image source.
//!
//! An [`ImageSource`] turns a logical image identifier into a ready-to-decode
//! handle description: which backing store serves it, whether it is a single
//! file or an angle-indexed sequence, which codec format it uses, and when it
//! was last modified.
//!
//! # State machine
//!
//! ```text
//!               initialise()
//! Unresolved ──────────────► Probing ──┬──► SingleFile ─┐
//!                                      ├──► Sequence ───┴──► Ready
//!                                      └──► Failed(reason)
//! ```
//!
//! Probing happens once. Later calls to [`ImageSource::initialise`] return
//! the stored outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::backends::{is_remote_path, Backends};
use super::metadata::DecodeMetadata;
use super::sequence::{self, SequenceResolver, CANONICAL_HORIZONTAL, CANONICAL_VERTICAL};
use crate::config::SourceConfig;
use crate::error::{redact_credentials, FormatError, SourceError};
use crate::format::{self, ImageFormat, HEADER_LEN};
use crate::io::{read_full, ByteSource};

/// `strftime` layout for HTTP date headers (RFC 1123).
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// How a resolved image is laid out on its backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// One regular file
    SingleFile,

    /// A family of angle-indexed files
    Sequence,
}

#[derive(Debug, Clone)]
enum State {
    Unresolved,
    Ready(Layout),
    Failed(SourceError),
}

/// Everything probing produces, applied in one step so a failure leaves no
/// partial state behind.
struct Resolved {
    layout: Layout,
    suffix: String,
    format: ImageFormat,
    timestamp: DateTime<Utc>,
    horizontal_angles: Vec<u32>,
    vertical_angles: Vec<u32>,
}

/// A logical image, resolved against local or remote storage.
///
/// Each request owns its own instance; it is never shared between workers.
/// Cloning copies every field, including decode metadata.
#[derive(Debug, Clone)]
pub struct ImageSource {
    base_path: String,
    transport_prefix: String,
    name_pattern: String,
    suffix: String,
    format: ImageFormat,
    state: State,
    is_remote: bool,
    timestamp: DateTime<Utc>,
    horizontal_angles: Vec<u32>,
    vertical_angles: Vec<u32>,
    current_horizontal: u32,
    current_vertical: u32,
    metadata: DecodeMetadata,
    backends: Backends,
}

impl ImageSource {
    /// Create an unresolved source for `base_path`.
    ///
    /// No I/O happens until [`ImageSource::initialise`].
    pub fn new(base_path: impl Into<String>, backends: Backends) -> Self {
        let base_path = base_path.into();
        Self {
            is_remote: is_remote_path(&base_path),
            base_path,
            transport_prefix: String::new(),
            name_pattern: String::new(),
            suffix: String::new(),
            format: ImageFormat::Unsupported,
            state: State::Unresolved,
            timestamp: DateTime::<Utc>::default(),
            horizontal_angles: Vec::new(),
            vertical_angles: Vec::new(),
            current_horizontal: CANONICAL_HORIZONTAL,
            current_vertical: CANONICAL_VERTICAL,
            metadata: DecodeMetadata::default(),
            backends,
        }
    }

    /// Create a source using the prefix and name pattern from `config`.
    pub fn from_config(
        base_path: impl Into<String>,
        config: &SourceConfig,
        backends: Backends,
    ) -> Self {
        Self::new(base_path, backends)
            .with_transport_prefix(config.filesystem_prefix.clone())
            .with_name_pattern(config.name_pattern.clone())
    }

    /// Set the backing-store root prepended to the base path.
    pub fn with_transport_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.transport_prefix = prefix.into();
        self.is_remote = is_remote_path(&self.full_path());
        self
    }

    /// Set the literal placed between the base path and the angle tokens.
    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = pattern.into();
        self
    }

    // =========================================================================
    // Initialisation
    // =========================================================================

    /// Probe the backing store and classify the image.
    ///
    /// Probing runs at most once. A source that already succeeded returns its
    /// layout again; one that failed returns the same error.
    pub async fn initialise(&mut self) -> Result<Layout, SourceError> {
        match &self.state {
            State::Ready(layout) => return Ok(*layout),
            State::Failed(err) => return Err(err.clone()),
            State::Unresolved => {}
        }

        let path = self.full_path();
        let source = self.backends.select(&path);

        match self.probe(source.as_ref(), &path).await {
            Ok(resolved) => {
                let layout = resolved.layout;
                self.suffix = resolved.suffix;
                self.format = resolved.format;
                self.timestamp = resolved.timestamp;
                self.horizontal_angles = resolved.horizontal_angles;
                self.vertical_angles = resolved.vertical_angles;
                self.state = State::Ready(layout);
                debug!(
                    path = %self.display_path(),
                    layout = ?layout,
                    format = self.format.name(),
                    remote = self.is_remote,
                    "Image source ready"
                );
                Ok(layout)
            }
            Err(err) => {
                warn!(
                    path = %self.display_path(),
                    error_type = err.error_type(),
                    "Image source failed: {}",
                    err
                );
                self.state = State::Failed(err.clone());
                Err(err)
            }
        }
    }

    async fn probe(&self, source: &dyn ByteSource, path: &str) -> Result<Resolved, SourceError> {
        match source.stat(path).await {
            Ok(stat) if stat.is_regular => {
                debug!(path = %self.display_path(), size = stat.size, "Found regular file");
                self.probe_single_file(source, path, stat.modified).await
            }
            Ok(_) => {
                debug!(
                    path = %self.display_path(),
                    "Not a regular file, trying sequence discovery"
                );
                self.probe_sequence(source).await
            }
            Err(e) if e.is_not_found() => {
                debug!(
                    path = %self.display_path(),
                    "No such file, trying sequence discovery"
                );
                self.probe_sequence(source).await
            }
            Err(e) => Err(SourceError::from_io(self.display_path(), e)),
        }
    }

    async fn probe_single_file(
        &self,
        source: &dyn ByteSource,
        path: &str,
        modified: DateTime<Utc>,
    ) -> Result<Resolved, SourceError> {
        let display = self.display_path();
        let suffix = sequence::extension(&self.base_path).to_string();

        let mut handle = source
            .open(path)
            .await
            .map_err(|e| SourceError::from_io(display.clone(), e))?;
        let mut header = [0u8; HEADER_LEN];
        let read = read_full(handle.as_mut(), &mut header).await;
        handle.close().await;
        let len = read.map_err(|e| SourceError::from_io(display.clone(), e))?;

        let format = format::sniff(&suffix, &header[..len]).map_err(|e| match e {
            FormatError::TruncatedHeader { required, actual } => SourceError::TruncatedHeader {
                path: display.clone(),
                required,
                actual,
            },
        })?;
        debug!(suffix = %suffix, format = format.name(), "Sniffed header");

        Ok(Resolved {
            layout: Layout::SingleFile,
            suffix,
            format,
            timestamp: modified,
            horizontal_angles: vec![CANONICAL_HORIZONTAL],
            vertical_angles: vec![CANONICAL_VERTICAL],
        })
    }

    async fn probe_sequence(&self, source: &dyn ByteSource) -> Result<Resolved, SourceError> {
        let info = SequenceResolver::new(source, &self.full_path(), &self.name_pattern)
            .resolve()
            .await?;

        Ok(Resolved {
            layout: Layout::Sequence,
            suffix: info.suffix,
            format: info.format,
            timestamp: info.modified,
            horizontal_angles: info.horizontal_angles,
            vertical_angles: info.vertical_angles,
        })
    }

    // =========================================================================
    // Filename resolution and staleness
    // =========================================================================

    /// Concrete file to decode for a (sequence, angle) pair.
    ///
    /// Single files ignore the pair and return their own path, as does a
    /// source that has not been initialised.
    pub fn resolve_filename(&self, seq: u32, ang: u32) -> String {
        match self.state {
            State::Ready(Layout::Sequence) => {
                let stem = format!("{}{}", self.full_path(), self.name_pattern);
                sequence::member_filename(&stem, seq, ang, &self.suffix)
            }
            _ => self.full_path(),
        }
    }

    /// Re-check the modification time of `path`.
    ///
    /// Returns `true` when the file's modification time moved forward since
    /// the last recorded value. The new time is stored either way.
    ///
    /// Remote sources always return `false` without any network call: remote
    /// content is assumed stable for the lifetime of a cache entry. This is a
    /// simplification, not a freshness guarantee.
    pub async fn update_timestamp(&mut self, path: &str) -> Result<bool, SourceError> {
        if self.is_remote {
            return Ok(false);
        }

        let stat = self
            .backends
            .local()
            .stat(path)
            .await
            .map_err(|e| SourceError::from_io(redact_credentials(path), e))?;

        let changed = stat.modified > self.timestamp;
        self.timestamp = stat.modified;
        Ok(changed)
    }

    /// Last known modification time as an HTTP date, e.g.
    /// `Sun, 13 Sep 2020 12:26:40 GMT`.
    pub fn timestamp_http_date(&self) -> String {
        self.timestamp.format(HTTP_DATE_FORMAT).to_string()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Transport prefix followed by the base path.
    pub fn full_path(&self) -> String {
        format!("{}{}", self.transport_prefix, self.base_path)
    }

    /// Full path with any URL credentials removed.
    pub fn display_path(&self) -> String {
        redact_credentials(&self.full_path())
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn transport_prefix(&self) -> &str {
        &self.transport_prefix
    }

    pub fn name_pattern(&self) -> &str {
        &self.name_pattern
    }

    /// File extension, as found on the backing store. Empty until initialised.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Codec format, or `None` before a successful initialisation.
    pub fn format(&self) -> Option<ImageFormat> {
        self.layout().map(|_| self.format)
    }

    /// Layout, or `None` before a successful initialisation.
    pub fn layout(&self) -> Option<Layout> {
        match self.state {
            State::Ready(layout) => Some(layout),
            _ => None,
        }
    }

    pub fn is_single_file(&self) -> bool {
        self.layout() == Some(Layout::SingleFile)
    }

    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    /// Last recorded modification time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Ascending horizontal angles. Empty until initialised.
    pub fn horizontal_angles(&self) -> &[u32] {
        &self.horizontal_angles
    }

    /// Ascending vertical angles. Empty until initialised.
    pub fn vertical_angles(&self) -> &[u32] {
        &self.vertical_angles
    }

    /// Select the view angles used by the decoder.
    pub fn select_view(&mut self, horizontal: u32, vertical: u32) {
        self.current_horizontal = horizontal;
        self.current_vertical = vertical;
    }

    /// Currently selected `(horizontal, vertical)` view.
    pub fn current_view(&self) -> (u32, u32) {
        (self.current_horizontal, self.current_vertical)
    }

    pub fn metadata(&self) -> &DecodeMetadata {
        &self.metadata
    }

    /// Codecs record what they decode here.
    pub fn metadata_mut(&mut self) -> &mut DecodeMetadata {
        &mut self.metadata
    }

    /// Backing store this source resolves against.
    pub fn byte_source(&self) -> Arc<dyn ByteSource> {
        self.backends.select(&self.full_path())
    }
}

impl PartialEq for ImageSource {
    fn eq(&self, other: &Self) -> bool {
        self.full_path() == other.full_path()
    }
}

impl Eq for ImageSource {}
