use http::StatusCode;
use thiserror::Error;

/// I/O errors that can occur when talking to a backing store
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// The backing store could not resolve the path
    #[error("Not found: {0}")]
    NotFound(String),

    /// Timeout, connection failure or retryable HTTP status
    #[error("Transient transport error: {0}")]
    Transient(String),

    /// Non-retryable transport failure (DNS, protocol, unexpected HTTP status)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The transport returned more bytes than the destination buffer holds
    #[error("Buffer overflow: transport returned {received} bytes for a {capacity}-byte buffer")]
    BufferOverflow { capacity: usize, received: usize },

    /// Operation not available on this backing store
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Read attempted on a handle that was already closed
    #[error("Handle is closed")]
    Closed,

    /// Local filesystem error other than not-found
    #[error("Local I/O error: {0}")]
    Local(String),
}

impl IoError {
    /// Map a `std::io::Error` for `path` onto the transport taxonomy.
    pub fn from_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound(path.to_string()),
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted => {
                IoError::Transient(format!("{}: {}", path, err))
            }
            _ => IoError::Local(format!("{}: {}", path, err)),
        }
    }

    /// True when the path simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IoError::NotFound(_))
    }

    /// True when a caller may reasonably retry the operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, IoError::Transient(_))
    }
}

/// Errors from content sniffing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Fewer than the required number of header bytes were supplied
    #[error("Truncated header: need {required} bytes, got {actual}")]
    TruncatedHeader { required: usize, actual: usize },
}

/// Errors surfaced by image source initialisation and timestamp checks.
///
/// Every variant carries the path with any URL credentials removed.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Neither a regular file nor a matching sequence exists
    #[error("{path} is neither a file nor part of an image sequence")]
    NotFound { path: String },

    /// The canonical sequence member exists with more than one extension
    #[error("There are {matches} file extensions matching {pattern}")]
    AmbiguousSequence { pattern: String, matches: usize },

    /// Not enough bytes to classify the file
    #[error("Unable to read initial byte sequence from '{path}': need {required} bytes, got {actual}")]
    TruncatedHeader {
        path: String,
        required: usize,
        actual: usize,
    },

    /// Remote or local transport failed
    #[error("Transport failure for {path}: {source}")]
    Transport {
        path: String,
        #[source]
        source: IoError,
    },

    /// A read would have overrun its destination buffer
    #[error("Refusing read of {path}: transport returned {received} bytes for a {capacity}-byte buffer")]
    BufferOverflow {
        path: String,
        capacity: usize,
        received: usize,
    },

    /// Sequence discovery requested against a remote backing store
    #[error("{path} is not a regular file and image sequences are not supported for remote sources")]
    SequenceUnsupported { path: String },
}

impl SourceError {
    /// Wrap a transport error for `path`, keeping buffer overflows distinct.
    pub fn from_io(path: impl Into<String>, err: IoError) -> Self {
        let path = path.into();
        match err {
            IoError::BufferOverflow { capacity, received } => SourceError::BufferOverflow {
                path,
                capacity,
                received,
            },
            source => SourceError::Transport { path, source },
        }
    }

    /// Short machine-readable tag for responses and log fields.
    pub const fn error_type(&self) -> &'static str {
        match self {
            SourceError::NotFound { .. } => "not_found",
            SourceError::AmbiguousSequence { .. } => "ambiguous_sequence",
            SourceError::TruncatedHeader { .. } => "truncated_header",
            SourceError::Transport { .. } => "transport_error",
            SourceError::BufferOverflow { .. } => "buffer_overflow",
            SourceError::SequenceUnsupported { .. } => "sequence_unsupported",
        }
    }

    /// HTTP status the dispatcher should answer with.
    ///
    /// - 404 for missing images, including remote paths that are not a single file
    /// - 409 for ambiguous sequences
    /// - 422 for files too short to classify
    /// - 503 for transient transport failures, 502 for the rest
    pub fn status_code(&self) -> StatusCode {
        match self {
            SourceError::NotFound { .. } | SourceError::SequenceUnsupported { .. } => {
                StatusCode::NOT_FOUND
            }
            SourceError::AmbiguousSequence { .. } => StatusCode::CONFLICT,
            SourceError::TruncatedHeader { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SourceError::Transport { source, .. } => match source {
                IoError::NotFound(_) => StatusCode::NOT_FOUND,
                IoError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            },
            SourceError::BufferOverflow { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Strip userinfo from URL-shaped paths so credentials never reach logs or
/// client-facing messages. Plain filesystem paths are returned unchanged.
pub fn redact_credentials(path: &str) -> String {
    let mut url = match url::Url::parse(path) {
        Ok(url) if url.has_host() => url,
        _ => return path.to_string(),
    };

    if url.username().is_empty() && url.password().is_none() {
        return path.to_string();
    }

    // Both setters only fail for cannot-be-a-base URLs, excluded by has_host()
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url.to_string()
}
