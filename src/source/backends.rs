use std::fmt;
use std::sync::Arc;

use crate::config::SourceConfig;
use crate::error::IoError;
use crate::io::{ByteSource, LocalSource, RemoteSource, ReqwestTransport};

/// Literal prefixes that route a path to the remote backing store.
pub const REMOTE_PREFIXES: [&str; 2] = ["http:/", "https:/"];

/// True if `path` must be served by the remote backing store.
///
/// This is a pure prefix test; nothing is probed.
pub fn is_remote_path(path: &str) -> bool {
    REMOTE_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// The pair of backing stores an image source chooses between.
///
/// Build one per process and clone it into each request's `ImageSource`;
/// clones share the underlying HTTP client.
#[derive(Clone)]
pub struct Backends {
    local: Arc<dyn ByteSource>,
    remote: Arc<dyn ByteSource>,
}

impl Backends {
    pub fn new(local: Arc<dyn ByteSource>, remote: Arc<dyn ByteSource>) -> Self {
        Self { local, remote }
    }

    /// Local filesystem plus a reqwest transport configured from `config`.
    pub fn from_config(config: &SourceConfig) -> Result<Self, IoError> {
        let transport = ReqwestTransport::with_timeouts(
            config.http_timeout(),
            config.http_connect_timeout(),
            &config.user_agent,
        )?;
        Ok(Self::new(
            Arc::new(LocalSource::new()),
            Arc::new(RemoteSource::new(Arc::new(transport))),
        ))
    }

    /// Backing store for a path, chosen by its scheme prefix.
    pub fn select(&self, path: &str) -> Arc<dyn ByteSource> {
        if is_remote_path(path) {
            Arc::clone(&self.remote)
        } else {
            Arc::clone(&self.local)
        }
    }

    pub fn local(&self) -> &Arc<dyn ByteSource> {
        &self.local
    }
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}
