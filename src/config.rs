//! Configuration management for iip-source.
//!
//! Configuration comes from command-line arguments via clap, with every
//! option also settable through an `IIP_`-prefixed environment variable and
//! a sensible default.
//!
//! # Environment Variables
//!
//! - `IIP_FILESYSTEM_PREFIX` - Root prepended to every image path (default: empty)
//! - `IIP_NAME_PATTERN` - Literal between base path and sequence angle tokens (default: `_pyr_`)
//! - `IIP_HTTP_TIMEOUT` - Remote request timeout in seconds (default: 30)
//! - `IIP_HTTP_CONNECT_TIMEOUT` - Remote connect timeout in seconds (default: 10)
//! - `IIP_USER_AGENT` - User agent for remote requests

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Default Values
// =============================================================================

/// Default filesystem prefix.
pub const DEFAULT_FILESYSTEM_PREFIX: &str = "";

/// Default sequence name pattern.
pub const DEFAULT_NAME_PATTERN: &str = "_pyr_";

/// Default remote request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default remote connect timeout in seconds.
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default user agent for remote requests.
pub const DEFAULT_USER_AGENT: &str = concat!("iip-source/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// CLI Arguments
// =============================================================================

/// iip-source - resolve image identifiers the way the tile server does.
///
/// Probes local paths and HTTP(S) URLs, detects single files and
/// angle-indexed sequences, and classifies their codec format.
#[derive(Parser, Debug, Clone)]
#[command(name = "iip-source")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Initialise an image source and print what was found.
    Probe(ProbeArgs),

    /// Print the concrete filename for a (sequence, angle) pair.
    Resolve(ResolveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Image identifier (path relative to the prefix, or an http(s) URL).
    pub path: String,

    /// Print the result as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub source: SourceConfig,
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Image identifier (path relative to the prefix, or an http(s) URL).
    pub path: String,

    /// Sequence (horizontal angle) index.
    pub seq: u32,

    /// Vertical angle.
    pub ang: u32,

    #[command(flatten)]
    pub source: SourceConfig,
}

/// Settings shared by every image source in the process.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Root prepended to every image path: a directory or an http(s) origin.
    #[arg(long, default_value = DEFAULT_FILESYSTEM_PREFIX, env = "IIP_FILESYSTEM_PREFIX")]
    pub filesystem_prefix: String,

    /// Literal placed between the base path and the angle tokens of sequence members.
    #[arg(long, default_value = DEFAULT_NAME_PATTERN, env = "IIP_NAME_PATTERN")]
    pub name_pattern: String,

    /// Timeout in seconds for each remote request.
    #[arg(long = "http-timeout", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS, env = "IIP_HTTP_TIMEOUT")]
    pub http_timeout_secs: u64,

    /// Timeout in seconds for establishing remote connections.
    #[arg(
        long = "http-connect-timeout",
        default_value_t = DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
        env = "IIP_HTTP_CONNECT_TIMEOUT"
    )]
    pub http_connect_timeout_secs: u64,

    /// User agent sent with remote requests.
    #[arg(long, default_value = DEFAULT_USER_AGENT, env = "IIP_USER_AGENT")]
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            filesystem_prefix: DEFAULT_FILESYSTEM_PREFIX.to_string(),
            name_pattern: DEFAULT_NAME_PATTERN.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            http_connect_timeout_secs: DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SourceConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.http_timeout_secs == 0 {
            return Err("http_timeout must be greater than 0".to_string());
        }
        if self.http_connect_timeout_secs == 0 {
            return Err("http_connect_timeout must be greater than 0".to_string());
        }
        if self.http_connect_timeout_secs > self.http_timeout_secs {
            return Err("http_connect_timeout must not exceed http_timeout".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return Err("user_agent must not be empty".to_string());
        }
        // Angle tokens are glued straight onto the pattern, so wildcards would
        // make discovered members unparseable
        if self.name_pattern.contains(['*', '?', '[', ']']) {
            return Err("name_pattern must not contain glob wildcards".to_string());
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn http_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http_connect_timeout_secs)
    }
}

// =============================================================================
// Tests
// =============================================================================
