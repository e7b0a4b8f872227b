//! # iip-source
//!
//! Image source resolution for tiled image servers.
//!
//! Given a logical image identifier, this crate works out whether it names a
//! single file or a directory-scoped sequence of angle-indexed files, reads
//! its bytes the same way from local disk or from HTTP(S) range requests,
//! classifies its codec format from a content sniff plus extension rules, and
//! tracks modification time so a tile cache can detect staleness.
//!
//! ## Features
//!
//! - **One access contract**: local files and remote URLs behind [`io::ByteSource`]
//! - **Safe ranged reads**: remote reads never copy more than the caller's buffer holds
//! - **Format sniffing**: TIFF, BigTIFF, JPEG2000 and whole-slide vendor formats
//! - **Sequence discovery**: multi-angle file families found by filename pattern
//!
//! ## Architecture
//!
//! - [`io`] - Byte sources: local filesystem and HTTP range transport
//! - [`mod@format`] - Magic-byte and suffix format detection
//! - [`source`] - Sequence discovery and the per-request [`ImageSource`]
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error taxonomy
//!
//! ## Example
//!
//! ```rust,no_run
//! use iip_source::{Backends, ImageSource, SourceConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SourceConfig::default();
//!     let backends = Backends::from_config(&config).expect("HTTP client");
//!
//!     let mut image = ImageSource::from_config("/data/slides/sample.tif", &config, backends);
//!     match image.initialise().await {
//!         Ok(layout) => println!("{:?} {:?}", layout, image.format()),
//!         Err(e) => eprintln!("{} ({})", e, e.status_code()),
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod source;

pub use config::SourceConfig;
pub use error::{FormatError, IoError, SourceError};
pub use format::ImageFormat;
pub use source::{Backends, ImageSource, Layout};
