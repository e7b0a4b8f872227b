//! Image source resolution.
//!
//! This module turns a request path into a validated [`ImageSource`]:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      Dispatcher / tile cache            │
//! └────────────────────┬────────────────────┘
//!                      │ initialise(), resolve_filename(), update_timestamp()
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             ImageSource                 │
//! │  (state machine, angles, timestamps)    │
//! └──────────┬─────────────────┬────────────┘
//!            │                 │
//!            ▼                 ▼
//! ┌──────────────────┐  ┌─────────────────────┐
//! │ SequenceResolver │  │   format::sniff     │
//! └─────────┬────────┘  └─────────────────────┘
//!           ▼
//! ┌─────────────────────────────────────────┐
//! │  ByteSource: LocalSource | RemoteSource │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use iip_source::config::SourceConfig;
//! use iip_source::source::{Backends, ImageSource};
//!
//! let config = SourceConfig::default();
//! let backends = Backends::from_config(&config)?;
//!
//! let mut image = ImageSource::from_config("/data/slides/sample.tif", &config, backends);
//! image.initialise().await?;
//! let file = image.resolve_filename(0, 90);
//! ```

mod backends;
mod image;
mod metadata;
pub mod sequence;

pub use backends::{is_remote_path, Backends, REMOTE_PREFIXES};
pub use image::{ImageSource, Layout, HTTP_DATE_FORMAT};
pub use metadata::{ColourSpace, DecodeMetadata, SampleType};
pub use sequence::{SequenceInfo, SequenceResolver};
