//! Codec format classification.
//!
//! Use [`detect::sniff`] when the first bytes of the file are available, and
//! [`detect::classify_suffix`] when only a filename is (sequence members are
//! classified by extension).

pub mod detect;

pub use detect::{classify_suffix, is_openslide_suffix, sniff, ImageFormat, HEADER_LEN};
