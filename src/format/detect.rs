//! Format detection for image files.
//!
//! Classification uses the filename suffix and the first [`HEADER_LEN`] bytes
//! of content, with this precedence (first match wins):
//!
//! 1. Whole-slide vendor suffix → [`ImageFormat::OpenSlide`], whatever the bytes say
//! 2. JPEG2000 signature → [`ImageFormat::Jpeg2000`]
//! 3. Any TIFF or BigTIFF signature → [`ImageFormat::Tiff`]
//! 4. Anything else → [`ImageFormat::Unsupported`]
//!
//! `Unsupported` is a valid outcome, not an error. The codec selection step
//! downstream decides whether to reject the request.

use serde::Serialize;

use crate::error::FormatError;

// =============================================================================
// ImageFormat
// =============================================================================

/// Codec family of an image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Classic TIFF or BigTIFF, including pyramidal TIFF
    Tiff,

    /// JPEG2000 (JP2 container)
    Jpeg2000,

    /// Vendor whole-slide format handled by OpenSlide
    OpenSlide,

    /// No known signature or suffix
    Unsupported,
}

impl ImageFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            ImageFormat::Tiff => "TIFF",
            ImageFormat::Jpeg2000 => "JPEG2000",
            ImageFormat::OpenSlide => "OpenSlide",
            ImageFormat::Unsupported => "Unsupported",
        }
    }
}

// =============================================================================
// Signatures
// =============================================================================

/// Number of content bytes needed for classification.
pub const HEADER_LEN: usize = 10;

/// JP2 signature box.
const JPEG2000_MAGIC: [u8; HEADER_LEN] = [
    0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20, 0x0D, 0x0A,
];

/// TIFF family signatures, matched as prefixes.
const TIFF_MAGICS: [&[u8]; 5] = [
    &[0x49, 0x20, 0x49],       // "I I"
    &[0x49, 0x49, 0x2A, 0x00], // II, version 42
    &[0x4D, 0x4D, 0x00, 0x2A], // MM, version 42
    &[0x49, 0x49, 0x2B, 0x00], // II, version 43 (BigTIFF)
    &[0x4D, 0x4D, 0x00, 0x2B], // MM, version 43 (BigTIFF)
];

/// Whole-slide scanner extensions. These always win over content bytes.
const OPENSLIDE_SUFFIXES: [&str; 7] = ["vtif", "svs", "ndpi", "mrxs", "vms", "scn", "bif"];

const JPEG2000_SUFFIXES: [&str; 3] = ["jp2", "jpx", "j2k"];

/// Includes the processed-pyramid "ptif" extension.
const TIFF_SUFFIXES: [&str; 3] = ["tif", "tiff", "ptif"];

// =============================================================================
// Classification
// =============================================================================

/// True if `suffix` names a whole-slide vendor format.
pub fn is_openslide_suffix(suffix: &str) -> bool {
    OPENSLIDE_SUFFIXES
        .iter()
        .any(|s| s.eq_ignore_ascii_case(suffix))
}

/// Classify a file from its suffix and its first [`HEADER_LEN`] bytes.
///
/// Suffixes are matched ASCII case-insensitively, so `SVS` and `svs` both
/// name an OpenSlide file. The suffix itself is never rewritten.
///
/// # Errors
/// `FormatError::TruncatedHeader` if fewer than [`HEADER_LEN`] bytes are given.
/// Extra bytes beyond [`HEADER_LEN`] are ignored.
pub fn sniff(suffix: &str, header: &[u8]) -> Result<ImageFormat, FormatError> {
    if header.len() < HEADER_LEN {
        return Err(FormatError::TruncatedHeader {
            required: HEADER_LEN,
            actual: header.len(),
        });
    }
    let header = &header[..HEADER_LEN];

    if is_openslide_suffix(suffix) {
        return Ok(ImageFormat::OpenSlide);
    }
    if header == JPEG2000_MAGIC {
        return Ok(ImageFormat::Jpeg2000);
    }
    if TIFF_MAGICS.iter().any(|magic| header.starts_with(magic)) {
        return Ok(ImageFormat::Tiff);
    }
    Ok(ImageFormat::Unsupported)
}

/// Classify a file from its suffix alone.
///
/// Used for sequence members, whose content is not sniffed.
pub fn classify_suffix(suffix: &str) -> ImageFormat {
    let in_set = |set: &[&str]| set.iter().any(|s| s.eq_ignore_ascii_case(suffix));

    if is_openslide_suffix(suffix) {
        ImageFormat::OpenSlide
    } else if in_set(&JPEG2000_SUFFIXES[..]) {
        ImageFormat::Jpeg2000
    } else if in_set(&TIFF_SUFFIXES[..]) {
        ImageFormat::Tiff
    } else {
        ImageFormat::Unsupported
    }
}

// =============================================================================
// Tests
// =============================================================================
