//! Discovery of multi-angle image sequences.
//!
//! A sequence is a family of files sharing a stem and differing only in two
//! zero-padded angle tokens:
//!
//! ```text
//! <base path><name pattern><horizontal:03>_<vertical:03>.<suffix>
//! e.g. /data/scan_pyr_015_090.tif
//! ```
//!
//! The canonical member (horizontal 0, vertical 90) must exist exactly once,
//! with a single extension, for the family to count as a sequence.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{redact_credentials, SourceError};
use crate::format::{classify_suffix, ImageFormat};
use crate::io::ByteSource;

/// Horizontal angle of the canonical member.
pub const CANONICAL_HORIZONTAL: u32 = 0;

/// Vertical angle of the canonical member.
pub const CANONICAL_VERTICAL: u32 = 90;

/// Marker following the horizontal token in members at the canonical vertical angle.
const HORIZONTAL_SCAN_MARKER: &str = "_090";

/// Marker preceding the vertical token in members at the canonical horizontal angle.
const VERTICAL_SCAN_MARKER: &str = "000_";

/// Everything sequence discovery learns about a file family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceInfo {
    /// Extension of the canonical member, as found on disk
    pub suffix: String,

    /// Format implied by the suffix
    pub format: ImageFormat,

    /// Modification time of the canonical member
    pub modified: DateTime<Utc>,

    /// Ascending horizontal angles
    pub horizontal_angles: Vec<u32>,

    /// Ascending vertical angles
    pub vertical_angles: Vec<u32>,
}

/// Build the filename of one sequence member.
///
/// `stem` is the base path followed by the name pattern. Angles are padded
/// to at least three digits.
pub fn member_filename(stem: &str, horizontal: u32, vertical: u32, suffix: &str) -> String {
    format!("{}{:03}_{:03}.{}", stem, horizontal, vertical, suffix)
}

/// Recover the horizontal angle from a member at the canonical vertical angle.
///
/// Returns `None` unless the filename is `<stem><digits>_090.<suffix>`.
pub fn parse_horizontal(stem: &str, path: &str, suffix: &str) -> Option<u32> {
    let middle = member_middle(stem, path, suffix)?;
    let token = middle.strip_suffix(HORIZONTAL_SCAN_MARKER)?;
    parse_angle(token)
}

/// Recover the vertical angle from a member at the canonical horizontal angle.
///
/// Returns `None` unless the filename is `<stem>000_<digits>.<suffix>`.
pub fn parse_vertical(stem: &str, path: &str, suffix: &str) -> Option<u32> {
    let middle = member_middle(stem, path, suffix)?;
    let token = middle.strip_prefix(VERTICAL_SCAN_MARKER)?;
    parse_angle(token)
}

/// The part of a member's file name between the stem and `.<suffix>`.
///
/// Works on file names rather than whole paths so that the directory
/// spelling produced by the glob walk does not matter.
fn member_middle<'a>(stem: &str, path: &'a str, suffix: &str) -> Option<&'a str> {
    let stem_name = stem_file_name(stem);
    let file_name = Path::new(path).file_name()?.to_str()?;
    file_name
        .strip_prefix(stem_name)?
        .strip_suffix(suffix)?
        .strip_suffix('.')
}

/// File-name portion of a stem: everything after the last separator.
fn stem_file_name(stem: &str) -> &str {
    match stem.rfind(['/', std::path::MAIN_SEPARATOR]) {
        Some(idx) => &stem[idx + 1..],
        None => stem,
    }
}

fn parse_angle(token: &str) -> Option<u32> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Extension of `path`: the text after the last `.` of its file name.
pub(crate) fn extension(path: &str) -> &str {
    let name_start = path.rfind(['/', std::path::MAIN_SEPARATOR]).map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) => &path[name_start + dot + 1..],
        None => "",
    }
}

/// Resolves a base path and name pattern into a validated sequence.
pub struct SequenceResolver<'a> {
    source: &'a dyn ByteSource,
    stem: String,
}

impl<'a> SequenceResolver<'a> {
    /// `base_path` must already include any transport prefix.
    pub fn new(source: &'a dyn ByteSource, base_path: &str, name_pattern: &str) -> Self {
        Self {
            source,
            stem: format!("{}{}", base_path, name_pattern),
        }
    }

    /// Base path followed by the name pattern.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Confirm the canonical member and enumerate both angle lists.
    ///
    /// # Errors
    /// - `SequenceUnsupported` on remote backing stores
    /// - `NotFound` when no canonical member exists
    /// - `AmbiguousSequence` when it exists with several extensions
    pub async fn resolve(&self) -> Result<SequenceInfo, SourceError> {
        if self.source.is_remote() {
            return Err(SourceError::SequenceUnsupported {
                path: redact_credentials(&self.stem),
            });
        }

        let canonical = self.probe_canonical().await?;
        let suffix = extension(&canonical).to_string();

        let modified = self
            .source
            .stat(&canonical)
            .await
            .map_err(|e| SourceError::from_io(redact_credentials(&canonical), e))?
            .modified;

        let horizontal_angles = self.horizontal_angles(&suffix).await?;
        let vertical_angles = self.vertical_angles(&suffix).await?;

        // The canonical member satisfies both scans, so an empty list means
        // it vanished between the probe and the scan
        if horizontal_angles.is_empty() || vertical_angles.is_empty() {
            warn!(
                stem = %redact_credentials(&self.stem),
                "Canonical member disappeared during scan"
            );
            return Err(self.not_found());
        }

        debug!(
            stem = %redact_credentials(&self.stem),
            suffix = %suffix,
            horizontal = horizontal_angles.len(),
            vertical = vertical_angles.len(),
            "Resolved image sequence"
        );

        Ok(SequenceInfo {
            format: classify_suffix(&suffix),
            suffix,
            modified,
            horizontal_angles,
            vertical_angles,
        })
    }

    /// Find the single canonical member, whatever its extension.
    pub async fn probe_canonical(&self) -> Result<String, SourceError> {
        let literal = format!(
            "{}{:03}_{:03}.",
            self.stem, CANONICAL_HORIZONTAL, CANONICAL_VERTICAL
        );
        let pattern = format!("{}*", glob::Pattern::escape(&literal));

        let mut matches = self.expand(&pattern, &literal).await?;
        match matches.len() {
            0 => Err(self.not_found()),
            1 => Ok(matches.remove(0)),
            n => Err(SourceError::AmbiguousSequence {
                pattern: redact_credentials(&format!("{}*", literal)),
                matches: n,
            }),
        }
    }

    /// Horizontal angles of all members at the canonical vertical angle, ascending.
    pub async fn horizontal_angles(&self, suffix: &str) -> Result<Vec<u32>, SourceError> {
        let pattern = format!(
            "{}*{}.{}",
            glob::Pattern::escape(&self.stem),
            HORIZONTAL_SCAN_MARKER,
            glob::Pattern::escape(suffix)
        );
        let paths = self.expand(&pattern, &self.stem).await?;
        Ok(self.collect_angles(&paths, suffix, parse_horizontal))
    }

    /// Vertical angles of all members at the canonical horizontal angle, ascending.
    pub async fn vertical_angles(&self, suffix: &str) -> Result<Vec<u32>, SourceError> {
        let pattern = format!(
            "{}*.{}",
            glob::Pattern::escape(&format!("{}{}", self.stem, VERTICAL_SCAN_MARKER)),
            glob::Pattern::escape(suffix)
        );
        let paths = self.expand(&pattern, &self.stem).await?;
        Ok(self.collect_angles(&paths, suffix, parse_vertical))
    }

    fn collect_angles(
        &self,
        paths: &[String],
        suffix: &str,
        parse: fn(&str, &str, &str) -> Option<u32>,
    ) -> Vec<u32> {
        let mut angles: Vec<u32> = paths
            .iter()
            .filter_map(|path| {
                let angle = parse(&self.stem, path, suffix);
                if angle.is_none() {
                    warn!(
                        path = %redact_credentials(path),
                        "Ignoring sequence member with malformed angle token"
                    );
                }
                angle
            })
            .collect();
        angles.sort_unstable();
        angles
    }

    async fn expand(&self, pattern: &str, display: &str) -> Result<Vec<String>, SourceError> {
        self.source
            .expand(pattern)
            .await
            .map_err(|e| SourceError::from_io(redact_credentials(display), e))
    }

    fn not_found(&self) -> SourceError {
        SourceError::NotFound {
            path: redact_credentials(&self.stem),
        }
    }
}
