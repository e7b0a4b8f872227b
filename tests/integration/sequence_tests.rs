//! Sequence discovery tests on local disk.
//!
//! Tests verify:
//! - Angle lists are enumerated from member file names and sorted
//! - Canonical members with several extensions are rejected as ambiguous
//! - Malformed members are skipped
//! - Filename resolution inverts discovery

use chrono::{DateTime, Utc};

use iip_source::{ImageFormat, ImageSource, Layout, SourceError};

use super::test_utils::{
    dir_base, fixed_time, image_bytes, local_backends, path_str, set_mtime, write_file, JP2,
    TIFF_LE,
};

fn write_members(dir: &std::path::Path, names: &[&str]) {
    for name in names {
        write_file(dir, name, &image_bytes(&TIFF_LE));
    }
}

fn sequence_source(base: String, pattern: &str) -> ImageSource {
    ImageSource::new(base, local_backends()).with_name_pattern(pattern)
}

// =============================================================================
// Discovery
// =============================================================================

#[tokio::test]
async fn test_sequence_from_directory_base() {
    let dir = tempfile::tempdir().unwrap();
    write_members(
        dir.path(),
        &["scan_000_090.tif", "scan_015_090.tif", "scan_000_045.tif"],
    );

    let mut image = sequence_source(dir_base(dir.path()), "scan_");
    let layout = image.initialise().await.unwrap();

    assert_eq!(layout, Layout::Sequence);
    assert!(!image.is_single_file());
    assert_eq!(image.suffix(), "tif");
    assert_eq!(image.format(), Some(ImageFormat::Tiff));
    assert_eq!(image.horizontal_angles(), &[0, 15]);
    assert_eq!(image.vertical_angles(), &[45, 90]);
}

#[tokio::test]
async fn test_sequence_from_missing_file_base() {
    let dir = tempfile::tempdir().unwrap();
    write_members(
        dir.path(),
        &[
            "scan_000_090.tif",
            "scan_030_090.tif",
            "scan_330_090.tif",
            "scan_000_120.tif",
        ],
    );

    let base = path_str(&dir.path().join("scan"));
    let mut image = sequence_source(base, "_");
    assert_eq!(image.initialise().await.unwrap(), Layout::Sequence);

    assert_eq!(image.horizontal_angles(), &[0, 30, 330]);
    assert_eq!(image.vertical_angles(), &[90, 120]);
}

#[tokio::test]
async fn test_canonical_only_sequence() {
    let dir = tempfile::tempdir().unwrap();
    write_members(dir.path(), &["scan_000_090.tif"]);

    let mut image = sequence_source(dir_base(dir.path()), "scan_");
    image.initialise().await.unwrap();

    assert_eq!(image.horizontal_angles(), &[0]);
    assert_eq!(image.vertical_angles(), &[90]);
}

#[tokio::test]
async fn test_jpeg2000_sequence_format_from_suffix() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "scan_000_090.jp2", &image_bytes(&JP2));
    write_file(dir.path(), "scan_010_090.jp2", &image_bytes(&JP2));

    let mut image = sequence_source(dir_base(dir.path()), "scan_");
    image.initialise().await.unwrap();

    assert_eq!(image.suffix(), "jp2");
    assert_eq!(image.format(), Some(ImageFormat::Jpeg2000));
    assert_eq!(image.horizontal_angles(), &[0, 10]);
}

#[tokio::test]
async fn test_other_extensions_are_not_members() {
    let dir = tempfile::tempdir().unwrap();
    write_members(
        dir.path(),
        &["scan_000_090.tif", "scan_015_090.tif", "scan_030_090.png"],
    );

    let mut image = sequence_source(dir_base(dir.path()), "scan_");
    image.initialise().await.unwrap();

    assert_eq!(image.horizontal_angles(), &[0, 15]);
}

#[tokio::test]
async fn test_malformed_members_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_members(
        dir.path(),
        &[
            "scan_000_090.tif",
            "scan_abc_090.tif",
            "scan_-5_090.tif",
            "scan_000_x1.tif",
        ],
    );

    let mut image = sequence_source(dir_base(dir.path()), "scan_");
    image.initialise().await.unwrap();

    assert_eq!(image.horizontal_angles(), &[0]);
    assert_eq!(image.vertical_angles(), &[90]);
}

#[tokio::test]
async fn test_differently_padded_duplicates_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    write_members(
        dir.path(),
        &["scan_000_090.tif", "scan_015_090.tif", "scan_15_090.tif"],
    );

    let mut image = sequence_source(dir_base(dir.path()), "scan_");
    image.initialise().await.unwrap();

    assert_eq!(image.horizontal_angles(), &[0, 15, 15]);
}

#[tokio::test]
async fn test_glob_metacharacters_in_directory_name() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a[1]");
    std::fs::create_dir(&nested).unwrap();
    write_members(&nested, &["scan_000_090.tif", "scan_045_090.tif"]);

    let mut image = sequence_source(dir_base(&nested), "scan_");
    assert_eq!(image.initialise().await.unwrap(), Layout::Sequence);
    assert_eq!(image.horizontal_angles(), &[0, 45]);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_ambiguous_canonical_member() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "scan_000_090.tif", &image_bytes(&TIFF_LE));
    write_file(dir.path(), "scan_000_090.jp2", &image_bytes(&JP2));

    let mut image = sequence_source(dir_base(dir.path()), "scan_");
    let err = image.initialise().await.unwrap_err();

    match &err {
        SourceError::AmbiguousSequence { pattern, matches } => {
            assert_eq!(*matches, 2);
            assert!(pattern.ends_with("scan_000_090.*"));
        }
        other => panic!("expected AmbiguousSequence, got {:?}", other),
    }
    assert_eq!(err.status_code().as_u16(), 409);
    assert_eq!(image.layout(), None);
}

#[tokio::test]
async fn test_no_members_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    write_members(dir.path(), &["unrelated.tif"]);

    let mut image = sequence_source(dir_base(dir.path()), "scan_");
    let err = image.initialise().await.unwrap_err();

    assert!(matches!(err, SourceError::NotFound { .. }));
    assert_eq!(err.error_type(), "not_found");
}

#[tokio::test]
async fn test_members_without_canonical_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    write_members(dir.path(), &["scan_015_090.tif", "scan_000_045.tif"]);

    let mut image = sequence_source(dir_base(dir.path()), "scan_");
    let err = image.initialise().await.unwrap_err();
    assert!(matches!(err, SourceError::NotFound { .. }));
}

// =============================================================================
// Filenames and timestamps
// =============================================================================

#[tokio::test]
async fn test_resolve_filename_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    write_members(
        dir.path(),
        &["scan_000_090.tif", "scan_015_090.tif", "scan_000_045.tif"],
    );

    let mut image = sequence_source(dir_base(dir.path()), "scan_");
    image.initialise().await.unwrap();

    let resolved = image.resolve_filename(15, 90);
    assert_eq!(resolved, format!("{}scan_015_090.tif", dir_base(dir.path())));
    assert!(std::path::Path::new(&resolved).is_file());

    assert_eq!(
        image.resolve_filename(0, 45),
        format!("{}scan_000_045.tif", dir_base(dir.path()))
    );
    // Angles wider than three digits are not truncated
    assert_eq!(
        image.resolve_filename(1234, 5),
        format!("{}scan_1234_005.tif", dir_base(dir.path()))
    );
}

#[tokio::test]
async fn test_sequence_timestamp_is_canonical_member_mtime() {
    let dir = tempfile::tempdir().unwrap();
    write_members(dir.path(), &["scan_000_090.tif", "scan_015_090.tif"]);
    set_mtime(&dir.path().join("scan_000_090.tif"), fixed_time(1_500_000_000));
    set_mtime(&dir.path().join("scan_015_090.tif"), fixed_time(1_700_000_000));

    let mut image = sequence_source(dir_base(dir.path()), "scan_");
    image.initialise().await.unwrap();

    assert_eq!(
        image.timestamp(),
        DateTime::<Utc>::from_timestamp(1_500_000_000, 0).unwrap()
    );
}
