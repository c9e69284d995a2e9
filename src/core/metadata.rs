//! Photo metadata extraction
//!
//! Reads the capture time and camera model of a JPEG file. The capture time
//! comes from the EXIF `DateTimeOriginal` tag; when the tag is missing, or the
//! file carries no EXIF segment at all, the file's modification time is used
//! instead. Only a malformed or unreadable file is reported as
//! [`MetadataOutcome::Unreadable`], and callers skip such files.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use exif::{In, Tag, Value};
use log::trace;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Where a capture timestamp came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    /// EXIF `DateTimeOriginal`
    Exif,
    /// File system last-modified time
    FileModified,
}

/// Metadata read from one photo file
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoMetadata {
    /// When the photo was taken (camera local time, no zone attached)
    pub captured_at: NaiveDateTime,
    /// EXIF `Model` string, if present and not blank
    pub camera_model: Option<String>,
    /// Origin of `captured_at`
    pub source: TimestampSource,
}

/// Per-file result of a metadata read
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataOutcome {
    /// Metadata was read (possibly with the modification-time fallback)
    Read(PhotoMetadata),
    /// The file is not a readable JPEG; the reason is for logging only
    Unreadable(String),
}

impl MetadataOutcome {
    pub fn is_read(&self) -> bool {
        matches!(self, MetadataOutcome::Read(_))
    }

    pub fn metadata(&self) -> Option<&PhotoMetadata> {
        match self {
            MetadataOutcome::Read(meta) => Some(meta),
            MetadataOutcome::Unreadable(_) => None,
        }
    }
}

/// Source of photo metadata
///
/// The scanner and the ad-hoc copy path only depend on this trait, so tests
/// can drive them with canned metadata.
pub trait MetadataReader: Send + Sync {
    /// Read metadata of the file at `path`
    fn read(&self, path: &Path) -> MetadataOutcome;
}

/// [`MetadataReader`] backed by the EXIF segment of JPEG files
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifMetadataReader;

impl ExifMetadataReader {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataReader for ExifMetadataReader {
    fn read(&self, path: &Path) -> MetadataOutcome {
        // The handle lives only inside this block and is closed on every path.
        let parsed = {
            let file = match File::open(path) {
                Ok(f) => f,
                Err(e) => return MetadataOutcome::Unreadable(e.to_string()),
            };
            let mut reader = BufReader::new(file);
            exif::Reader::new().read_from_container(&mut reader)
        };

        let (exif_time, camera_model) = match parsed {
            Ok(exif) => (exif_capture_time(&exif), exif_camera_model(&exif)),
            Err(exif::Error::NotFound(_)) => {
                trace!("No EXIF data in {}", path.display());
                (None, None)
            }
            Err(e) => return MetadataOutcome::Unreadable(e.to_string()),
        };

        if let Some(captured_at) = exif_time {
            return MetadataOutcome::Read(PhotoMetadata {
                captured_at,
                camera_model,
                source: TimestampSource::Exif,
            });
        }

        match modified_time(path) {
            Ok(captured_at) => MetadataOutcome::Read(PhotoMetadata {
                captured_at,
                camera_model,
                source: TimestampSource::FileModified,
            }),
            Err(e) => MetadataOutcome::Unreadable(e.to_string()),
        }
    }
}

/// `DateTimeOriginal` as a naive date-time; `None` when absent or malformed
fn exif_capture_time(exif: &exif::Exif) -> Option<NaiveDateTime> {
    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    let Value::Ascii(ref values) = field.value else {
        return None;
    };
    let raw = values.first()?;
    let dt = exif::DateTime::from_ascii(raw).ok()?;

    NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))?
        .and_hms_opt(
            u32::from(dt.hour),
            u32::from(dt.minute),
            u32::from(dt.second),
        )
}

fn exif_camera_model(exif: &exif::Exif) -> Option<String> {
    let field = exif.get_field(Tag::Model, In::PRIMARY)?;
    let Value::Ascii(ref values) = field.value else {
        return None;
    };
    let model = String::from_utf8_lossy(values.first()?)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string();

    if model.is_empty() {
        None
    } else {
        Some(model)
    }
}

/// File modification time in local time
pub fn modified_time(path: &Path) -> std::io::Result<NaiveDateTime> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdb::generator::{set_modified_time, JpegBuilder};
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_reads_capture_time_and_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        let taken = at(2020, 6, 15, 14, 3, 9);
        JpegBuilder::new()
            .captured_at(taken)
            .camera_model("Canon EOS 450D")
            .write_to(&path)
            .unwrap();

        let outcome = ExifMetadataReader::new().read(&path);
        let meta = outcome.metadata().expect("metadata should be readable");
        assert_eq!(meta.captured_at, taken);
        assert_eq!(meta.camera_model.as_deref(), Some("Canon EOS 450D"));
        assert_eq!(meta.source, TimestampSource::Exif);
    }

    #[test]
    fn test_missing_exif_falls_back_to_modified_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.jpg");
        JpegBuilder::new().write_to(&path).unwrap();
        let mtime = at(2018, 5, 20, 12, 0, 0);
        set_modified_time(&path, mtime).unwrap();

        let outcome = ExifMetadataReader::new().read(&path);
        let meta = outcome.metadata().expect("fallback should succeed");
        assert_eq!(meta.captured_at, mtime);
        assert_eq!(meta.camera_model, None);
        assert_eq!(meta.source, TimestampSource::FileModified);
    }

    #[test]
    fn test_model_without_capture_time_keeps_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model_only.jpg");
        JpegBuilder::new()
            .camera_model("iPhone 6")
            .write_to(&path)
            .unwrap();
        let mtime = at(2017, 8, 1, 8, 30, 0);
        set_modified_time(&path, mtime).unwrap();

        let meta = ExifMetadataReader::new()
            .read(&path)
            .metadata()
            .cloned()
            .unwrap();
        assert_eq!(meta.captured_at, mtime);
        assert_eq!(meta.camera_model.as_deref(), Some("iPhone 6"));
        assert_eq!(meta.source, TimestampSource::FileModified);
    }

    #[test]
    fn test_garbage_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"this is not an image at all").unwrap();

        let outcome = ExifMetadataReader::new().read(&path);
        assert!(!outcome.is_read());
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let outcome = ExifMetadataReader::new().read(&dir.path().join("nope.jpg"));
        assert!(matches!(outcome, MetadataOutcome::Unreadable(_)));
    }
}
