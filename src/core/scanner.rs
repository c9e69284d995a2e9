//! Date-range scanner
//!
//! Walks a source tree, reads the metadata of every `.jpg` file and keeps the
//! ones whose capture time falls inside a [`DateRange`]. Enumeration happens
//! first so the scan can report a real percentage.

use crate::core::error::{Result, TransferError};
use crate::core::metadata::{ExifMetadataReader, MetadataOutcome, MetadataReader};
use crate::core::naming::CameraModelTable;
use crate::core::photo::{is_jpeg, DateRange, PhotoRecord};
use crate::core::progress::{percent_of, photo_count, PhaseReporter, ProgressSink, TransferPhase};
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

// =============================================================================
// Scan results
// =============================================================================

/// Counters collected during one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// `.jpg` files found under the source root
    pub candidates: usize,
    /// Files inside the date range
    pub matched: usize,
    /// Readable files outside the date range
    pub out_of_range: usize,
    /// Files skipped because their metadata could not be read
    pub unreadable: usize,
    /// Wall-clock duration of the scan
    pub duration_ms: u64,
}

impl fmt::Display for ScanStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidates, {} matched, {} out of range, {} unreadable ({} ms)",
            self.candidates, self.matched, self.out_of_range, self.unreadable, self.duration_ms
        )
    }
}

/// Matches of a scan plus its statistics
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Matching photos in enumeration order
    pub records: Vec<PhotoRecord>,
    pub stats: ScanStats,
}

impl ScanOutcome {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// Scanner
// =============================================================================

/// Finds photos taken within a date range
#[derive(Clone)]
pub struct Scanner {
    reader: Arc<dyn MetadataReader>,
    camera_models: Arc<CameraModelTable>,
}

impl Scanner {
    pub fn new(reader: Arc<dyn MetadataReader>, camera_models: Arc<CameraModelTable>) -> Self {
        Self {
            reader,
            camera_models,
        }
    }

    /// EXIF reader with the built-in camera table
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(ExifMetadataReader::new()),
            Arc::new(CameraModelTable::builtin()),
        )
    }

    /// Scan `root` for photos captured inside `range`
    ///
    /// Fails with [`TransferError::SourceUnavailable`] before any progress is
    /// emitted when the root is missing or cannot be listed.
    pub fn scan(
        &self,
        root: &Path,
        range: &DateRange,
        sink: &dyn ProgressSink,
    ) -> Result<ScanOutcome> {
        check_source(root)?;
        let started = Instant::now();

        let files = collect_jpeg_files(root)?;
        let total = files.len();
        info!(
            "Scanning {} JPEG files under {} for {}",
            total,
            root.display(),
            range
        );

        let mut reporter = PhaseReporter::begin(
            sink,
            TransferPhase::Scanning,
            format!("Scanning {} files ...", total),
        );

        let mut stats = ScanStats {
            candidates: total,
            ..ScanStats::default()
        };
        let mut records = Vec::new();
        let mut last_whole_percent = 0u64;

        for (idx, path) in files.iter().enumerate() {
            let matched = match self.reader.read(path) {
                MetadataOutcome::Read(meta) => {
                    if range.contains(meta.captured_at) {
                        debug!(
                            "Match {} ({}, {:?})",
                            path.display(),
                            meta.captured_at,
                            meta.source
                        );
                        records.push(PhotoRecord::from_metadata(
                            path.clone(),
                            &meta,
                            &self.camera_models,
                        ));
                        true
                    } else {
                        stats.out_of_range += 1;
                        false
                    }
                }
                MetadataOutcome::Unreadable(reason) => {
                    warn!("Skipping: {}", unreadable(path, reason));
                    stats.unreadable += 1;
                    false
                }
            };

            let percent = percent_of(idx + 1, total);
            let whole = percent as u64;
            if matched {
                reporter.update(format!("{} found ...", photo_count(records.len())), percent);
                last_whole_percent = whole;
            } else if whole > last_whole_percent {
                reporter.advance(percent);
                last_whole_percent = whole;
            }
        }

        stats.matched = records.len();
        stats.duration_ms = started.elapsed().as_millis() as u64;
        info!("Scan finished: {}", stats);

        Ok(ScanOutcome { records, stats })
    }

    /// Read one file and build its record, regardless of date
    pub fn classify(&self, path: &Path) -> Option<PhotoRecord> {
        match self.reader.read(path) {
            MetadataOutcome::Read(meta) => Some(PhotoRecord::from_metadata(
                path,
                &meta,
                &self.camera_models,
            )),
            MetadataOutcome::Unreadable(reason) => {
                warn!("Skipping: {}", unreadable(path, reason));
                None
            }
        }
    }
}

fn unreadable(path: &Path, reason: String) -> TransferError {
    TransferError::MetadataUnreadable {
        path: path.to_path_buf(),
        reason,
    }
}

/// Verify that `root` is a listable directory
pub fn check_source(root: &Path) -> Result<()> {
    let unavailable = |reason: String| TransferError::SourceUnavailable {
        path: root.to_path_buf(),
        reason,
    };

    let meta = fs::metadata(root).map_err(|e| unavailable(e.to_string()))?;
    if !meta.is_dir() {
        return Err(unavailable("not a directory".to_string()));
    }
    fs::read_dir(root).map_err(|e| unavailable(e.to_string()))?;
    Ok(())
}

/// All `.jpg` files below `root`, in walk order
///
/// Entries that cannot be read while walking are logged and skipped.
pub fn collect_jpeg_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if entry.file_type().is_file() && is_jpeg(entry.path()) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::{PhotoMetadata, TimestampSource};
    use crate::core::progress::{NullSink, RecordingSink};
    use crate::testdb::generator::JpegBuilder;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn june() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 6, 30).unwrap(),
        )
        .unwrap()
    }

    /// Reader answering from a fixed table keyed by file name
    struct CannedReader(HashMap<String, MetadataOutcome>);

    impl MetadataReader for CannedReader {
        fn read(&self, path: &Path) -> MetadataOutcome {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.0
                .get(&name)
                .cloned()
                .unwrap_or_else(|| MetadataOutcome::Unreadable("unknown".into()))
        }
    }

    fn canned(entries: &[(&str, Option<NaiveDateTime>)]) -> Scanner {
        let map = entries
            .iter()
            .map(|(name, when)| {
                let outcome = match when {
                    Some(t) => MetadataOutcome::Read(PhotoMetadata {
                        captured_at: *t,
                        camera_model: Some("iPhone 6".into()),
                        source: TimestampSource::Exif,
                    }),
                    None => MetadataOutcome::Unreadable("corrupt".into()),
                };
                (name.to_string(), outcome)
            })
            .collect();
        Scanner::new(
            Arc::new(CannedReader(map)),
            Arc::new(CameraModelTable::builtin()),
        )
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn test_scan_filters_by_range() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            touch(dir.path(), name);
        }
        let scanner = canned(&[
            ("a.jpg", Some(at(2020, 6, 1))),
            ("b.jpg", Some(at(2020, 6, 15))),
            ("c.jpg", Some(at(2020, 7, 1))),
        ]);

        let outcome = scanner.scan(dir.path(), &june(), &NullSink).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.stats.candidates, 3);
        assert_eq!(outcome.stats.matched, 2);
        assert_eq!(outcome.stats.out_of_range, 1);
        assert!(outcome.records.iter().all(|r| r.camera_suffix() == "i6"));
    }

    #[test]
    fn test_scan_skips_unreadable_and_non_jpeg() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "good.JPG");
        touch(dir.path(), "bad.jpg");
        touch(dir.path(), "notes.txt");
        let scanner = canned(&[("good.JPG", Some(at(2020, 6, 2))), ("bad.jpg", None)]);

        let outcome = scanner.scan(dir.path(), &june(), &NullSink).unwrap();
        assert_eq!(outcome.stats.candidates, 2);
        assert_eq!(outcome.stats.unreadable, 1);
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn test_scan_recurses_into_subdirectories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("2020").join("06");
        fs::create_dir_all(&nested).unwrap();
        JpegBuilder::new()
            .captured_at(at(2020, 6, 20))
            .camera_model("Canon IXUS 170")
            .write_to(&nested.join("deep.jpg"))
            .unwrap();

        let outcome = Scanner::with_defaults()
            .scan(dir.path(), &june(), &NullSink)
            .unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(
            outcome.records[0].normalized_name(),
            "IMG_20200620_120000_X7.jpg"
        );
    }

    #[test]
    fn test_scan_progress_is_monotonic() {
        let dir = TempDir::new().unwrap();
        let mut entries = Vec::new();
        let names: Vec<String> = (0..10).map(|i| format!("p{}.jpg", i)).collect();
        for (i, name) in names.iter().enumerate() {
            touch(dir.path(), name);
            let when = if i % 2 == 0 { at(2020, 6, 10) } else { at(2019, 1, 1) };
            entries.push((name.as_str(), Some(when)));
        }
        let scanner = canned(&entries);
        let sink = RecordingSink::new();

        scanner.scan(dir.path(), &june(), &sink).unwrap();
        let snapshots = sink.snapshots();
        assert_eq!(snapshots[0].message, "Scanning 10 files ...");
        assert_eq!(snapshots[0].percent, 0.0);
        assert!(snapshots.iter().all(|s| s.phase == TransferPhase::Scanning));
        assert!(snapshots.windows(2).all(|w| w[0].percent <= w[1].percent));
        assert_eq!(snapshots.last().unwrap().percent, 100.0);
        assert!(snapshots.iter().any(|s| s.message == "5 photos found ..."));
    }

    #[test]
    fn test_scan_progress_throttled_to_whole_percent() {
        let dir = TempDir::new().unwrap();
        let names: Vec<String> = (0..1000).map(|i| format!("old{:04}.jpg", i)).collect();
        for name in &names {
            touch(dir.path(), name);
        }
        let entries: Vec<(&str, Option<NaiveDateTime>)> = names
            .iter()
            .map(|name| (name.as_str(), Some(at(2019, 1, 1))))
            .collect();
        let sink = RecordingSink::new();

        let outcome = canned(&entries).scan(dir.path(), &june(), &sink).unwrap();
        assert_eq!(outcome.stats.out_of_range, 1000);

        // Opening snapshot plus one per whole percent.
        let snapshots = sink.snapshots();
        assert!(snapshots.len() <= 101, "{} snapshots", snapshots.len());
        assert_eq!(snapshots.last().unwrap().percent, 100.0);
    }

    #[test]
    fn test_unreadable_reason_names_the_file() {
        let err = unreadable(Path::new("/dcim/bad.jpg"), "corrupt".into());
        assert_eq!(
            err.to_string(),
            "Metadata of '/dcim/bad.jpg' could not be read: corrupt"
        );
    }

    #[test]
    fn test_missing_source_emits_nothing() {
        let dir = TempDir::new().unwrap();
        let sink = RecordingSink::new();
        let err = Scanner::with_defaults()
            .scan(&dir.path().join("missing"), &june(), &sink)
            .unwrap_err();
        assert!(matches!(err, TransferError::SourceUnavailable { .. }));
        assert!(sink.snapshots().is_empty());
    }

    #[test]
    fn test_source_must_be_directory() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "file.jpg");
        assert!(check_source(&dir.path().join("file.jpg")).is_err());
        assert!(check_source(dir.path()).is_ok());
    }

    #[test]
    fn test_empty_tree_reports_start_only() {
        let dir = TempDir::new().unwrap();
        let sink = RecordingSink::new();
        let outcome = Scanner::with_defaults()
            .scan(dir.path(), &june(), &sink)
            .unwrap();
        assert!(outcome.is_empty());
        assert_eq!(sink.snapshots().len(), 1);
    }
}
