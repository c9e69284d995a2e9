//! Transfer orchestration
//!
//! [`PhotoTransfer`] composes the scanner and the copier into the two
//! user-facing operations: "find and copy" for a date range, and the ad-hoc
//! copy of an explicit list of files and directories. Both report through the
//! same [`ProgressSink`].

use crate::core::config::Config;
use crate::core::copier::{check_target, BatchItem, Copier, CopyFailurePolicy, CopyReport};
use crate::core::error::Result;
use crate::core::metadata::{ExifMetadataReader, MetadataReader};
use crate::core::naming::{CameraModelTable, NamingMode};
use crate::core::photo::{is_jpeg, DateRange};
use crate::core::progress::{ProgressSink, TransferPhase, TransferProgress};
use crate::core::scanner::{check_source, collect_jpeg_files, ScanStats, Scanner};
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Terminal message when a scan matched nothing
pub const NO_PHOTOS_FOUND: &str = "No photos found";

/// Inputs of one find-and-copy operation
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub range: DateRange,
    pub naming: NamingMode,
}

impl TransferRequest {
    pub fn new(source_dir: impl Into<PathBuf>, target_dir: impl Into<PathBuf>, range: DateRange) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
            range,
            naming: NamingMode::Normalized,
        }
    }

    /// Copy under `<original-stem>[_<suffix>].jpg` instead of normalized names
    pub fn keep_original_name(mut self, keep: bool) -> Self {
        self.naming = NamingMode::from_keep_original(keep);
        self
    }
}

/// Result of a find-and-copy operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransferSummary {
    pub scan: ScanStats,
    pub copy: CopyReport,
}

impl TransferSummary {
    /// Whether the scan found nothing to copy
    pub fn nothing_found(&self) -> bool {
        self.scan.matched == 0
    }

    /// Same text as the terminal progress snapshot
    pub fn message(&self) -> String {
        if self.nothing_found() {
            NO_PHOTOS_FOUND.to_string()
        } else {
            self.copy.summary()
        }
    }
}

impl fmt::Display for TransferSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (scan: {})", self.message(), self.scan)
    }
}

/// Scan-then-copy pipeline
#[derive(Clone)]
pub struct PhotoTransfer {
    scanner: Scanner,
    copier: Copier,
}

impl PhotoTransfer {
    pub fn new(reader: Arc<dyn MetadataReader>, camera_models: Arc<CameraModelTable>) -> Self {
        Self {
            scanner: Scanner::new(reader, camera_models),
            copier: Copier::default(),
        }
    }

    /// EXIF reader, camera table and failure policy from the configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(ExifMetadataReader::new()),
            Arc::new(config.camera_table()),
        )
        .with_failure_policy(config.transfer.copy_failure_policy)
    }

    pub fn with_failure_policy(mut self, policy: CopyFailurePolicy) -> Self {
        self.copier = Copier::new(policy);
        self
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// Find photos in the request's date range and copy them
    ///
    /// Source and target are both validated before anything is reported.
    /// When nothing matches, the operation ends with a `Done` snapshot
    /// reading "No photos found" and never enters the copy phase.
    pub fn find_and_copy(
        &self,
        request: &TransferRequest,
        sink: &dyn ProgressSink,
    ) -> Result<TransferSummary> {
        check_source(&request.source_dir)?;
        check_target(&request.target_dir)?;
        info!(
            "Transferring photos from {} to {} for {}",
            request.source_dir.display(),
            request.target_dir.display(),
            request.range
        );

        let outcome = self
            .scanner
            .scan(&request.source_dir, &request.range, sink)?;

        if outcome.is_empty() {
            info!("No photos in range {}", request.range);
            sink.report(TransferProgress::new(
                TransferPhase::Done,
                NO_PHOTOS_FOUND,
                0.0,
            ));
            return Ok(TransferSummary {
                scan: outcome.stats,
                copy: CopyReport::default(),
            });
        }

        let copy = self.copier.copy_all(
            &outcome.records,
            &request.target_dir,
            request.naming,
            sink,
        )?;

        Ok(TransferSummary {
            scan: outcome.stats,
            copy,
        })
    }

    /// Copy an explicit list of files and directories
    ///
    /// Directories are expanded recursively to their `.jpg` files; other
    /// files and missing paths are skipped with a warning. Each file is
    /// classified right before it is copied, with no date filter.
    pub fn copy_ad_hoc(
        &self,
        paths: &[PathBuf],
        target_dir: &Path,
        naming: NamingMode,
        sink: &dyn ProgressSink,
    ) -> Result<CopyReport> {
        check_target(target_dir)?;

        let files = expand_inputs(paths)?;
        info!(
            "Ad-hoc copy of {} files from {} inputs",
            files.len(),
            paths.len()
        );

        let scanner = &self.scanner;
        let items = files.iter().map(|path| match scanner.classify(path) {
            Some(record) => BatchItem::Record(record),
            None => BatchItem::Unreadable(path.clone()),
        });

        self.copier
            .run_batch(files.len(), items, target_dir, naming, sink)
    }
}

/// Expand files and directories into the list of `.jpg` files to copy
pub fn expand_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            files.extend(collect_jpeg_files(path)?);
        } else if path.is_file() {
            if is_jpeg(path) {
                files.push(path.clone());
            } else {
                warn!("Skipping non-JPEG file {}", path.display());
            }
        } else {
            warn!("Skipping missing path {}", path.display());
        }
    }

    Ok(files)
}
