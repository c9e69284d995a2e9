//! Photo copier
//!
//! Copies classified photos into a target directory under their resolved
//! names. An existing file at the destination is never overwritten; the photo
//! is skipped instead. Each copy goes through a temporary file that is linked
//! into place once complete.

use crate::core::error::{Result, TransferError};
use crate::core::naming::NamingMode;
use crate::core::photo::PhotoRecord;
use crate::core::progress::{percent_of, photo_count, PhaseReporter, ProgressSink, TransferPhase};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What to do when copying a single photo fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyFailurePolicy {
    /// Record the failure and continue with the next photo
    #[default]
    Isolate,
    /// Stop the batch at the first failure
    Abort,
}

impl fmt::Display for CopyFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyFailurePolicy::Isolate => f.write_str("isolate"),
            CopyFailurePolicy::Abort => f.write_str("abort"),
        }
    }
}

/// Result of copying one photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    /// A new file was written
    Copied { destination: PathBuf, bytes: u64 },
    /// A file already existed at the destination
    Skipped { destination: PathBuf },
}

impl CopyOutcome {
    pub fn destination(&self) -> &Path {
        match self {
            CopyOutcome::Copied { destination, .. } | CopyOutcome::Skipped { destination } => {
                destination
            }
        }
    }
}

/// One photo that could not be copied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyFailure {
    pub path: PathBuf,
    pub destination: PathBuf,
    pub message: String,
}

/// Totals of one copy batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    /// Photos written to the target
    pub copied: usize,
    /// Photos whose destination already existed
    pub skipped: usize,
    /// Ad-hoc inputs whose metadata could not be read
    pub unreadable: usize,
    pub failures: Vec<CopyFailure>,
    pub bytes_copied: u64,
}

impl CopyReport {
    pub fn processed(&self) -> usize {
        self.copied + self.skipped + self.unreadable + self.failures.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Final status line, e.g. "2 photos copied."
    pub fn summary(&self) -> String {
        let mut line = format!("{} copied", photo_count(self.copied));
        if self.skipped > 0 {
            line.push_str(&format!(", {} already present", self.skipped));
        }
        if self.unreadable > 0 {
            line.push_str(&format!(", {} unreadable", self.unreadable));
        }
        if !self.failures.is_empty() {
            line.push_str(&format!(", {} failed", self.failures.len()));
        }
        line.push('.');
        line
    }
}

impl fmt::Display for CopyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// One unit of work in a copy batch
#[derive(Debug, Clone)]
pub enum BatchItem {
    /// A classified photo to copy
    Record(PhotoRecord),
    /// An input that could not be classified
    Unreadable(PathBuf),
}

/// Copies photos into a target directory
#[derive(Debug, Clone, Copy, Default)]
pub struct Copier {
    failure_policy: CopyFailurePolicy,
}

impl Copier {
    pub fn new(failure_policy: CopyFailurePolicy) -> Self {
        Self { failure_policy }
    }

    /// Copy a single photo, validating the target first
    pub fn copy_one(
        &self,
        record: &PhotoRecord,
        target_dir: &Path,
        naming: NamingMode,
    ) -> Result<CopyOutcome> {
        check_target(target_dir)?;
        copy_record(record, target_dir, naming)
    }

    /// Copy every record, reporting `Copying` progress and a final `Done`
    pub fn copy_all(
        &self,
        records: &[PhotoRecord],
        target_dir: &Path,
        naming: NamingMode,
        sink: &dyn ProgressSink,
    ) -> Result<CopyReport> {
        let items = records.iter().cloned().map(BatchItem::Record);
        self.run_batch(records.len(), items, target_dir, naming, sink)
    }

    /// Copy a stream of `total` items
    ///
    /// The target is checked before any progress is emitted. Every item
    /// advances the percentage, including skipped and unreadable ones.
    pub fn run_batch<I>(
        &self,
        total: usize,
        items: I,
        target_dir: &Path,
        naming: NamingMode,
        sink: &dyn ProgressSink,
    ) -> Result<CopyReport>
    where
        I: IntoIterator<Item = BatchItem>,
    {
        check_target(target_dir)?;
        info!(
            "Copying {} to {} ({:?} names)",
            photo_count(total),
            target_dir.display(),
            naming
        );

        let mut reporter = PhaseReporter::begin(
            sink,
            TransferPhase::Copying,
            format!("0 of {} photos copied ...", total),
        );
        let mut report = CopyReport::default();

        for item in items {
            match item {
                BatchItem::Record(record) => match copy_record(&record, target_dir, naming) {
                    Ok(CopyOutcome::Copied { bytes, .. }) => {
                        report.copied += 1;
                        report.bytes_copied += bytes;
                    }
                    Ok(CopyOutcome::Skipped { destination }) => {
                        debug!("Already present: {}", destination.display());
                        report.skipped += 1;
                    }
                    Err(e) => {
                        warn!("{}", e);
                        if self.failure_policy == CopyFailurePolicy::Abort {
                            reporter.finish(format!(
                                "Copy aborted after {}: {}",
                                photo_count(report.copied),
                                e
                            ));
                            return Err(e);
                        }
                        report.failures.push(failure_entry(&record, target_dir, naming, &e));
                    }
                },
                BatchItem::Unreadable(path) => {
                    warn!("Skipping unreadable photo {}", path.display());
                    report.unreadable += 1;
                }
            }

            let processed = report.processed();
            reporter.update(
                format!("{} of {} photos copied ...", processed, total),
                percent_of(processed, total.max(processed)),
            );
        }

        info!("Copy finished: {}", report);
        reporter.finish(report.summary());
        Ok(report)
    }
}

fn failure_entry(
    record: &PhotoRecord,
    target_dir: &Path,
    naming: NamingMode,
    error: &TransferError,
) -> CopyFailure {
    let message = match error {
        TransferError::CopyFailed { message, .. } => message.clone(),
        other => other.to_string(),
    };
    CopyFailure {
        path: record.original_path().to_path_buf(),
        destination: target_dir.join(record.resolved_name(naming)),
        message,
    }
}

/// Verify that `target_dir` is an existing, writable directory
pub fn check_target(target_dir: &Path) -> Result<()> {
    let unavailable = |reason: &str| TransferError::TargetUnavailable {
        path: target_dir.to_path_buf(),
        reason: reason.to_string(),
    };

    let meta = fs::metadata(target_dir).map_err(|e| unavailable(&e.to_string()))?;
    if !meta.is_dir() {
        return Err(unavailable("not a directory"));
    }

    // Probe actual write access, not the mode bits
    tempfile::Builder::new()
        .prefix(".photo_transfer")
        .tempfile_in(target_dir)
        .map_err(|e| unavailable(&format!("not writable: {}", e)))?;
    Ok(())
}

/// Copy without re-checking the target
fn copy_record(record: &PhotoRecord, target_dir: &Path, naming: NamingMode) -> Result<CopyOutcome> {
    let name = record.resolved_name(naming);
    let destination = target_dir.join(&name);

    if destination.exists() {
        return Ok(CopyOutcome::Skipped { destination });
    }

    let partial = target_dir.join(format!(".{}.partial", name));
    let copy_failed = |message: String| TransferError::CopyFailed {
        path: record.original_path().to_path_buf(),
        destination: destination.clone(),
        message,
    };

    let bytes = match fs::copy(record.original_path(), &partial) {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = fs::remove_file(&partial);
            return Err(copy_failed(e.to_string()));
        }
    };

    match place_partial(&partial, &destination) {
        Ok(true) => {}
        Ok(false) => {
            debug!("Appeared while copying: {}", destination.display());
            return Ok(CopyOutcome::Skipped { destination });
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            return Err(copy_failed(e.to_string()));
        }
    }

    debug!(
        "Copied {} -> {}",
        record.original_path().display(),
        destination.display()
    );
    Ok(CopyOutcome::Copied { destination, bytes })
}

/// Move a finished partial file to `destination` without replacing anything
///
/// Returns `Ok(false)` when a file already sits at the destination; the
/// partial is removed in that case. Hard links refuse to clobber, so they are
/// tried first. File systems without hard links fall back to a rename.
fn place_partial(partial: &Path, destination: &Path) -> io::Result<bool> {
    match fs::hard_link(partial, destination) {
        Ok(()) => {
            fs::remove_file(partial)?;
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            fs::remove_file(partial)?;
            Ok(false)
        }
        Err(e) => {
            debug!("Hard link to {} failed ({}), renaming", destination.display(), e);
            if destination.exists() {
                fs::remove_file(partial)?;
                return Ok(false);
            }
            fs::rename(partial, destination)?;
            Ok(true)
        }
    }
}
