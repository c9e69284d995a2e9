//! Error types for the photo transfer tool
//!
//! Operation-level failures are returned as [`TransferError`]. Per-file
//! problems (unreadable metadata, a single failed copy) are normally recorded
//! in scan statistics or the copy report instead of aborting the batch.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the photo transfer tool
#[derive(Error, Debug)]
pub enum TransferError {
    /// The source directory is missing or cannot be read
    #[error("Source directory '{}' is not available: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    /// The target directory is missing or cannot be written
    #[error("Target directory '{}' is not available: {reason}", path.display())]
    TargetUnavailable { path: PathBuf, reason: String },

    /// Embedded metadata of a single file could not be read
    #[error("Metadata of '{}' could not be read: {reason}", path.display())]
    MetadataUnreadable { path: PathBuf, reason: String },

    /// Copying a single file failed
    #[error("Copying '{}' to '{}' failed: {message}", path.display(), destination.display())]
    CopyFailed {
        path: PathBuf,
        destination: PathBuf,
        message: String,
    },

    /// The start date lies after the end date
    #[error("The start date {start} must not be after the end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// A transfer is already running on this worker
    #[error("A transfer is already in progress")]
    Busy,

    /// The worker thread died before reporting a result
    #[error("Transfer worker failed: {0}")]
    WorkerFailed(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TransferError>;
