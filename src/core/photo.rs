//! Photo records and date ranges
//!
//! A [`PhotoRecord`] is one JPEG file that passed classification: its path,
//! capture time and camera suffix. Both destination names are derived from
//! those three values. [`DateRange`] is the caller's calendar-day filter.

use crate::core::error::{Result, TransferError};
use crate::core::metadata::PhotoMetadata;
use crate::core::naming::{self, CameraModelTable, NamingMode};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// One classified photo file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoRecord {
    original_path: PathBuf,
    captured_at: NaiveDateTime,
    camera_suffix: String,
}

impl PhotoRecord {
    pub fn new(
        original_path: impl Into<PathBuf>,
        captured_at: NaiveDateTime,
        camera_suffix: impl Into<String>,
    ) -> Self {
        Self {
            original_path: original_path.into(),
            captured_at,
            camera_suffix: camera_suffix.into(),
        }
    }

    /// Build a record from freshly read metadata
    pub fn from_metadata(
        original_path: impl Into<PathBuf>,
        metadata: &PhotoMetadata,
        camera_models: &CameraModelTable,
    ) -> Self {
        let suffix = camera_models.suffix_for(metadata.camera_model.as_deref());
        Self::new(original_path, metadata.captured_at, suffix)
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    pub fn captured_at(&self) -> NaiveDateTime {
        self.captured_at
    }

    /// Camera suffix, empty when the model was unknown
    pub fn camera_suffix(&self) -> &str {
        &self.camera_suffix
    }

    /// `IMG_<yyyyMMdd_HHmmss>[_<suffix>].jpg`
    pub fn normalized_name(&self) -> String {
        naming::normalized_name(self.captured_at, &self.camera_suffix)
    }

    /// `<original-stem>[_<suffix>].jpg`
    pub fn keep_original_name(&self) -> String {
        naming::keep_original_name(&self.original_path, &self.camera_suffix)
    }

    /// Destination file name for the given naming mode
    pub fn resolved_name(&self, naming: NamingMode) -> String {
        match naming {
            NamingMode::Normalized => self.normalized_name(),
            NamingMode::KeepOriginal => self.keep_original_name(),
        }
    }
}

/// Inclusive range of calendar days
///
/// Filtering uses the half-open interval `[start 00:00, end + 1 day 00:00)`,
/// so every moment of the end day is inside the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Validate and build a range; `start` may equal `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(TransferError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// First instant inside the range
    pub fn lower_bound(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// First instant after the range; `None` when the end day is the last representable date
    pub fn upper_bound(&self) -> Option<NaiveDateTime> {
        self.end.succ_opt().map(|d| d.and_time(NaiveTime::MIN))
    }

    pub fn contains(&self, moment: NaiveDateTime) -> bool {
        moment >= self.lower_bound() && self.upper_bound().map_or(true, |upper| moment < upper)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Check if a file is a transfer candidate based on its extension
pub fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(naming::JPEG_EXTENSION))
        .unwrap_or(false)
}
