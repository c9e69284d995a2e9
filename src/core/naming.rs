//! Destination file naming
//!
//! Maps camera model strings to short suffix codes and builds the file name a
//! photo receives in the target directory. Everything in here is pure: no I/O,
//! no locale-dependent formatting.

use chrono::NaiveDateTime;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Timestamp layout used in normalized names (24-hour clock, fixed widths)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Prefix of every normalized name
pub const NAME_PREFIX: &str = "IMG_";

/// Extension forced onto every destination name
pub const JPEG_EXTENSION: &str = "jpg";

/// One row of the camera model table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraModel {
    /// Text searched for (case-insensitively) inside the EXIF model string
    pub pattern: String,
    /// Code appended to the file name when the pattern matches
    pub suffix: String,
}

impl CameraModel {
    pub fn new(pattern: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            suffix: suffix.into(),
        }
    }
}

/// Ordered camera model lookup table
///
/// Lookup returns the suffix of the first entry whose pattern occurs in the
/// model string, ignoring case. When several patterns match, table order
/// decides; there is no "most specific match" rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraModelTable {
    entries: Vec<CameraModel>,
    /// Lowercased patterns, same order as `entries`
    folded: Vec<String>,
}

impl CameraModelTable {
    /// Build a table from ordered entries
    ///
    /// Entries with an empty pattern and repeated patterns (compared without
    /// case) are dropped so the keys stay unique.
    pub fn new(entries: Vec<CameraModel>) -> Self {
        let mut kept = Vec::with_capacity(entries.len());
        let mut folded: Vec<String> = Vec::with_capacity(entries.len());

        for entry in entries {
            let key = entry.pattern.trim().to_lowercase();
            if key.is_empty() {
                warn!("Ignoring camera model entry with empty pattern");
                continue;
            }
            if folded.contains(&key) {
                warn!(
                    "Ignoring duplicate camera model pattern '{}'",
                    entry.pattern
                );
                continue;
            }
            folded.push(key);
            kept.push(entry);
        }

        Self {
            entries: kept,
            folded,
        }
    }

    /// The table shipped with the tool
    pub fn builtin() -> Self {
        Self::new(builtin_camera_models())
    }

    /// A table that never matches
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Find the suffix for a camera model string
    ///
    /// Returns an empty string when the model is absent, blank, or unknown.
    pub fn suffix_for(&self, camera_model: Option<&str>) -> &str {
        let model = match camera_model.map(str::trim) {
            Some(m) if !m.is_empty() => m.to_lowercase(),
            _ => return "",
        };

        self.folded
            .iter()
            .position(|pattern| model.contains(pattern.as_str()))
            .map(|idx| self.entries[idx].suffix.as_str())
            .unwrap_or("")
    }

    pub fn entries(&self) -> &[CameraModel] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CameraModelTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Built-in camera model entries, in lookup order
pub fn builtin_camera_models() -> Vec<CameraModel> {
    [
        ("Canon PowerShot SX120 IS", "PS"),
        ("Canon EOS 450D", "FH"),
        ("Canon IXUS 130", "X3"),
        ("Canon IXUS 170", "X7"),
        ("XT1039", "MG"), // Moto G
        ("W890i", "W8"),
        ("iPhone 5", "i5"),
        ("iPhone 6", "i6"),
        ("SM-G800F", "s5m"), // Galaxy S5 mini
    ]
    .into_iter()
    .map(|(pattern, suffix)| CameraModel::new(pattern, suffix))
    .collect()
}

/// Which of the two derived names a copy uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingMode {
    /// `IMG_<yyyyMMdd_HHmmss>[_<suffix>].jpg`
    #[default]
    Normalized,
    /// `<original-stem>[_<suffix>].jpg`
    KeepOriginal,
}

impl NamingMode {
    pub fn from_keep_original(keep_original_name: bool) -> Self {
        if keep_original_name {
            NamingMode::KeepOriginal
        } else {
            NamingMode::Normalized
        }
    }
}

fn with_suffix(base: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        format!("{}.{}", base, JPEG_EXTENSION)
    } else {
        format!("{}_{}.{}", base, suffix, JPEG_EXTENSION)
    }
}

/// `IMG_<yyyyMMdd_HHmmss>[_<suffix>].jpg`
pub fn normalized_name(captured_at: NaiveDateTime, suffix: &str) -> String {
    let stamp = captured_at.format(TIMESTAMP_FORMAT);
    with_suffix(&format!("{}{}", NAME_PREFIX, stamp), suffix)
}

/// `<original-stem>[_<suffix>].jpg`
pub fn keep_original_name(original_path: &Path, suffix: &str) -> String {
    let stem = original_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());
    with_suffix(&stem, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_substring_match_ignores_case() {
        let table = CameraModelTable::new(vec![CameraModel::new("EOS 450D", "FH")]);
        assert_eq!(table.suffix_for(Some("Canon EOS 450D")), "FH");
        assert_eq!(table.suffix_for(Some("CANON eos 450d")), "FH");
    }

    #[test]
    fn test_missing_or_unknown_model_yields_empty_suffix() {
        let table = CameraModelTable::builtin();
        assert_eq!(table.suffix_for(None), "");
        assert_eq!(table.suffix_for(Some("")), "");
        assert_eq!(table.suffix_for(Some("   ")), "");
        assert_eq!(table.suffix_for(Some("Nikon D750")), "");
    }

    #[test]
    fn test_first_matching_entry_wins() {
        let table = CameraModelTable::new(vec![
            CameraModel::new("iPhone", "iP"),
            CameraModel::new("iPhone 6", "i6"),
        ]);
        assert_eq!(table.suffix_for(Some("iPhone 6 Plus")), "iP");

        let reversed = CameraModelTable::new(vec![
            CameraModel::new("iPhone 6", "i6"),
            CameraModel::new("iPhone", "iP"),
        ]);
        assert_eq!(reversed.suffix_for(Some("iPhone 6 Plus")), "i6");
    }

    #[test]
    fn test_builtin_table() {
        let table = CameraModelTable::builtin();
        assert_eq!(table.len(), 9);
        assert_eq!(table.suffix_for(Some("Canon PowerShot SX120 IS")), "PS");
        assert_eq!(table.suffix_for(Some("XT1039")), "MG");
        assert_eq!(table.suffix_for(Some("SM-G800F")), "s5m");
    }

    #[test]
    fn test_duplicate_and_empty_patterns_dropped() {
        let table = CameraModelTable::new(vec![
            CameraModel::new("W890i", "W8"),
            CameraModel::new("w890I", "XX"),
            CameraModel::new("  ", "YY"),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.suffix_for(Some("Sony Ericsson W890i")), "W8");
    }

    #[test]
    fn test_normalized_name_without_suffix() {
        assert_eq!(
            normalized_name(at(2020, 6, 1, 9, 5, 7), ""),
            "IMG_20200601_090507.jpg"
        );
    }

    #[test]
    fn test_normalized_name_with_suffix() {
        assert_eq!(
            normalized_name(at(2015, 12, 24, 18, 30, 0), "FH"),
            "IMG_20151224_183000_FH.jpg"
        );
    }

    #[test]
    fn test_normalized_name_parses_back() {
        let taken = at(2019, 2, 28, 23, 59, 59);
        let name = normalized_name(taken, "i6");
        let stamp = &name[NAME_PREFIX.len()..NAME_PREFIX.len() + 15];
        let parsed = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).unwrap();
        assert_eq!(parsed, taken);
    }

    #[test]
    fn test_keep_original_name_forces_jpg() {
        assert_eq!(
            keep_original_name(Path::new("/photos/DSC_0042.JPG"), ""),
            "DSC_0042.jpg"
        );
        assert_eq!(
            keep_original_name(Path::new("/photos/DSC_0042.JPG"), "X7"),
            "DSC_0042_X7.jpg"
        );
    }

    #[test]
    fn test_naming_mode_from_flag() {
        assert_eq!(NamingMode::from_keep_original(true), NamingMode::KeepOriginal);
        assert_eq!(NamingMode::from_keep_original(false), NamingMode::Normalized);
    }
}
