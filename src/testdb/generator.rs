//! Sample photo generator
//!
//! Produces small but structurally valid JPEG files carrying EXIF
//! `DateTimeOriginal` and `Model` tags, plus whole sample source trees for the
//! `generate-samples` command. The image data itself is a placeholder; only
//! the metadata segments matter to the transfer pipeline.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, TimeZone};
use filetime::FileTime;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

// =============================================================================
// CONSTANTS
// =============================================================================

/// TIFF tag: camera model (IFD0)
const TAG_MODEL: u16 = 0x0110;
/// TIFF tag: pointer to the EXIF sub-IFD (IFD0)
const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
/// EXIF tag: original capture time (EXIF IFD)
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;

const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;

/// Offset of IFD0 inside the TIFF block (directly after the 8-byte header)
const IFD0_OFFSET: u32 = 8;

/// Camera models used for generated samples, with one the built-in table does not know
const SAMPLE_MODELS: &[&str] = &[
    "Canon EOS 450D",
    "Canon PowerShot SX120 IS",
    "Canon IXUS 170",
    "iPhone 6",
    "SM-G800F",
    "NIKON D750",
];

// =============================================================================
// JPEG GENERATION
// =============================================================================

/// Builder for a minimal JPEG file with optional EXIF tags
#[derive(Debug, Clone, Default)]
pub struct JpegBuilder {
    captured_at: Option<NaiveDateTime>,
    camera_model: Option<String>,
    padding: usize,
}

impl JpegBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the EXIF `DateTimeOriginal` tag
    pub fn captured_at(mut self, captured_at: NaiveDateTime) -> Self {
        self.captured_at = Some(captured_at);
        self
    }

    /// Set the EXIF `Model` tag
    pub fn camera_model(mut self, model: impl Into<String>) -> Self {
        self.camera_model = Some(model.into());
        self
    }

    /// Add filler bytes so files differ in size
    pub fn padding(mut self, bytes: usize) -> Self {
        self.padding = bytes;
        self
    }

    /// Encode the file
    ///
    /// Without any tag the result has no APP1 segment at all, which is how a
    /// JPEG without EXIF data looks.
    pub fn build(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(256 + self.padding);

        // SOI
        data.extend_from_slice(&[0xFF, 0xD8]);

        if self.captured_at.is_some() || self.camera_model.is_some() {
            let tiff = self.build_tiff();
            let segment_len = (2 + 6 + tiff.len()) as u16;
            data.extend_from_slice(&[0xFF, 0xE1]);
            data.extend_from_slice(&segment_len.to_be_bytes());
            data.extend_from_slice(b"Exif\0\0");
            data.extend_from_slice(&tiff);
        }

        // APP0 (JFIF)
        data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        data.extend_from_slice(b"JFIF\0");
        data.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);

        if self.padding > 0 {
            // COM segment, so the filler never looks like a marker
            let chunk = self.padding.min(u16::MAX as usize - 2);
            data.extend_from_slice(&[0xFF, 0xFE]);
            data.extend_from_slice(&((chunk + 2) as u16).to_be_bytes());
            data.extend(std::iter::repeat(b'.').take(chunk));
        }

        // EOI
        data.extend_from_slice(&[0xFF, 0xD9]);
        data
    }

    /// Encode the file and write it to `path`, creating parent directories
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.build())
    }

    /// Little-endian TIFF block: IFD0 (Model, EXIF pointer) and the EXIF IFD
    fn build_tiff(&self) -> Vec<u8> {
        let mut ifd0 = Vec::new();
        if let Some(ref model) = self.camera_model {
            ifd0.push(IfdEntry::ascii(TAG_MODEL, model));
        }

        let exif_entries: Vec<IfdEntry> = self
            .captured_at
            .map(|t| {
                let stamp = t.format("%Y:%m:%d %H:%M:%S").to_string();
                vec![IfdEntry::ascii(TAG_DATE_TIME_ORIGINAL, &stamp)]
            })
            .unwrap_or_default();

        if !exif_entries.is_empty() {
            // Placeholder; the real offset depends on the final IFD0 length.
            ifd0.push(IfdEntry::long(TAG_EXIF_IFD_POINTER, 0));
        }

        let exif_offset = IFD0_OFFSET + ifd_len(&ifd0) as u32;
        if let Some(pointer) = ifd0
            .iter_mut()
            .find(|e| e.tag == TAG_EXIF_IFD_POINTER)
        {
            pointer.payload = exif_offset.to_le_bytes().to_vec();
        }

        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II");
        tiff.extend_from_slice(&42u16.to_le_bytes());
        tiff.extend_from_slice(&IFD0_OFFSET.to_le_bytes());
        write_ifd(&mut tiff, IFD0_OFFSET, &ifd0);
        if !exif_entries.is_empty() {
            write_ifd(&mut tiff, exif_offset, &exif_entries);
        }
        tiff
    }
}

/// One directory entry with its encoded value
#[derive(Debug, Clone)]
struct IfdEntry {
    tag: u16,
    kind: u16,
    count: u32,
    payload: Vec<u8>,
}

impl IfdEntry {
    fn ascii(tag: u16, text: &str) -> Self {
        let mut payload = text.as_bytes().to_vec();
        payload.push(0);
        Self {
            tag,
            kind: TYPE_ASCII,
            count: payload.len() as u32,
            payload,
        }
    }

    fn long(tag: u16, value: u32) -> Self {
        Self {
            tag,
            kind: TYPE_LONG,
            count: 1,
            payload: value.to_le_bytes().to_vec(),
        }
    }

    fn is_inline(&self) -> bool {
        self.payload.len() <= 4
    }
}

fn padded_len(len: usize) -> usize {
    len + len % 2
}

/// Bytes an IFD occupies including its out-of-line values
fn ifd_len(entries: &[IfdEntry]) -> usize {
    let values: usize = entries
        .iter()
        .filter(|e| !e.is_inline())
        .map(|e| padded_len(e.payload.len()))
        .sum();
    2 + 12 * entries.len() + 4 + values
}

/// Append an IFD that starts at `offset` within the TIFF block
fn write_ifd(out: &mut Vec<u8>, offset: u32, entries: &[IfdEntry]) {
    let values_start = offset + (2 + 12 * entries.len() + 4) as u32;
    let mut values = Vec::new();

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.tag.to_le_bytes());
        out.extend_from_slice(&entry.kind.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        if entry.is_inline() {
            let mut inline = entry.payload.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            let value_offset = values_start + values.len() as u32;
            out.extend_from_slice(&value_offset.to_le_bytes());
            values.extend_from_slice(&entry.payload);
            if values.len() % 2 == 1 {
                values.push(0);
            }
        }
    }
    // No next IFD
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&values);
}

/// Set a file's modification time, interpreting `when` as local time
pub fn set_modified_time(path: &Path, when: NaiveDateTime) -> io::Result<()> {
    let local = Local
        .from_local_datetime(&when)
        .earliest()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "nonexistent local time"))?;
    let mtime = FileTime::from_unix_time(local.timestamp(), local.timestamp_subsec_nanos());
    filetime::set_file_mtime(path, mtime)
}

// =============================================================================
// SAMPLE TREES
// =============================================================================

/// Settings for [`generate_sample_tree`]
#[derive(Debug, Clone)]
pub struct SampleTreeConfig {
    /// Directory the sample tree is written to
    pub output_dir: PathBuf,
    /// Number of photos to generate
    pub count: usize,
    /// First capture day
    pub start_date: NaiveDate,
    /// Capture days are spread over this many days from `start_date`
    pub span_days: i64,
    /// Seed for reproducible generation
    pub seed: u64,
}

impl SampleTreeConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }
}

impl Default for SampleTreeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./sample_photos"),
            count: 50,
            start_date: NaiveDate::from_ymd_opt(2020, 6, 1).unwrap_or_default(),
            span_days: 60,
            seed: 42,
        }
    }
}

/// What [`generate_sample_tree`] wrote
#[derive(Debug, Clone, Default)]
pub struct SampleTreeSummary {
    pub files_written: usize,
    pub with_exif: usize,
    pub without_exif: usize,
    pub not_photos: usize,
}

/// Write a folder tree of sample photos
///
/// Files land in `<yyyy>/<mm>/DSC_<nnnn>.jpg`. Roughly one in ten photos has
/// no EXIF segment and gets its capture time as modification time instead; a
/// few non-photo files are mixed in to exercise the extension filter.
pub fn generate_sample_tree(config: &SampleTreeConfig) -> io::Result<SampleTreeSummary> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut summary = SampleTreeSummary::default();
    let span = config.span_days.max(1);

    info!(
        "Generating {} sample photos in {}",
        config.count,
        config.output_dir.display()
    );

    for index in 0..config.count {
        let day = config.start_date + Duration::days(rng.gen_range(0..span));
        let taken = day
            .and_hms_opt(
                rng.gen_range(6..22),
                rng.gen_range(0..60),
                rng.gen_range(0..60),
            )
            .unwrap_or_else(|| day.and_time(chrono::NaiveTime::MIN));

        let folder = config
            .output_dir
            .join(taken.format("%Y").to_string())
            .join(taken.format("%m").to_string());
        let extension = if index % 7 == 3 { "JPG" } else { "jpg" };
        let path = folder.join(format!("DSC_{:04}.{}", index + 1, extension));

        let builder = JpegBuilder::new().padding(rng.gen_range(64..2048));
        if rng.gen_ratio(1, 10) {
            builder.write_to(&path)?;
            set_modified_time(&path, taken)?;
            summary.without_exif += 1;
        } else {
            let model = SAMPLE_MODELS[rng.gen_range(0..SAMPLE_MODELS.len())];
            builder
                .captured_at(taken)
                .camera_model(model)
                .write_to(&path)?;
            summary.with_exif += 1;
        }
        debug!("Wrote sample {}", path.display());
        summary.files_written += 1;

        if index % 20 == 0 {
            fs::write(folder.join(format!("notes_{:04}.txt", index + 1)), b"not a photo")?;
            summary.not_photos += 1;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plain_jpeg_layout() {
        let data = JpegBuilder::new().build();
        assert_eq!(&data[..2], &[0xFF, 0xD8]);
        assert_eq!(&data[data.len() - 2..], &[0xFF, 0xD9]);
        assert!(!data.windows(6).any(|w| w == b"Exif\0\0"));
    }

    #[test]
    fn test_exif_segment_present_when_tagged() {
        let taken = NaiveDate::from_ymd_opt(2020, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let data = JpegBuilder::new()
            .captured_at(taken)
            .camera_model("iPhone 5")
            .build();
        assert_eq!(&data[2..4], &[0xFF, 0xE1]);
        assert!(data.windows(19).any(|w| w == b"2020:06:01 10:00:00"));
        assert!(data.windows(8).any(|w| w == b"iPhone 5"));
    }

    #[test]
    fn test_ifd_length_accounts_for_values() {
        let entries = vec![IfdEntry::ascii(TAG_MODEL, "Canon EOS 450D")];
        // 2 + 12 + 4 header, 15 value bytes padded to 16
        assert_eq!(ifd_len(&entries), 34);
    }

    #[test]
    fn test_generate_sample_tree_is_reproducible() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();

        let mut config = SampleTreeConfig::new(first.path());
        config.count = 12;
        let a = generate_sample_tree(&config).unwrap();
        config.output_dir = second.path().to_path_buf();
        let b = generate_sample_tree(&config).unwrap();

        assert_eq!(a.files_written, 12);
        assert_eq!(a.with_exif + a.without_exif, 12);
        assert_eq!(a.with_exif, b.with_exif);
        assert_eq!(a.not_photos, b.not_photos);
    }
}
