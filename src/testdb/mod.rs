//! Test data module
//!
//! Builds small but valid JPEG files with chosen EXIF tags, and whole demo
//! source trees, so the transfer pipeline can be exercised without a real
//! photo collection.
//!
//! ```rust,no_run
//! use photo_transfer::testdb::{generate_sample_tree, SampleTreeConfig};
//!
//! let summary = generate_sample_tree(&SampleTreeConfig::new("./samples")).unwrap();
//! println!("{} files written", summary.files_written);
//! ```

pub mod generator;

pub use generator::{
    generate_sample_tree, set_modified_time, JpegBuilder, SampleTreeConfig, SampleTreeSummary,
};
