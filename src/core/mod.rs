//! Core functionality module
//!
//! This module contains the core business logic for the photo transfer tool:
//! metadata extraction, file naming, scanning, copying, progress reporting and
//! configuration.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and management
//! - `copier` - Copying photos into the target directory
//! - `error` - Error types and result aliases
//! - `metadata` - EXIF capture time and camera model extraction
//! - `naming` - Camera suffix table and destination names
//! - `photo` - Photo records and date ranges
//! - `progress` - Progress snapshots and sinks
//! - `scanner` - Date-range scan of a source tree
//! - `transfer` - Find-and-copy and ad-hoc copy orchestration
//! - `worker` - Background thread running one transfer at a time

pub mod config;
pub mod copier;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod photo;
pub mod progress;
pub mod scanner;
pub mod transfer;
pub mod worker;
