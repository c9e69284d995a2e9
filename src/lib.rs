//! Photo Transfer Library
//!
//! Finds photos whose capture time falls inside a date range and copies them
//! into one folder under a name derived from the capture time and the camera
//! model, for example `IMG_20200615_140309_FH.jpg`.
//!
//! # Architecture
//!
//! - [`core`] - Metadata extraction, naming, scanning, copying, progress
//!   reporting, configuration and the background worker
//! - [`cli`] - Command-line interface (only used by the binary)
//! - [`testdb`] - Generator for JPEG files with chosen EXIF tags
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use photo_transfer::core::config::Config;
//! use photo_transfer::core::photo::DateRange;
//! use photo_transfer::core::progress::TransferProgress;
//! use photo_transfer::core::transfer::{PhotoTransfer, TransferRequest};
//! use chrono::NaiveDate;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let transfer = PhotoTransfer::from_config(&config);
//!
//!     let range = DateRange::new(
//!         NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
//!         NaiveDate::from_ymd_opt(2020, 6, 30).unwrap(),
//!     )?;
//!     let request = TransferRequest::new("D:/DCIM", "C:/Pictures/June", range);
//!
//!     let report = |p: TransferProgress| println!("{:?} {:5.1}% {}", p.phase, p.percent, p.message);
//!     let summary = transfer.find_and_copy(&request, &report)?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```
//!
//! # UI Integration
//!
//! [`core::worker::TransferWorker`] runs a transfer on a background thread.
//! Poll its snapshots from the UI loop; a second start is refused while one
//! is scanning or copying.
//!
//! ```rust,no_run
//! use photo_transfer::core::config::Config;
//! use photo_transfer::core::transfer::{PhotoTransfer, TransferRequest};
//! use photo_transfer::core::worker::TransferWorker;
//! # fn request() -> TransferRequest { unimplemented!() }
//!
//! let worker = TransferWorker::new(PhotoTransfer::from_config(&Config::default()));
//! worker.start(request()).unwrap();
//! while !worker.is_finished() {
//!     for snapshot in worker.drain_events() {
//!         // update the progress bar
//!     }
//! }
//! let outcome = worker.wait();
//! ```

pub mod cli;
pub mod core;
pub mod testdb;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
