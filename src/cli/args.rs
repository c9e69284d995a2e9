//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Date format accepted on the command line
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Copy photos taken within a date range into one folder, renamed by capture time
#[derive(Parser, Debug)]
#[command(name = "photo-transfer")]
#[command(version)]
#[command(about = "Find photos taken within a date range and copy them into one folder, named by capture time and camera", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find photos taken between two dates and copy them to the target folder
    ///
    /// Values not given on the command line are taken from the configuration,
    /// which remembers the last successful transfer.
    Transfer {
        /// Folder searched recursively for .jpg files
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Existing folder the photos are copied into
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// First day, YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,

        /// Last day (inclusive), YYYY-MM-DD; defaults to the first day
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,

        /// Keep the original file name (plus camera suffix)
        #[arg(short, long)]
        keep_original_name: bool,

        /// Stop at the first photo that cannot be copied
        #[arg(long)]
        abort_on_error: bool,
    },

    /// Copy specific files or folders, regardless of date
    Copy {
        /// Files and folders to copy; folders are searched recursively
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Existing folder the photos are copied into
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// Keep the original file name (plus camera suffix)
        #[arg(short, long)]
        keep_original_name: bool,
    },

    /// List the photos a transfer would copy, without copying anything
    Scan {
        /// Folder searched recursively for .jpg files
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// First day, YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,

        /// Last day (inclusive), YYYY-MM-DD; defaults to the first day
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,

        /// Show original instead of normalized target names
        #[arg(short, long)]
        keep_original_name: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Open the configuration file in your default editor
    ///
    /// If no config file exists, a default one will be created.
    Config {
        /// Show the config file path without opening it
        #[arg(long)]
        path: bool,

        /// Reset config to defaults (creates a fresh config file)
        #[arg(long)]
        reset: bool,
    },

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration
    ShowConfig,

    /// Write a folder of sample photos with EXIF data to try the tool on
    GenerateSamples {
        /// Output directory for generated files
        #[arg(short, long)]
        output: PathBuf,

        /// Number of photos to generate
        #[arg(short = 'n', long, default_value = "50")]
        count: usize,

        /// First capture day, YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,

        /// Number of days the capture times are spread over
        #[arg(long, default_value = "60")]
        days: i64,

        /// Seed for reproducible generation
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| format!("'{}' is not a date in YYYY-MM-DD format ({})", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2020-06-01").unwrap(),
            NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()
        );
        assert!(parse_date("01.06.2020").is_err());
        assert!(parse_date("2020-02-30").is_err());
    }

    #[test]
    fn test_transfer_arguments() {
        let args = Args::parse_from([
            "photo-transfer",
            "transfer",
            "--source",
            "in",
            "--target",
            "out",
            "--from",
            "2020-06-01",
            "--to",
            "2020-06-30",
            "-k",
        ]);
        match args.command {
            Commands::Transfer {
                source,
                from,
                keep_original_name,
                abort_on_error,
                ..
            } => {
                assert_eq!(source, Some(PathBuf::from("in")));
                assert_eq!(from, NaiveDate::from_ymd_opt(2020, 6, 1));
                assert!(keep_original_name);
                assert!(!abort_on_error);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_copy_requires_paths() {
        assert!(Args::try_parse_from(["photo-transfer", "copy", "--target", "out"]).is_err());
    }
}
