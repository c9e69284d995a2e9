//! Command handlers for the CLI
//!
//! Every subcommand resolves its inputs (command line first, then the
//! configuration), calls into the core and prints the result.

use crate::cli::args::{Args, Commands};
use crate::cli::progress::{
    format_bytes, print_error, print_header, print_info, print_success, print_warning,
    TransferProgressBar,
};
use crate::core::config::{get_config_path, init_config, open_config_in_editor, Config};
use crate::core::copier::CopyFailurePolicy;
use crate::core::naming::NamingMode;
use crate::core::photo::DateRange;
use crate::core::progress::NullSink;
use crate::core::scanner::ScanStats;
use crate::core::transfer::{PhotoTransfer, TransferRequest};
use crate::core::worker::{TransferWorker, WorkerOutcome};
use crate::testdb::generator::{generate_sample_tree, SampleTreeConfig};
use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use log::{error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How often the transfer loop polls the worker
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the selected subcommand
pub fn run_command(args: &Args, config: &Config) -> Result<()> {
    match &args.command {
        Commands::Transfer {
            source,
            target,
            from,
            to,
            keep_original_name,
            abort_on_error,
        } => {
            let request = build_request(
                config,
                source.clone(),
                target.clone(),
                *from,
                *to,
                *keep_original_name,
            )?;
            let mut transfer = PhotoTransfer::from_config(config);
            if *abort_on_error {
                transfer = transfer.with_failure_policy(CopyFailurePolicy::Abort);
            }
            run_transfer(transfer, &request)?;
            if config.transfer.remember_last_run {
                remember_last_run(&request, args.config.as_deref());
            }
        }
        Commands::Copy {
            paths,
            target,
            keep_original_name,
        } => {
            copy_paths(config, paths, target.clone(), *keep_original_name)?;
        }
        Commands::Scan {
            source,
            from,
            to,
            keep_original_name,
            json,
        } => {
            let source = source
                .clone()
                .or_else(|| config.transfer.source_dir.clone())
                .ok_or_else(|| anyhow!("No source folder given (use --source)"))?;
            let range = resolve_range(config, *from, *to)?;
            let naming = if *keep_original_name {
                NamingMode::KeepOriginal
            } else {
                config.transfer.naming()
            };
            scan_source(config, &source, &range, naming, *json)?;
        }
        Commands::Config { path, reset } => {
            handle_config_command(*path, *reset)?;
        }
        Commands::GenerateConfig { output } => {
            generate_config_file(output.clone())?;
        }
        Commands::ShowConfig => {
            show_config(config);
        }
        Commands::GenerateSamples {
            output,
            count,
            from,
            days,
            seed,
        } => {
            generate_samples(output, *count, *from, *days, *seed)?;
        }
    }

    Ok(())
}

// ============================================================================
// Input resolution
// ============================================================================

/// Combine command-line values with the remembered ones
fn build_request(
    config: &Config,
    source: Option<PathBuf>,
    target: Option<PathBuf>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    keep_original_name: bool,
) -> Result<TransferRequest> {
    let source = source
        .or_else(|| config.transfer.source_dir.clone())
        .ok_or_else(|| anyhow!("No source folder given (use --source)"))?;
    let target = target
        .or_else(|| config.transfer.target_dir.clone())
        .ok_or_else(|| anyhow!("No target folder given (use --target)"))?;
    let range = resolve_range(config, from, to)?;

    let naming = if keep_original_name {
        NamingMode::KeepOriginal
    } else {
        config.transfer.naming()
    };

    Ok(TransferRequest {
        source_dir: source,
        target_dir: target,
        range,
        naming,
    })
}

/// Date range from the command line, falling back to the configuration
///
/// A lone `--from` selects that single day.
fn resolve_range(config: &Config, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<DateRange> {
    let (start, end) = match (from, to) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (start, start),
        (None, end) => {
            let start = config
                .transfer
                .start_date
                .ok_or_else(|| anyhow!("No start date given (use --from YYYY-MM-DD)"))?;
            (start, end.or(config.transfer.end_date).unwrap_or(start))
        }
    };

    Ok(DateRange::new(start, end)?)
}

// ============================================================================
// Transfer
// ============================================================================

/// Run a find-and-copy on the background worker and render its progress
fn run_transfer(transfer: PhotoTransfer, request: &TransferRequest) -> Result<()> {
    print_header("PHOTO TRANSFER");
    print_info(&format!("Source: {}", request.source_dir.display()));
    print_info(&format!("Target: {}", request.target_dir.display()));
    print_info(&format!("Dates:  {}", request.range));
    println!();

    let worker = TransferWorker::new(transfer);
    worker.start(request.clone())?;

    let bar = TransferProgressBar::new();
    loop {
        if let Some(event) = worker.recv_event_timeout(POLL_INTERVAL) {
            bar.render(&event);
            continue;
        }
        if worker.is_finished() {
            for event in worker.drain_events() {
                bar.render(&event);
            }
            break;
        }
    }
    bar.abandon();

    let outcome = worker.wait()?;
    println!();
    if let WorkerOutcome::Transfer(ref summary) = outcome {
        print_scan_stats(&summary.scan);
    }
    print_copy_outcome(&outcome);
    Ok(())
}

/// Store the folders and dates of a successful transfer
///
/// The stored file is reloaded first, so one-off flags such as
/// `--abort-on-error` or `--log-level` never end up in it.
fn remember_last_run(request: &TransferRequest, config_override: Option<&Path>) {
    let path = config_override
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::get_active_config_path);

    let mut stored = if path.exists() {
        match Config::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Could not remember settings: {}", e);
                return;
            }
        }
    } else {
        Config::default()
    };

    stored
        .transfer
        .remember(&request.source_dir, &request.target_dir, &request.range);
    match stored.save(&path) {
        Ok(()) => info!("Remembered settings in {}", path.display()),
        Err(e) => warn!("Could not remember settings: {}", e),
    }
}

/// Copy explicit files and folders
fn copy_paths(
    config: &Config,
    paths: &[PathBuf],
    target: Option<PathBuf>,
    keep_original_name: bool,
) -> Result<()> {
    let target = target
        .or_else(|| config.transfer.target_dir.clone())
        .ok_or_else(|| anyhow!("No target folder given (use --target)"))?;
    let naming = if keep_original_name {
        NamingMode::KeepOriginal
    } else {
        config.transfer.naming()
    };

    print_header("COPY PHOTOS");
    let transfer = PhotoTransfer::from_config(config);
    let bar = TransferProgressBar::new();
    let result = transfer.copy_ad_hoc(paths, &target, naming, &bar);
    bar.abandon();

    let report = result?;
    println!();
    print_copy_outcome(&WorkerOutcome::AdHoc(report));
    Ok(())
}

fn print_scan_stats(stats: &ScanStats) {
    print_info(&format!(
        "Searched {} files: {} in range, {} outside, {} unreadable",
        stats.candidates, stats.matched, stats.out_of_range, stats.unreadable
    ));
}

fn print_copy_outcome(outcome: &WorkerOutcome) {
    let report = outcome.copy_report();
    print_success(&outcome.message());
    if report.bytes_copied > 0 {
        print_info(&format!("{} written", format_bytes(report.bytes_copied)));
    }
    if report.skipped > 0 {
        print_info(&format!(
            "{} already existed in the target and were left untouched",
            report.skipped
        ));
    }
    for failure in &report.failures {
        print_error(&format!(
            "{} -> {}: {}",
            failure.path.display(),
            failure.destination.display(),
            failure.message
        ));
    }
}

// ============================================================================
// Scan (dry run)
// ============================================================================

/// One photo in the scan listing
#[derive(Debug, Serialize)]
struct ScannedPhoto {
    source: PathBuf,
    captured_at: NaiveDateTime,
    camera_suffix: String,
    target_name: String,
}

/// Machine-readable scan result
#[derive(Debug, Serialize)]
struct ScanListing {
    start_date: NaiveDate,
    end_date: NaiveDate,
    stats: ScanStats,
    photos: Vec<ScannedPhoto>,
}

fn scan_source(
    config: &Config,
    source: &Path,
    range: &DateRange,
    naming: NamingMode,
    json: bool,
) -> Result<()> {
    let transfer = PhotoTransfer::from_config(config);

    let outcome = if json {
        transfer.scanner().scan(source, range, &NullSink)?
    } else {
        print_header("SCAN");
        let bar = TransferProgressBar::new();
        let result = transfer.scanner().scan(source, range, &bar);
        bar.abandon();
        result?
    };

    let listing = ScanListing {
        start_date: range.start(),
        end_date: range.end(),
        photos: outcome
            .records
            .iter()
            .map(|record| ScannedPhoto {
                source: record.original_path().to_path_buf(),
                captured_at: record.captured_at(),
                camera_suffix: record.camera_suffix().to_string(),
                target_name: record.resolved_name(naming),
            })
            .collect(),
        stats: outcome.stats,
    };

    if json {
        let text = serde_json::to_string_pretty(&listing).context("Failed to encode scan result")?;
        println!("{}", text);
        return Ok(());
    }

    println!();
    for photo in &listing.photos {
        println!(
            "  {}  {}  ->  {}",
            photo.captured_at.format("%Y-%m-%d %H:%M:%S"),
            photo.source.display(),
            photo.target_name
        );
    }
    println!();
    print_scan_stats(&listing.stats);
    if listing.photos.is_empty() {
        print_warning("No photos found");
    }
    Ok(())
}

// ============================================================================
// Configuration commands
// ============================================================================

pub fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    if reset {
        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                std::fs::remove_file(&config_path)?;
                info!("Removed existing config file");
            }
        }
        let path = init_config()?;
        info!("Created fresh config file at: {}", path.display());
        return Ok(());
    }

    if show_path {
        let path = Config::get_active_config_path();
        println!("{}", path.display());
        if path.exists() {
            info!("Config file exists at: {}", path.display());
        } else {
            info!("Config file would be created at: {}", path.display());
        }
        return Ok(());
    }

    info!("Opening configuration file in default editor...");
    match open_config_in_editor() {
        Ok(path) => {
            info!("Config file: {}", path.display());
            info!("Run 'photo-transfer show-config' to verify your settings.");
        }
        Err(e) => {
            error!("Failed to open config file: {}", e);
            if let Some(path) = get_config_path() {
                info!("You can manually edit the config at: {}", path.display());
            }
        }
    }

    Ok(())
}

/// Generate a configuration file at the specified or default location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => {
            std::fs::write(&path, Config::generate_default_config())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            path
        }
        None => init_config()?,
    };

    info!("Configuration file: {}", output_path.display());
    info!("Edit this file to set folders, dates and camera suffixes.");
    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    info!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        info!("(Using default settings - no config file found)");
    }
    info!("");
    info!("[transfer]");
    info!("  source_dir = {}", display_path(config.transfer.source_dir.as_deref()));
    info!("  target_dir = {}", display_path(config.transfer.target_dir.as_deref()));
    info!("  start_date = {}", display_date(config.transfer.start_date));
    info!("  end_date = {}", display_date(config.transfer.end_date));
    info!("  keep_original_name = {}", config.transfer.keep_original_name);
    info!("  copy_failure_policy = \"{}\"", config.transfer.copy_failure_policy);
    info!("  remember_last_run = {}", config.transfer.remember_last_run);
    info!("");
    info!("[logging]");
    info!("  level = \"{}\"", config.logging.level);
    info!("  log_to_file = {}", config.logging.log_to_file);
    info!("  log_file = \"{}\"", config.logging.log_file.display());
    info!("");
    info!("[camera_models] ({} entries, first match wins)", config.camera_models.len());
    for model in config.camera_table().entries() {
        info!("  {:<28} -> {}", model.pattern, model.suffix);
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| format!("\"{}\"", p.display()))
        .unwrap_or_else(|| "(not set)".to_string())
}

fn display_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}

// ============================================================================
// Sample data
// ============================================================================

fn generate_samples(
    output: &Path,
    count: usize,
    from: Option<NaiveDate>,
    days: i64,
    seed: u64,
) -> Result<()> {
    let mut sample_config = SampleTreeConfig::new(output);
    sample_config.count = count;
    sample_config.span_days = days;
    sample_config.seed = seed;
    if let Some(start) = from {
        sample_config.start_date = start;
    }

    let summary = generate_sample_tree(&sample_config)
        .with_context(|| format!("Failed to write samples to {}", output.display()))?;

    print_success(&format!(
        "{} sample photos written to {}",
        summary.files_written,
        output.display()
    ));
    print_info(&format!(
        "{} with EXIF data, {} dated by file time only, {} non-photo files",
        summary.with_exif, summary.without_exif, summary.not_photos
    ));
    let last_day = sample_config.start_date + chrono::Duration::days(days.max(1) - 1);
    print_info(&format!(
        "Try: photo-transfer transfer --source {} --target <folder> --from {} --to {}",
        output.display(),
        sample_config.start_date,
        last_day
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_single_day_from_flag() {
        let range = resolve_range(&Config::default(), Some(day(2020, 6, 1)), None).unwrap();
        assert_eq!(range.start(), range.end());
    }

    #[test]
    fn test_range_falls_back_to_config() {
        let mut config = Config::default();
        config.transfer.start_date = Some(day(2020, 6, 1));
        config.transfer.end_date = Some(day(2020, 6, 30));

        let range = resolve_range(&config, None, None).unwrap();
        assert_eq!(range.end(), day(2020, 6, 30));
        assert!(resolve_range(&Config::default(), None, None).is_err());
    }

    #[test]
    fn test_reversed_range_rejected() {
        let err = resolve_range(&Config::default(), Some(day(2020, 7, 1)), Some(day(2020, 6, 1)))
            .unwrap_err();
        assert!(err.to_string().contains("must not be after"));
    }

    #[test]
    fn test_transfer_remembers_only_folders_and_dates() {
        use crate::testdb::generator::JpegBuilder;
        use clap::Parser;
        use tempfile::TempDir;

        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let config_path = home.path().join("config.toml");
        JpegBuilder::new()
            .captured_at(day(2020, 6, 10).and_hms_opt(9, 0, 0).unwrap())
            .write_to(&src.path().join("a.jpg"))
            .unwrap();

        let args = Args::parse_from([
            "photo-transfer",
            "--config",
            config_path.to_str().unwrap(),
            "--log-level",
            "debug",
            "transfer",
            "-s",
            src.path().to_str().unwrap(),
            "-t",
            dst.path().to_str().unwrap(),
            "--from",
            "2020-06-01",
            "--to",
            "2020-06-30",
            "--abort-on-error",
            "-k",
        ]);
        // As main applies it
        let mut config = Config::default();
        config.logging.level = "debug".to_string();
        run_command(&args, &config).unwrap();

        assert!(dst.path().join("a.jpg").exists());
        let stored = Config::load(&config_path).unwrap();
        assert_eq!(stored.transfer.source_dir.as_deref(), Some(src.path()));
        assert_eq!(stored.transfer.target_dir.as_deref(), Some(dst.path()));
        assert_eq!(stored.transfer.start_date, Some(day(2020, 6, 1)));
        assert_eq!(stored.transfer.end_date, Some(day(2020, 6, 30)));
        assert_eq!(stored.transfer.copy_failure_policy, CopyFailurePolicy::Isolate);
        assert!(!stored.transfer.keep_original_name);
        assert_eq!(stored.logging.level, "info");
    }

    #[test]
    fn test_request_needs_folders() {
        let err = build_request(&Config::default(), None, None, Some(day(2020, 6, 1)), None, false)
            .unwrap_err();
        assert!(err.to_string().contains("--source"));

        let mut config = Config::default();
        config.transfer.source_dir = Some(PathBuf::from("in"));
        config.transfer.target_dir = Some(PathBuf::from("out"));
        config.transfer.keep_original_name = true;
        let request = build_request(&config, None, None, Some(day(2020, 6, 1)), None, false).unwrap();
        assert_eq!(request.naming, NamingMode::KeepOriginal);
        assert_eq!(request.target_dir, PathBuf::from("out"));
    }
}
