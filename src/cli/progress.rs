//! Progress bar utilities for CLI output
//!
//! Renders transfer progress snapshots with an indicatif bar and provides the
//! small console helpers shared by all commands.

use crate::core::progress::{ProgressSink, TransferPhase, TransferProgress};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::Mutex;
use std::time::{Duration, Instant};

// ============================================================================
// Styles - Consistent visual appearance
// ============================================================================

/// Bar style while scanning or copying
fn phase_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} {prefix:<9} [{bar:40.cyan/dim}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━╾─")
}

/// Style once the operation is done
fn completed_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  ✓ {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 4);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

// ============================================================================
// Transfer progress bar
// ============================================================================

/// Progress bar driven by [`TransferProgress`] snapshots
///
/// The bar runs from 0 to 100 and restarts whenever the phase changes, which
/// mirrors how the snapshots report percentages.
pub struct TransferProgressBar {
    bar: ProgressBar,
    phase: Mutex<TransferPhase>,
    started: Instant,
}

impl TransferProgressBar {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(phase_bar_style());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            bar,
            phase: Mutex::new(TransferPhase::Idle),
            started: Instant::now(),
        }
    }

    /// Apply one snapshot to the bar
    pub fn render(&self, progress: &TransferProgress) {
        let mut phase = self.phase.lock().unwrap_or_else(|p| p.into_inner());

        if progress.phase == TransferPhase::Done {
            *phase = TransferPhase::Done;
            self.bar.set_style(completed_style());
            self.bar.finish_with_message(format!(
                "{} ({})",
                progress.message,
                format_duration(self.started.elapsed())
            ));
            return;
        }

        if *phase != progress.phase {
            *phase = progress.phase;
            self.bar.set_prefix(label(progress.phase));
            self.bar.set_position(0);
        }
        self.bar.set_position(progress.percent.round() as u64);
        self.bar.set_message(progress.message.clone());
    }

    /// Print a line above the bar without tearing it
    pub fn log(&self, msg: &str) {
        self.bar.suspend(|| println!("  → {}", msg));
    }

    /// Remove the bar if the operation ended without a `Done` snapshot
    pub fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl Default for TransferProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TransferProgressBar {
    fn report(&self, progress: TransferProgress) {
        self.render(&progress);
    }
}

fn label(phase: TransferPhase) -> &'static str {
    match phase {
        TransferPhase::Idle => "Waiting",
        TransferPhase::Scanning => "Scanning",
        TransferPhase::Copying => "Copying",
        TransferPhase::Done => "Done",
    }
}

// ============================================================================
// Utility functions
// ============================================================================

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

// ============================================================================
// Dual writer for file + console logging
// ============================================================================

/// A writer that writes to both stderr and a log file
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}
