//! Progress snapshots and sinks
//!
//! Every operation reports a sequence of [`TransferProgress`] snapshots to a
//! [`ProgressSink`]. Each snapshot is complete on its own: phase, status text
//! and percentage. Sinks receive snapshots in the order they are produced and
//! decide themselves how (and on which thread) to render them.

use log::warn;
use std::fmt;
use std::sync::{mpsc, Mutex};

/// Lifecycle phase of one transfer operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum TransferPhase {
    /// Nothing started yet
    #[default]
    Idle = 0,
    /// Looking for photos in the date range
    Scanning = 1,
    /// Copying photos to the target
    Copying = 2,
    /// Operation finished
    Done = 3,
}

impl TransferPhase {
    /// Scanning or copying
    pub fn is_active(self) -> bool {
        matches!(self, TransferPhase::Scanning | TransferPhase::Copying)
    }
}

impl From<u8> for TransferPhase {
    fn from(value: u8) -> Self {
        match value {
            1 => TransferPhase::Scanning,
            2 => TransferPhase::Copying,
            3 => TransferPhase::Done,
            _ => TransferPhase::Idle,
        }
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferPhase::Idle => "idle",
            TransferPhase::Scanning => "scanning",
            TransferPhase::Copying => "copying",
            TransferPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// One progress snapshot
///
/// `percent` only has meaning within its `phase`; it restarts at 0 whenever
/// the phase changes.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    pub phase: TransferPhase,
    pub message: String,
    /// 0.0 - 100.0
    pub percent: f64,
}

impl TransferProgress {
    pub fn new(phase: TransferPhase, message: impl Into<String>, percent: f64) -> Self {
        Self {
            phase,
            message: message.into(),
            percent: percent.clamp(0.0, 100.0),
        }
    }

    pub fn idle() -> Self {
        Self::new(TransferPhase::Idle, "", 0.0)
    }

    pub fn is_done(&self) -> bool {
        self.phase == TransferPhase::Done
    }
}

/// Receiver of progress snapshots
pub trait ProgressSink {
    fn report(&self, progress: TransferProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(TransferProgress),
{
    fn report(&self, progress: TransferProgress) {
        self(progress)
    }
}

impl ProgressSink for mpsc::Sender<TransferProgress> {
    fn report(&self, progress: TransferProgress) {
        // A dropped receiver means nobody is watching any more.
        let _ = self.send(progress);
    }
}

impl ProgressSink for crossbeam_channel::Sender<TransferProgress> {
    fn report(&self, progress: TransferProgress) {
        let _ = self.send(progress);
    }
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _progress: TransferProgress) {}
}

/// Sink that keeps every snapshot, in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    snapshots: Mutex<Vec<TransferProgress>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<TransferProgress> {
        self.snapshots
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Phases in order with consecutive repeats collapsed
    pub fn phases(&self) -> Vec<TransferPhase> {
        let mut phases: Vec<TransferPhase> = Vec::new();
        for snapshot in self.snapshots() {
            if phases.last() != Some(&snapshot.phase) {
                phases.push(snapshot.phase);
            }
        }
        phases
    }

    pub fn last(&self) -> Option<TransferProgress> {
        self.snapshots().last().cloned()
    }
}

impl ProgressSink for RecordingSink {
    fn report(&self, progress: TransferProgress) {
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots.push(progress);
        }
    }
}

/// Emits snapshots for one phase of an operation
///
/// Keeps the percentage of a phase from going backwards and starts every
/// phase at 0 %.
pub struct PhaseReporter<'a> {
    sink: &'a dyn ProgressSink,
    phase: TransferPhase,
    percent: f64,
    message: String,
}

impl<'a> PhaseReporter<'a> {
    /// Enter `phase` and emit its opening snapshot at 0 %
    pub fn begin(sink: &'a dyn ProgressSink, phase: TransferPhase, message: impl Into<String>) -> Self {
        let reporter = Self {
            sink,
            phase,
            percent: 0.0,
            message: message.into(),
        };
        reporter.emit();
        reporter
    }

    /// Emit a snapshot with a new message and percentage
    pub fn update(&mut self, message: impl Into<String>, percent: f64) {
        self.message = message.into();
        self.set_percent(percent);
        self.emit();
    }

    /// Emit a snapshot with the current message and a new percentage
    pub fn advance(&mut self, percent: f64) {
        self.set_percent(percent);
        self.emit();
    }

    /// Emit the terminal `Done` snapshot (percent reset to 0)
    pub fn finish(self, message: impl Into<String>) {
        self.sink
            .report(TransferProgress::new(TransferPhase::Done, message, 0.0));
    }

    fn set_percent(&mut self, percent: f64) {
        let percent = percent.clamp(0.0, 100.0);
        if percent < self.percent {
            warn!(
                "Ignoring backwards progress in {} phase ({:.1}% -> {:.1}%)",
                self.phase, self.percent, percent
            );
            return;
        }
        self.percent = percent;
    }

    fn emit(&self) {
        self.sink.report(TransferProgress::new(
            self.phase,
            self.message.clone(),
            self.percent,
        ));
    }
}

/// Percentage of `done` out of `total`; an empty total counts as complete
pub fn percent_of(done: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        done as f64 * 100.0 / total as f64
    }
}

/// "1 photo" / "3 photos"
pub fn photo_count(count: usize) -> String {
    if count == 1 {
        "1 photo".to_string()
    } else {
        format!("{} photos", count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        assert!(TransferPhase::Idle < TransferPhase::Scanning);
        assert!(TransferPhase::Scanning < TransferPhase::Copying);
        assert!(TransferPhase::Copying < TransferPhase::Done);
        assert!(TransferPhase::Copying.is_active());
        assert!(!TransferPhase::Done.is_active());
    }

    #[test]
    fn test_phase_from_u8_roundtrip() {
        for phase in [
            TransferPhase::Idle,
            TransferPhase::Scanning,
            TransferPhase::Copying,
            TransferPhase::Done,
        ] {
            assert_eq!(TransferPhase::from(phase as u8), phase);
        }
        assert_eq!(TransferPhase::from(200), TransferPhase::Idle);
    }

    #[test]
    fn test_reporter_never_goes_backwards() {
        let sink = RecordingSink::new();
        let mut reporter = PhaseReporter::begin(&sink, TransferPhase::Copying, "start");
        reporter.advance(40.0);
        reporter.advance(20.0);
        reporter.advance(150.0);
        reporter.finish("done");

        let percents: Vec<f64> = sink.snapshots().iter().map(|s| s.percent).collect();
        assert_eq!(percents, vec![0.0, 40.0, 40.0, 100.0, 0.0]);
        assert_eq!(
            sink.phases(),
            vec![TransferPhase::Copying, TransferPhase::Done]
        );
    }

    #[test]
    fn test_closure_and_channel_sinks() {
        let (tx, rx) = mpsc::channel();
        tx.report(TransferProgress::new(TransferPhase::Scanning, "a", 1.0));
        assert_eq!(rx.recv().unwrap().message, "a");

        let (ctx, crx) = crossbeam_channel::unbounded();
        ctx.report(TransferProgress::new(TransferPhase::Copying, "b", 2.0));
        assert_eq!(crx.recv().unwrap().phase, TransferPhase::Copying);

        let seen = Mutex::new(0);
        let closure = |_p: TransferProgress| *seen.lock().unwrap() += 1;
        closure.report(TransferProgress::idle());
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_helpers() {
        assert_eq!(percent_of(1, 4), 25.0);
        assert_eq!(percent_of(0, 0), 100.0);
        assert_eq!(photo_count(1), "1 photo");
        assert_eq!(photo_count(2), "2 photos");
    }
}
