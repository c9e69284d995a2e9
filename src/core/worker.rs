//! Background transfer worker
//!
//! Runs one transfer at a time on a spawned thread and forwards its progress
//! snapshots over a channel, so a front end can poll them from its own loop.
//! While a transfer is scanning or copying, further start requests are
//! refused with [`TransferError::Busy`].

use crate::core::copier::CopyReport;
use crate::core::error::{Result, TransferError};
use crate::core::naming::NamingMode;
use crate::core::progress::{ProgressSink, TransferPhase, TransferProgress};
use crate::core::transfer::{PhotoTransfer, TransferRequest, TransferSummary};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// What a finished worker produced
#[derive(Debug, Clone)]
pub enum WorkerOutcome {
    /// Result of a find-and-copy run
    Transfer(TransferSummary),
    /// Result of an ad-hoc copy
    AdHoc(CopyReport),
}

impl WorkerOutcome {
    pub fn copy_report(&self) -> &CopyReport {
        match self {
            WorkerOutcome::Transfer(summary) => &summary.copy,
            WorkerOutcome::AdHoc(report) => report,
        }
    }

    pub fn message(&self) -> String {
        match self {
            WorkerOutcome::Transfer(summary) => summary.message(),
            WorkerOutcome::AdHoc(report) => report.summary(),
        }
    }
}

/// Forwards snapshots to the channel and mirrors their phase into the state
struct WorkerSink {
    state: Arc<AtomicU8>,
    tx: Sender<TransferProgress>,
}

impl ProgressSink for WorkerSink {
    fn report(&self, progress: TransferProgress) {
        self.state.store(progress.phase as u8, Ordering::SeqCst);
        let _ = self.tx.send(progress);
    }
}

/// Runs transfers on a background thread
pub struct TransferWorker {
    transfer: Arc<PhotoTransfer>,
    state: Arc<AtomicU8>,
    event_tx: Sender<TransferProgress>,
    event_rx: Receiver<TransferProgress>,
    handle: Mutex<Option<JoinHandle<Result<WorkerOutcome>>>>,
    last_error: Arc<RwLock<Option<String>>>,
}

impl TransferWorker {
    pub fn new(transfer: PhotoTransfer) -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            transfer: Arc::new(transfer),
            state: Arc::new(AtomicU8::new(TransferPhase::Idle as u8)),
            event_tx,
            event_rx,
            handle: Mutex::new(None),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Phase of the current (or last) operation
    pub fn state(&self) -> TransferPhase {
        TransferPhase::from(self.state.load(Ordering::SeqCst))
    }

    /// Scanning or copying
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Whether a started operation has ended and can be collected with [`wait`](Self::wait)
    pub fn is_finished(&self) -> bool {
        self.lock_handle()
            .as_ref()
            .map_or(false, |handle| handle.is_finished())
    }

    /// Error message of the last failed operation
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .read()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Start a find-and-copy run
    pub fn start(&self, request: TransferRequest) -> Result<()> {
        self.claim(TransferPhase::Scanning)?;
        let transfer = Arc::clone(&self.transfer);
        self.spawn(move |sink| {
            transfer
                .find_and_copy(&request, sink)
                .map(WorkerOutcome::Transfer)
        })
    }

    /// Start an ad-hoc copy of files and directories
    pub fn start_ad_hoc(
        &self,
        paths: Vec<PathBuf>,
        target_dir: PathBuf,
        naming: NamingMode,
    ) -> Result<()> {
        self.claim(TransferPhase::Copying)?;
        let transfer = Arc::clone(&self.transfer);
        self.spawn(move |sink| {
            transfer
                .copy_ad_hoc(&paths, &target_dir, naming, sink)
                .map(WorkerOutcome::AdHoc)
        })
    }

    /// Next snapshot, if one is waiting
    pub fn try_recv_event(&self) -> Option<TransferProgress> {
        self.event_rx.try_recv().ok()
    }

    /// Next snapshot, waiting at most `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<TransferProgress> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// All snapshots currently waiting
    pub fn drain_events(&self) -> Vec<TransferProgress> {
        self.event_rx.try_iter().collect()
    }

    /// Block until the running operation ends and return its outcome
    pub fn wait(&self) -> Result<WorkerOutcome> {
        let handle = self
            .lock_handle()
            .take()
            .ok_or_else(|| TransferError::WorkerFailed("no transfer was started".to_string()))?;

        handle
            .join()
            .map_err(|_| TransferError::WorkerFailed("worker thread panicked".to_string()))?
    }

    /// Move from an idle or finished state into `phase`, atomically
    fn claim(&self, phase: TransferPhase) -> Result<()> {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                if TransferPhase::from(current).is_active() {
                    None
                } else {
                    Some(phase as u8)
                }
            })
            .map_err(|_| TransferError::Busy)?;

        // Collect the previous run, if nobody waited for it.
        if let Some(previous) = self.lock_handle().take() {
            let _ = previous.join();
        }
        if let Ok(mut last_error) = self.last_error.write() {
            *last_error = None;
        }
        Ok(())
    }

    fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce(&dyn ProgressSink) -> Result<WorkerOutcome> + Send + 'static,
    {
        let sink = WorkerSink {
            state: Arc::clone(&self.state),
            tx: self.event_tx.clone(),
        };
        let state = Arc::clone(&self.state);
        let last_error = Arc::clone(&self.last_error);

        let spawned = thread::Builder::new()
            .name("photo-transfer".to_string())
            .spawn(move || {
                let result = job(&sink);
                if let Err(e) = &result {
                    error!("Transfer failed: {}", e);
                    if let Ok(mut slot) = last_error.write() {
                        *slot = Some(e.to_string());
                    }
                }
                state.store(TransferPhase::Done as u8, Ordering::SeqCst);
                debug!("Transfer worker finished");
                result
            });

        match spawned {
            Ok(handle) => {
                *self.lock_handle() = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.state
                    .store(TransferPhase::Idle as u8, Ordering::SeqCst);
                Err(TransferError::WorkerFailed(e.to_string()))
            }
        }
    }

    fn lock_handle(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<Result<WorkerOutcome>>>> {
        self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for TransferWorker {
    fn drop(&mut self) {
        // There is no cancellation; let a running transfer finish.
        if let Some(handle) = self.lock_handle().take() {
            let _ = handle.join();
        }
    }
}
