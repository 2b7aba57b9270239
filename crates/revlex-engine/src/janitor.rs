//! Background janitor.
//!
//! A dedicated thread calls [`VersionController::run_janitor`] every
//! `interval` until its handle is stopped. Stopping wakes the thread
//! immediately instead of waiting out the interval.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use revlex_core::errors::{ExError, ExErrorKind};
use revlex_core::ledger::LedgerStore;

use crate::controller::VersionController;
use crate::Result;

pub struct Janitor;

/// Owns the janitor thread. Dropping the handle closes the stop channel and
/// the thread exits promptly, unjoined; `stop` also waits for it to finish.
#[derive(Debug)]
pub struct JanitorHandle {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

impl Janitor {
    pub fn spawn<S: LedgerStore + 'static>(
        controller: Arc<VersionController<S>>,
        interval: Duration,
    ) -> JanitorHandle {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = thread::spawn(move || {
            tracing::debug!(
                component = "janitor",
                interval_ms = interval.as_millis() as u64,
                "janitor started"
            );
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(err) = controller.run_janitor(Utc::now()) {
                            tracing::warn!(component = "janitor", error = %err, "janitor pass failed");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::debug!(component = "janitor", "janitor stopped");
        });
        JanitorHandle { stop_tx, thread }
    }
}

impl JanitorHandle {
    /// Signal the thread and wait for it to exit
    ///
    /// # Errors
    ///
    /// `Internal` if the janitor thread panicked.
    pub fn stop(self) -> Result<()> {
        // The thread may already be gone; the join below still reports a panic.
        let _ = self.stop_tx.send(());
        self.thread.join().map_err(|_| {
            ExError::new(ExErrorKind::Internal)
                .with_op("janitor")
                .with_message("janitor thread panicked")
        })
    }
}
