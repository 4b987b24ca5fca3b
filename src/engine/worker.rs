// src/engine/worker.rs

//! Per-task supervision loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::SupervisorSettings;
use crate::engine::{TaskEvent, TaskOutcome, TaskReport};
use crate::exec::{OperationHandle, ProcessExit};
use crate::task::{TaskShared, TaskSpec};
use crate::types::TaskState;

/// Owns the process handle of one running task until it exits.
pub(crate) struct Worker {
    shared: Arc<TaskShared>,
    handle: Box<dyn OperationHandle>,
    settings: SupervisorSettings,
    events: mpsc::Sender<TaskEvent>,
}

impl Worker {
    pub(crate) fn new(
        shared: Arc<TaskShared>,
        handle: Box<dyn OperationHandle>,
        settings: SupervisorSettings,
        events: mpsc::Sender<TaskEvent>,
    ) -> Self {
        Self {
            shared,
            handle,
            settings,
            events,
        }
    }

    /// Supervise the process until it completes, is cancelled or times out.
    ///
    /// Errors never escape: they become [`TaskOutcome::Crashed`], after a
    /// last attempt to stop the process so nothing is left running.
    pub(crate) async fn run(mut self) -> TaskOutcome {
        let id = self.shared.id();
        match self.poll_loop().await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(task_id = id, error = %format!("{err:#}"), "task supervision failed");
                if let Err(e) = self.handle.terminate().await {
                    warn!(task_id = id, error = %e, "could not stop process after supervision failure");
                }
                TaskOutcome::Crashed(format!("{err:#}"))
            }
        }
        // `self.handle` is dropped here, releasing the process.
    }

    async fn poll_loop(&mut self) -> Result<TaskOutcome> {
        let id = self.shared.id();
        let curve = self.settings.progress_curve();
        let max_polls = self.settings.max_polls();
        let mut poll: u64 = 0;

        loop {
            sleep(self.settings.poll_interval).await;
            poll += 1;

            if self.shared.cancel_requested() {
                // A result that is already there wins over the cancellation.
                if let Some(exit) = self.handle.try_wait()? {
                    info!(task_id = id, poll, "operation finished before cancellation was observed");
                    return self.completed(exit);
                }
                info!(task_id = id, poll, pid = self.handle.pid(), "cancelling operation");
                let exit = self.handle.terminate().await?;
                debug!(task_id = id, code = ?exit.code, "cancelled process exited");
                return Ok(TaskOutcome::Cancelled);
            }

            if let Some(exit) = self.handle.try_wait()? {
                info!(task_id = id, poll, code = ?exit.code, "operation finished");
                return self.completed(exit);
            }

            if poll >= max_polls {
                warn!(
                    task_id = id,
                    poll,
                    budget = ?self.settings.time_budget,
                    "operation exceeded time budget; terminating"
                );
                self.handle.terminate().await?;
                return Ok(TaskOutcome::TimedOut {
                    budget: self.settings.time_budget,
                });
            }

            self.report_progress(curve.at(poll));
        }
    }

    fn completed(&mut self, exit: ProcessExit) -> Result<TaskOutcome> {
        let raw = self.handle.collect(exit)?;
        Ok(TaskOutcome::Completed(raw))
    }

    fn report_progress(&self, percent: f32) {
        let Some(percent) = self.shared.advance_progress(percent) else {
            return;
        };
        let event = TaskEvent::Progress {
            id: self.shared.id(),
            kind: self.shared.kind(),
            percent,
        };
        // Progress is advisory; a slow consumer only misses intermediate values.
        if let Err(TrySendError::Full(_)) = self.events.try_send(event) {
            debug!(task_id = self.shared.id(), percent, "event buffer full; progress update dropped");
        }
    }
}

/// Delivers the single terminal report of a task.
pub(crate) struct Finisher {
    pub(crate) shared: Arc<TaskShared>,
    pub(crate) spec: TaskSpec,
    pub(crate) database: Option<PathBuf>,
    pub(crate) started_at: SystemTime,
    pub(crate) events: mpsc::Sender<TaskEvent>,
    pub(crate) report_tx: oneshot::Sender<TaskReport>,
    pub(crate) in_flight: Arc<AtomicUsize>,
}

impl Finisher {
    /// Record the terminal state and notify the task handle and the event
    /// channel. Consuming `self` makes a second delivery impossible.
    pub(crate) async fn finish(self, outcome: TaskOutcome) {
        let id = self.shared.id();
        let (state, classified) = outcome.assess(&self.spec);

        if let Err(e) = self.shared.transition(state) {
            error!(task_id = id, error = %e, "terminal transition rejected");
        }
        if state == TaskState::Succeeded {
            self.shared.advance_progress(100.0);
        }

        let report = TaskReport {
            id,
            spec: self.spec,
            state: self.shared.state(),
            database: self.database,
            started_at: self.started_at,
            finished_at: SystemTime::now(),
            outcome,
            classified,
        };

        info!(task_id = id, kind = %report.kind(), state = %report.state, "task finished");

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        // The handle may have been dropped; the event channel still gets it.
        let _ = self.report_tx.send(report.clone());
        if self.events.send(TaskEvent::Finished(report)).await.is_err() {
            warn!(task_id = id, "event channel closed; terminal report not delivered");
        }
    }
}
