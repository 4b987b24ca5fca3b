// src/engine/runner.rs

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use crate::config::SupervisorSettings;
use crate::engine::database::ActiveDatabase;
use crate::engine::worker::{Finisher, Worker};
use crate::engine::{TaskEvent, TaskOutcome};
use crate::errors::{Result, SupervisorError};
use crate::exec::{OperationInvoker, OperationRequest};
use crate::task::{TaskHandle, TaskShared, TaskSpec};
use crate::types::TaskState;

/// Accepts tasks and supervises each on its own worker.
///
/// There is no pool: every submitted task gets a dedicated Tokio task, so a
/// slow rasterization never delays an unrelated export. Cloning the runner is
/// cheap; all clones share the id counter and the event channel.
#[derive(Clone)]
pub struct TaskRunner {
    inner: Arc<RunnerInner>,
}

struct RunnerInner {
    invoker: Arc<dyn OperationInvoker>,
    settings: SupervisorSettings,
    database: ActiveDatabase,
    events: mpsc::Sender<TaskEvent>,
    next_id: AtomicU64,
    in_flight: Arc<AtomicUsize>,
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("settings", &self.inner.settings)
            .field("database", &self.inner.database)
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl TaskRunner {
    /// Create a runner and the receiving end of its event channel.
    pub fn new(
        invoker: Arc<dyn OperationInvoker>,
        settings: SupervisorSettings,
        database: ActiveDatabase,
    ) -> (Self, mpsc::Receiver<TaskEvent>) {
        let (events, rx) = mpsc::channel(settings.event_buffer.max(1));
        let runner = Self {
            inner: Arc::new(RunnerInner {
                invoker,
                settings,
                database,
                events,
                next_id: AtomicU64::new(1),
                in_flight: Arc::new(AtomicUsize::new(0)),
            }),
        };
        (runner, rx)
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.inner.settings
    }

    pub fn database(&self) -> &ActiveDatabase {
        &self.inner.database
    }

    /// Number of tasks whose terminal report has not been sent yet.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Start `spec` under supervision and return without waiting for it.
    ///
    /// Must be called from within a Tokio runtime. If the invoker cannot start
    /// the operation, the task goes straight from `Pending` to `Failed`, a
    /// `LaunchFailed` report is delivered on the event channel and the launch
    /// error is returned.
    pub fn submit(&self, spec: TaskSpec) -> Result<TaskHandle> {
        let inner = &self.inner;
        let id = inner.next_id.fetch_add(1, Ordering::SeqCst);
        let shared = Arc::new(TaskShared::new(id, spec.kind));
        let database = inner.database.get();
        let started_at = SystemTime::now();

        let request = OperationRequest {
            task_id: id,
            kind: spec.kind,
            params: spec.params.clone(),
            dry_run: spec.dry_run,
            database: database.clone(),
        };

        // Counted until the terminal report is sent, launch failures included.
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let (report_tx, report_rx) = oneshot::channel();
        let finisher = Finisher {
            shared: Arc::clone(&shared),
            spec: spec.clone(),
            database,
            started_at,
            events: inner.events.clone(),
            report_tx,
            in_flight: Arc::clone(&inner.in_flight),
        };

        let handle = match inner.invoker.start(&request) {
            Ok(handle) => handle,
            Err(err) => {
                let message = format!("{err:#}");
                error!(task_id = id, kind = %spec.kind, error = %message, "failed to launch operation");
                // Delivered asynchronously; the caller learns of the failure
                // through the returned error right away.
                tokio::spawn(finisher.finish(TaskOutcome::LaunchFailed(message.clone())));
                return Err(SupervisorError::Launch(message));
            }
        };

        if let Err(e) = shared.transition(TaskState::Running) {
            tokio::spawn(finisher.finish(TaskOutcome::Crashed(e.to_string())));
            return Err(e);
        }

        info!(
            task_id = id,
            kind = %spec.kind,
            description = %spec.description,
            pid = handle.pid(),
            "task running"
        );

        let worker = Worker::new(
            Arc::clone(&shared),
            handle,
            inner.settings,
            inner.events.clone(),
        );

        // The worker runs on its own task so that a panic inside it is
        // observed here and still produces a terminal report.
        let join = tokio::spawn(worker.run());
        tokio::spawn(async move {
            let outcome = match join.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => {
                    error!(task_id = id, "task worker panicked");
                    TaskOutcome::Crashed("task worker panicked".to_string())
                }
                Err(e) => TaskOutcome::Crashed(format!("task worker aborted: {e}")),
            };
            finisher.finish(outcome).await;
        });

        Ok(TaskHandle::new(shared, spec, report_rx))
    }
}
