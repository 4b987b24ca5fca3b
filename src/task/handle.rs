// src/task/handle.rs

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::engine::TaskReport;
use crate::errors::{Result, SupervisorError};
use crate::task::spec::TaskSpec;
use crate::task::state::TaskShared;
use crate::types::{TaskId, TaskKind, TaskState};

/// Cloneable view of a submitted task: state, progress and cancellation.
#[derive(Debug, Clone)]
pub struct TaskControl {
    shared: Arc<TaskShared>,
}

impl TaskControl {
    pub(crate) fn new(shared: Arc<TaskShared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> TaskId {
        self.shared.id()
    }

    pub fn kind(&self) -> TaskKind {
        self.shared.kind()
    }

    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    /// Current progress estimate, 0 to 100.
    pub fn progress(&self) -> f32 {
        self.shared.progress()
    }

    /// Request cooperative cancellation.
    ///
    /// The task becomes `Cancelled` once its worker observes the request on
    /// the next poll and the process has exited. If the operation finished in
    /// the meantime, its result is reported instead.
    pub fn cancel(&self) -> bool {
        self.shared.request_cancel()
    }
}

/// Handle returned by `TaskRunner::submit`.
#[derive(Debug)]
pub struct TaskHandle {
    control: TaskControl,
    spec: TaskSpec,
    report_rx: oneshot::Receiver<TaskReport>,
}

impl TaskHandle {
    pub(crate) fn new(
        shared: Arc<TaskShared>,
        spec: TaskSpec,
        report_rx: oneshot::Receiver<TaskReport>,
    ) -> Self {
        Self {
            control: TaskControl::new(shared),
            spec,
            report_rx,
        }
    }

    pub fn id(&self) -> TaskId {
        self.control.id()
    }

    pub fn kind(&self) -> TaskKind {
        self.control.kind()
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn state(&self) -> TaskState {
        self.control.state()
    }

    pub fn progress(&self) -> f32 {
        self.control.progress()
    }

    pub fn cancel(&self) -> bool {
        self.control.cancel()
    }

    pub fn control(&self) -> TaskControl {
        self.control.clone()
    }

    /// Wait for the terminal report of this task.
    pub async fn wait(self) -> Result<TaskReport> {
        self.report_rx
            .await
            .map_err(|_| SupervisorError::ChannelClosed)
    }
}
