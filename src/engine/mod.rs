// src/engine/mod.rs

//! Task runner (scheduler) and its notifications.
//!
//! - [`runner`] accepts tasks and starts one worker per task.
//! - [`worker`] owns the poll loop of a single task.
//! - [`database`] holds the active database path tasks snapshot at
//!   submission.
//!
//! Every submitted task yields exactly one [`TaskEvent::Finished`] carrying
//! its [`TaskReport`]; [`TaskEvent::Progress`] updates may precede it.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::exec::RawResult;
use crate::outcome::{classify, step_succeeded, ClassifiedOutcome};
use crate::task::TaskSpec;
use crate::types::{TaskId, TaskKind, TaskState};

/// How the supervised operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The process exited on its own; its logs are attached.
    Completed(RawResult),
    /// The user cancelled and the process was stopped.
    Cancelled,
    /// The process was still running when the time budget ran out.
    TimedOut { budget: Duration },
    /// The invoker could not start the operation.
    LaunchFailed(String),
    /// The worker itself failed while supervising.
    Crashed(String),
}

impl TaskOutcome {
    /// Terminal task state of `spec` ending with this outcome, plus the
    /// classified logs when the operation completed.
    ///
    /// A completed operation succeeds only if its logs say so, not merely on
    /// a zero exit status.
    pub fn assess(&self, spec: &TaskSpec) -> (TaskState, Option<ClassifiedOutcome>) {
        match self {
            TaskOutcome::Completed(raw) => {
                let classified = classify(raw, spec.dry_run);
                let state = if step_succeeded(spec.kind, raw.success(), &classified) {
                    TaskState::Succeeded
                } else {
                    TaskState::Failed
                };
                (state, Some(classified))
            }
            TaskOutcome::Cancelled => (TaskState::Cancelled, None),
            _ => (TaskState::Failed, None),
        }
    }
}

/// Terminal notification for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub id: TaskId,
    pub spec: TaskSpec,
    pub state: TaskState,
    /// Active database at submission time.
    pub database: Option<PathBuf>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
    pub outcome: TaskOutcome,
    /// Classified logs of a completed operation; `state` follows from them.
    pub classified: Option<ClassifiedOutcome>,
}

impl TaskReport {
    pub fn kind(&self) -> TaskKind {
        self.spec.kind
    }
}

/// Events delivered on the runner's channel.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Progress {
        id: TaskId,
        kind: TaskKind,
        percent: f32,
    },
    Finished(TaskReport),
}

pub mod database;
pub mod runner;
pub mod worker;

pub use database::ActiveDatabase;
pub use runner::TaskRunner;
