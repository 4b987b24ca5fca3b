// src/task/state.rs

//! Shared lifecycle state of a single task.
//!
//! One `TaskShared` is shared between the worker that supervises the process
//! and every `TaskControl` handed out to the UI. The worker is the only writer
//! of terminal states and progress; controls may only request cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::errors::{Result, SupervisorError};
use crate::types::{TaskId, TaskKind, TaskState};

#[derive(Debug)]
pub struct TaskShared {
    id: TaskId,
    kind: TaskKind,
    state: Mutex<TaskState>,
    progress: Mutex<f32>,
    cancel: AtomicBool,
}

impl TaskShared {
    pub fn new(id: TaskId, kind: TaskKind) -> Self {
        Self {
            id,
            kind,
            state: Mutex::new(TaskState::Pending),
            progress: Mutex::new(0.0),
            cancel: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    fn lock_state(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> TaskState {
        *self.lock_state()
    }

    /// Move to `next`, rejecting anything but a forward transition.
    ///
    /// Returns the previous state.
    pub fn transition(&self, next: TaskState) -> Result<TaskState> {
        let mut state = self.lock_state();
        let prev = *state;
        if !prev.can_transition_to(next) {
            return Err(SupervisorError::InvalidTransition {
                task: self.id,
                from: prev,
                to: next,
            });
        }
        *state = next;
        debug!(task_id = self.id, kind = %self.kind, from = %prev, to = %next, "task state changed");
        Ok(prev)
    }

    /// Ask the worker to stop the task at its next poll.
    ///
    /// Only a running task can be cancelled; returns `false` otherwise
    /// (including when cancellation was already requested).
    pub fn request_cancel(&self) -> bool {
        let mut state = self.lock_state();
        if *state != TaskState::Running {
            return false;
        }
        *state = TaskState::CancelRequested;
        self.cancel.store(true, Ordering::SeqCst);
        debug!(task_id = self.id, kind = %self.kind, "cancellation requested");
        true
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn progress(&self) -> f32 {
        *self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raise the progress estimate to `percent` (clamped to 0..=100).
    ///
    /// Progress never goes down; returns the new value only if it increased.
    pub fn advance_progress(&self, percent: f32) -> Option<f32> {
        let percent = percent.clamp(0.0, 100.0);
        let mut progress = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
        if percent > *progress {
            *progress = percent;
            Some(percent)
        } else {
            None
        }
    }
}
