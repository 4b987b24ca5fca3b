// src/exec/invoker.rs

//! The Operation Invoker contract.
//!
//! The supervisor never computes anything itself. It asks an
//! [`OperationInvoker`] to start an operation and gets back an
//! [`OperationHandle`] it can poll, terminate and read logs from. Production
//! code uses [`super::ToolkitInvoker`]; tests plug in a fake.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use anyhow::Result;

use crate::types::{TaskId, TaskKind};

/// Everything an invoker needs to start one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub task_id: TaskId,
    pub kind: TaskKind,
    pub params: BTreeMap<String, String>,
    pub dry_run: bool,
    /// Active database, resolved once at submission.
    pub database: Option<PathBuf>,
}

/// Log files of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

/// How the OS process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, `None` when the process was ended by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Captured output of a finished operation. Produced once, never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResult {
    pub stdout_text: String,
    pub stderr_text: String,
    pub exit_code: Option<i32>,
}

impl RawResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Starts external operations.
pub trait OperationInvoker: Send + Sync {
    /// Start one operation and return immediately.
    ///
    /// Must not wait for the operation to finish.
    fn start(&self, request: &OperationRequest) -> Result<Box<dyn OperationHandle>>;
}

/// A live operation, exclusively owned by the worker supervising it.
pub trait OperationHandle: Send {
    /// OS process id, if there is one.
    fn pid(&self) -> Option<u32>;

    fn log_paths(&self) -> &LogPaths;

    /// Non-blocking liveness check; `Some` once the process has exited.
    fn try_wait(&mut self) -> Result<Option<ProcessExit>>;

    /// Ask the process to stop and wait until it has actually exited.
    ///
    /// Calling this on an already exited process returns its exit status.
    fn terminate(&mut self) -> Pin<Box<dyn Future<Output = Result<ProcessExit>> + Send + '_>>;

    /// Read both log streams of the exited process.
    fn collect(&mut self, exit: ProcessExit) -> Result<RawResult>;
}
