// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`invoker`] defines the Operation Invoker contract the runner talks to:
//!   `OperationInvoker` starts an operation, `OperationHandle` polls,
//!   terminates and collects its logs.
//! - [`toolkit`] is the production invoker, running the toolkit through
//!   `tokio::process::Command`.
//! - [`logs`] names log files and finds the latest one per operation kind.

pub mod invoker;
pub mod logs;
pub mod toolkit;

pub use invoker::{
    LogPaths, OperationHandle, OperationInvoker, OperationRequest, ProcessExit, RawResult,
};
pub use logs::{latest_log, latest_log_index, next_log_paths};
pub use toolkit::{ToolkitInvoker, ToolkitProcess};
