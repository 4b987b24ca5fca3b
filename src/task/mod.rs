// src/task/mod.rs

//! Units of supervised work.
//!
//! - [`spec`] is what the UI submits: kind, label, parameters and flags.
//! - [`state`] holds the shared lifecycle state of a running task: the
//!   one-directional state machine, the cancellation flag and the progress
//!   estimate.
//! - [`progress`] is the heuristic progress curve.
//! - [`handle`] is the caller-facing handle returned by `TaskRunner::submit`.

pub mod handle;
pub mod progress;
pub mod spec;
pub mod state;

pub use handle::{TaskControl, TaskHandle};
pub use progress::ProgressCurve;
pub use spec::TaskSpec;
pub use state::TaskShared;
