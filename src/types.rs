// src/types.rs

//! Shared value types used across the supervisor.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Identifier of a submitted task, unique within one `TaskRunner`.
pub type TaskId = u64;

/// Kind of external toolkit operation a task wraps.
///
/// The snake_case name is used in the config file, on the command line and in
/// log file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Import,
    Validate,
    Export,
    RasterizeEmissions,
    AggregateEmissions,
    RebuildEmissionTable,
    /// Loads/joins the static layer after an emission table rebuild.
    LoadStaticLayer,
}

impl TaskKind {
    pub const ALL: [TaskKind; 7] = [
        TaskKind::Import,
        TaskKind::Validate,
        TaskKind::Export,
        TaskKind::RasterizeEmissions,
        TaskKind::AggregateEmissions,
        TaskKind::RebuildEmissionTable,
        TaskKind::LoadStaticLayer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Import => "import",
            TaskKind::Validate => "validate",
            TaskKind::Export => "export",
            TaskKind::RasterizeEmissions => "rasterize_emissions",
            TaskKind::AggregateEmissions => "aggregate_emissions",
            TaskKind::RebuildEmissionTable => "rebuild_emission_table",
            TaskKind::LoadStaticLayer => "load_static_layer",
        }
    }

    /// Default toolkit subcommand when the config does not override it.
    pub fn default_subcommand(&self) -> &'static str {
        match self {
            TaskKind::Import => "import",
            TaskKind::Validate => "import",
            TaskKind::Export => "export",
            TaskKind::RasterizeEmissions => "rasterize",
            TaskKind::AggregateEmissions => "aggregate",
            TaskKind::RebuildEmissionTable => "update_emission_tables",
            TaskKind::LoadStaticLayer => "load_static_layer",
        }
    }

    /// Whether the toolkit ends this operation with an entity counts summary.
    pub fn reports_summary(&self) -> bool {
        matches!(self, TaskKind::Import | TaskKind::Validate)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        TaskKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                let expected: Vec<&str> = TaskKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown task kind: {s} (expected one of {})", expected.join(", "))
            })
    }
}

/// Lifecycle state of a task.
///
/// Transitions only move forward:
///
/// ```text
/// Pending -> Running -> CancelRequested -> {Succeeded, Failed, Cancelled}
///    |          \------------------------> {Succeeded, Failed, Cancelled}
///    \--> Failed (launch failure)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    CancelRequested,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Cancelled
        )
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Failed)
                | (Running, CancelRequested)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Cancelled)
                | (CancelRequested, Succeeded)
                | (CancelRequested, Failed)
                | (CancelRequested, Cancelled)
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::CancelRequested => "cancel requested",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Number of entities of one kind created and updated by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub created: u64,
    pub updated: u64,
}

impl EntityCounts {
    pub fn new(created: u64, updated: u64) -> Self {
        Self { created, updated }
    }
}

/// Which of the two log streams of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl LogStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStream::Stdout => "stdout",
            LogStream::Stderr => "stderr",
        }
    }
}
