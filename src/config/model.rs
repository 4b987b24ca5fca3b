// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::task::ProgressCurve;
use crate::types::TaskKind;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [supervisor]
/// poll_interval = "1s"
/// time_budget = "1h"
/// ramp_polls = 51
///
/// [toolkit]
/// program = "etk"
/// database_env = "ETK_DATABASE_PATH"
/// log_dir = ".eclair/logs"
///
/// [operation.rasterize_emissions]
/// subcommand = "rasterize"
/// args = ["--format", "netcdf"]
///
/// [raster]
/// extension = "nc"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub supervisor: SupervisorSection,

    #[serde(default)]
    pub toolkit: ToolkitSection,

    /// Per-operation overrides from `[operation.<kind>]`.
    ///
    /// Keys are task kind names (e.g. `"import"`, `"rasterize_emissions"`).
    #[serde(default)]
    pub operation: BTreeMap<String, OperationConfig>,

    #[serde(default)]
    pub raster: RasterSection,
}

/// `[supervisor]` section: polling cadence and the progress heuristic.
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorSection {
    /// Interval between liveness checks, e.g. `"1s"`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Hard ceiling for a single operation, e.g. `"1h"`.
    #[serde(default = "default_time_budget")]
    pub time_budget: String,

    /// Number of polls over which progress ramps linearly to 50%.
    #[serde(default = "default_ramp_polls")]
    pub ramp_polls: u64,

    /// Capacity of the task event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_poll_interval() -> String {
    "1s".to_string()
}

fn default_time_budget() -> String {
    "1h".to_string()
}

fn default_ramp_polls() -> u64 {
    51
}

fn default_event_buffer() -> usize {
    64
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            time_budget: default_time_budget(),
            ramp_polls: default_ramp_polls(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// `[toolkit]` section: how the external toolkit is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolkitSection {
    /// Toolkit executable (looked up on `PATH` when not absolute).
    #[serde(default = "default_program")]
    pub program: String,

    /// Environment variable holding the active database path.
    #[serde(default = "default_database_env")]
    pub database_env: String,

    /// Directory receiving one stdout and one stderr log per invocation.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_program() -> String {
    "etk".to_string()
}

fn default_database_env() -> String {
    "ETK_DATABASE_PATH".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".eclair/logs")
}

impl Default for ToolkitSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            database_env: default_database_env(),
            log_dir: default_log_dir(),
        }
    }
}

/// `[operation.<kind>]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OperationConfig {
    /// Toolkit subcommand; falls back to [`TaskKind::default_subcommand`].
    #[serde(default)]
    pub subcommand: Option<String>,

    /// Extra arguments placed after the subcommand.
    #[serde(default)]
    pub args: Vec<String>,
}

/// `[raster]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RasterSection {
    /// File extension of rasters written by `rasterize_emissions`.
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    "nc".to_string()
}

impl Default for RasterSection {
    fn default() -> Self {
        Self {
            extension: default_extension(),
        }
    }
}

/// Validated supervisor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    pub poll_interval: Duration,
    pub time_budget: Duration,
    pub ramp_polls: u64,
    pub event_buffer: usize,
}

impl SupervisorSettings {
    /// Number of polls that fit into the time budget (at least one).
    pub fn max_polls(&self) -> u64 {
        let interval = self.poll_interval.as_nanos().max(1);
        let polls = self.time_budget.as_nanos() / interval;
        u64::try_from(polls).unwrap_or(u64::MAX).max(1)
    }

    pub fn progress_curve(&self) -> ProgressCurve {
        ProgressCurve::new(self.ramp_polls, self.max_polls())
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            time_budget: Duration::from_secs(60 * 60),
            ramp_polls: default_ramp_polls(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Validated configuration used by the rest of the crate.
///
/// Construct it with `ConfigFile::try_from(raw)`, which runs validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub supervisor: SupervisorSettings,
    pub toolkit: ToolkitSection,
    pub operations: BTreeMap<TaskKind, OperationConfig>,
    pub raster: RasterSection,
}

impl ConfigFile {
    /// Toolkit subcommand and extra args for one operation kind.
    pub fn operation(&self, kind: TaskKind) -> (String, Vec<String>) {
        match self.operations.get(&kind) {
            Some(op) => (
                op.subcommand
                    .clone()
                    .unwrap_or_else(|| kind.default_subcommand().to_string()),
                op.args.clone(),
            ),
            None => (kind.default_subcommand().to_string(), Vec::new()),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            supervisor: SupervisorSettings::default(),
            toolkit: ToolkitSection::default(),
            operations: BTreeMap::new(),
            raster: RasterSection::default(),
        }
    }
}
