#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use eclair_tasks::config::{ConfigFile, OperationConfig, RawConfigFile, SupervisorSettings};
use eclair_tasks::engine::{TaskOutcome, TaskReport};
use eclair_tasks::exec::RawResult;
use eclair_tasks::task::TaskSpec;
use eclair_tasks::types::{TaskId, TaskKind};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn program(mut self, program: &str) -> Self {
        self.config.toolkit.program = program.to_string();
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.toolkit.log_dir = dir.into();
        self
    }

    pub fn database_env(mut self, var: &str) -> Self {
        self.config.toolkit.database_env = var.to_string();
        self
    }

    pub fn poll_interval(mut self, interval: &str) -> Self {
        self.config.supervisor.poll_interval = interval.to_string();
        self
    }

    pub fn time_budget(mut self, budget: &str) -> Self {
        self.config.supervisor.time_budget = budget.to_string();
        self
    }

    pub fn ramp_polls(mut self, polls: u64) -> Self {
        self.config.supervisor.ramp_polls = polls;
        self
    }

    pub fn operation(mut self, kind: TaskKind, subcommand: &str, args: &[&str]) -> Self {
        self.config.operation.insert(
            kind.as_str().to_string(),
            OperationConfig {
                subcommand: Some(subcommand.to_string()),
                args: args.iter().map(|a| a.to_string()).collect(),
            },
        );
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Supervisor settings scaled down for tests: 1s polls, 60s budget, ramp
/// over 11 polls.
pub fn quick_settings() -> SupervisorSettings {
    SupervisorSettings {
        poll_interval: Duration::from_secs(1),
        time_budget: Duration::from_secs(60),
        ramp_polls: 11,
        event_buffer: 256,
    }
}

/// Raw output with the given stderr and exit code, empty stdout.
pub fn stderr_result(stderr: &str, exit_code: i32) -> RawResult {
    RawResult {
        stdout_text: String::new(),
        stderr_text: stderr.to_string(),
        exit_code: Some(exit_code),
    }
}

/// Raw output of a clean run without any output.
pub fn clean_exit() -> RawResult {
    stderr_result("", 0)
}

/// Builder for terminal reports, for dispatcher tests.
pub struct ReportBuilder {
    report: TaskReport,
}

impl ReportBuilder {
    pub fn new(spec: TaskSpec) -> Self {
        let now = SystemTime::now();
        let outcome = TaskOutcome::Completed(clean_exit());
        let (state, classified) = outcome.assess(&spec);
        Self {
            report: TaskReport {
                id: 1,
                state,
                spec,
                database: Some(PathBuf::from("/data/eclair.sqlite")),
                started_at: now,
                finished_at: now,
                outcome,
                classified,
            },
        }
    }

    pub fn id(mut self, id: TaskId) -> Self {
        self.report.id = id;
        self
    }

    pub fn started_at(mut self, at: SystemTime) -> Self {
        self.report.started_at = at;
        self
    }

    /// Set the outcome; state and classification follow as the runner
    /// would derive them.
    pub fn outcome(mut self, outcome: TaskOutcome) -> Self {
        let (state, classified) = outcome.assess(&self.report.spec);
        self.report.state = state;
        self.report.classified = classified;
        self.report.outcome = outcome;
        self
    }

    /// Shorthand for a completed outcome with the given stderr and exit code.
    pub fn completed(self, stderr: &str, exit_code: i32) -> Self {
        self.outcome(TaskOutcome::Completed(stderr_result(stderr, exit_code)))
    }

    pub fn build(self) -> TaskReport {
        self.report
    }
}
