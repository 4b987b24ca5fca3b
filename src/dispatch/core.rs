// src/dispatch/core.rs

//! Pure dispatch decisions.
//!
//! Given a terminal [`TaskReport`], decide which notice to show and which
//! follow-up work to trigger. Dispatch depends only on the task kind, its
//! declared flags and its outcome; there is no generic event bus.

use tracing::debug;

use crate::dispatch::{
    DispatchCommand, Notice, NoticeAction, NoticeBody, NoticeLevel, RasterScan,
};
use crate::engine::{TaskOutcome, TaskReport};
use crate::outcome::ClassifiedOutcome;
use crate::task::spec::SOURCETYPE_PARAM;
use crate::task::TaskSpec;
use crate::types::{TaskKind, TaskState};

/// Result of dispatching one report.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Classified logs, for reports of completed operations.
    pub outcome: Option<ClassifiedOutcome>,
    /// Whether this step counts as successful for pipeline purposes.
    pub succeeded: bool,
    pub commands: Vec<DispatchCommand>,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    raster_extension: String,
}

impl Dispatcher {
    pub fn new(raster_extension: impl Into<String>) -> Self {
        Self {
            raster_extension: raster_extension.into(),
        }
    }

    /// Map a terminal report to commands.
    ///
    /// The first command is always the one notice about the task itself;
    /// follow-up commands come after it and only for successful steps.
    pub fn dispatch(&self, report: &TaskReport) -> Dispatch {
        let succeeded = report.state == TaskState::Succeeded;
        let notice = match (&report.outcome, &report.classified) {
            (TaskOutcome::Completed(_), Some(outcome)) => {
                completed_notice(report, outcome, succeeded)
            }
            (other, _) => unfinished_notice(report, other),
        };

        let mut commands = vec![DispatchCommand::ShowNotice(notice)];
        if succeeded {
            commands.extend(self.follow_ups(report));
        }

        debug!(
            task_id = report.id,
            kind = %report.kind(),
            succeeded,
            commands = commands.len(),
            "report dispatched"
        );

        Dispatch {
            outcome: report.classified.clone(),
            succeeded,
            commands,
        }
    }

    fn follow_ups(&self, report: &TaskReport) -> Vec<DispatchCommand> {
        match report.kind() {
            TaskKind::RebuildEmissionTable => {
                let mut spec = TaskSpec::new(TaskKind::LoadStaticLayer);
                if let Some(sourcetype) = report.spec.sourcetype() {
                    spec = spec
                        .with_param(SOURCETYPE_PARAM, sourcetype)
                        .with_description(format!("Load static layer ({sourcetype})"));
                }
                vec![DispatchCommand::SubmitFollowUp {
                    after: report.id,
                    spec,
                }]
            }
            TaskKind::RasterizeEmissions => {
                let mut commands = vec![DispatchCommand::RefreshCanvas];
                if report.spec.load_after_creation {
                    if let Some(dir) = &report.spec.output_dir {
                        commands.push(DispatchCommand::LoadRasters {
                            task_id: report.id,
                            scan: RasterScan {
                                dir: dir.clone(),
                                since: report.started_at,
                                extension: self.raster_extension.clone(),
                            },
                        });
                    } else {
                        commands.push(DispatchCommand::ShowNotice(step_notice(
                            report,
                            "load rasters",
                            NoticeLevel::Warning,
                            "Rasters not loaded",
                            "No output directory was given, so there is nothing to load.",
                        )));
                    }
                }
                commands
            }
            _ => Vec::new(),
        }
    }
}

fn step_name(report: &TaskReport) -> String {
    report.kind().to_string()
}

fn completed_notice(report: &TaskReport, outcome: &ClassifiedOutcome, succeeded: bool) -> Notice {
    let action = outcome
        .is_no_database()
        .then_some(NoticeAction::ChooseDatabase);
    let level = if succeeded {
        NoticeLevel::Info
    } else if outcome.is_no_database() {
        NoticeLevel::Warning
    } else {
        NoticeLevel::Error
    };

    let (title, body) = if report.kind().reports_summary() {
        summary_text(outcome)
    } else {
        operation_text(report, outcome, succeeded)
    };

    Notice {
        task_id: report.id,
        kind: report.kind(),
        step: step_name(report),
        level,
        title,
        body,
        action,
    }
}

/// Import and validation notices are worded after their summary.
fn summary_text(outcome: &ClassifiedOutcome) -> (String, NoticeBody) {
    let body = match outcome.summary() {
        Some(summary) => match &summary.counts {
            Some(counts) if !counts.is_empty() => NoticeBody::Table {
                counts: counts.clone(),
                messages: summary.messages.clone(),
            },
            _ => NoticeBody::Text(outcome.body()),
        },
        None => NoticeBody::Text(outcome.body()),
    };
    (outcome.title().to_string(), body)
}

/// Other operations are named after the task; their logs only explain
/// failures.
fn operation_text(
    report: &TaskReport,
    outcome: &ClassifiedOutcome,
    succeeded: bool,
) -> (String, NoticeBody) {
    let description = &report.spec.description;
    if succeeded {
        return (
            format!("{description} finished"),
            NoticeBody::Text("The operation completed successfully.".to_string()),
        );
    }
    if outcome.is_no_database() {
        return (outcome.title().to_string(), NoticeBody::Text(outcome.body()));
    }
    (
        format!("{description} failed"),
        NoticeBody::Text(outcome.body()),
    )
}

fn unfinished_notice(report: &TaskReport, outcome: &TaskOutcome) -> Notice {
    let description = &report.spec.description;
    let (level, title, body) = match outcome {
        TaskOutcome::Cancelled => (
            NoticeLevel::Info,
            format!("{description} cancelled"),
            "The operation was cancelled; partial results may have been discarded.".to_string(),
        ),
        TaskOutcome::TimedOut { budget } => (
            NoticeLevel::Error,
            format!("{description} timed out"),
            format!("The operation exceeded its time budget of {budget:?} and was stopped."),
        ),
        TaskOutcome::LaunchFailed(message) => (
            NoticeLevel::Error,
            format!("{description} could not be started"),
            message.clone(),
        ),
        TaskOutcome::Crashed(message) => (
            NoticeLevel::Error,
            format!("{description} failed"),
            format!("Supervising the operation failed: {message}"),
        ),
        TaskOutcome::Completed(_) => (
            NoticeLevel::Info,
            format!("{description} finished"),
            String::new(),
        ),
    };
    Notice {
        task_id: report.id,
        kind: report.kind(),
        step: step_name(report),
        level,
        title,
        body: NoticeBody::Text(body),
        action: None,
    }
}

/// Notice about a follow-up step of `report` rather than the task itself.
pub(crate) fn step_notice(
    report: &TaskReport,
    step: &str,
    level: NoticeLevel,
    title: &str,
    body: &str,
) -> Notice {
    Notice {
        task_id: report.id,
        kind: report.kind(),
        step: step.to_string(),
        level,
        title: title.to_string(),
        body: NoticeBody::Text(body.to_string()),
        action: None,
    }
}
