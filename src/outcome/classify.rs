// src/outcome/classify.rs

use tracing::info;

use crate::exec::RawResult;
use crate::outcome::line::{classify_line, LogLine, TRACEBACK_MARKER};
use crate::outcome::{ClassifiedOutcome, CountsByEntity, GenericError, GenericErrorKind, Summary};
use crate::types::TaskKind;

/// Target for toolkit lines forwarded to the operational log.
pub const TOOLKIT_LOG_TARGET: &str = "eclair_tasks::toolkit";

/// Classify the stderr log of a finished operation.
///
/// Precedence, first match wins:
/// 1. a summary line with a counts mapping: validation summary for dry runs,
///    import summary otherwise;
/// 2. the no-database sentinel;
/// 3. a traceback anywhere: the whole text as a fatal trace;
/// 4. accumulated `VALIDATION:`/`ERROR` lines: a summary without counts;
/// 5. other lines only: an unclassified error;
/// 6. no output: an empty summary on exit code 0, an exit status error
///    otherwise.
///
/// Never fails; unexpected text degrades to a generic error or fatal trace.
pub fn classify(raw: &RawResult, dry_run: bool) -> ClassifiedOutcome {
    let lines: Vec<LogLine<'_>> = raw.stderr_text.lines().map(classify_line).collect();
    let messages: Vec<String> = lines
        .iter()
        .filter_map(|l| l.message().map(str::to_string))
        .collect();

    let counts = lines.iter().find_map(|l| match l {
        LogLine::Summary(counts) => Some(counts.clone()),
        _ => None,
    });
    if let Some(counts) = counts {
        return summary(dry_run, Some(counts), messages);
    }

    if lines.iter().any(|l| matches!(l, LogLine::NoDatabase)) {
        return ClassifiedOutcome::GenericError(GenericError::new(
            GenericErrorKind::NoDatabase,
            "No database is configured. Choose an existing database or create a new one.",
        ));
    }

    if raw.stderr_text.contains(TRACEBACK_MARKER) {
        return ClassifiedOutcome::FatalTrace(raw.stderr_text.clone());
    }

    let mut last_other = None;
    for line in lines.iter() {
        if let LogLine::Other(text) = line {
            info!(target: TOOLKIT_LOG_TARGET, "{text}");
            last_other = Some(*text);
        }
    }

    if !messages.is_empty() {
        return summary(dry_run, None, messages);
    }

    if let Some(text) = last_other {
        return ClassifiedOutcome::GenericError(GenericError::new(
            GenericErrorKind::Unclassified,
            format!("The toolkit reported an unexpected condition: {text}"),
        ));
    }

    if raw.success() {
        return summary(dry_run, Some(CountsByEntity::new()), Vec::new());
    }

    let status = raw
        .exit_code
        .map_or_else(|| "a signal".to_string(), |code| format!("status {code}"));
    ClassifiedOutcome::GenericError(GenericError::new(
        GenericErrorKind::ExitStatus,
        format!("The toolkit exited with {status} without reporting an error."),
    ))
}

/// Whether a completed operation counts as successful.
///
/// Import and validation steps succeed only with a clean summary. Other
/// operations log freely to stderr, so for them a zero exit status suffices
/// unless the log carries an explicit failure.
pub fn step_succeeded(kind: TaskKind, exit_ok: bool, outcome: &ClassifiedOutcome) -> bool {
    if kind.reports_summary() {
        outcome.is_success()
    } else {
        exit_ok && !outcome.is_hard_failure()
    }
}

fn summary(dry_run: bool, counts: Option<CountsByEntity>, messages: Vec<String>) -> ClassifiedOutcome {
    let summary = Summary { counts, messages };
    if dry_run {
        ClassifiedOutcome::ValidationSummary(summary)
    } else {
        ClassifiedOutcome::ImportSummary(summary)
    }
}
