// src/outcome/mod.rs

//! Result Classifier.
//!
//! Turns the raw log streams of a finished operation into a typed
//! [`ClassifiedOutcome`] and renders it for the user.
//!
//! - [`line`] tags each stderr line with what it means.
//! - [`summary`] parses the mapping literal on summary lines.
//! - [`classify`] applies the ordered precedence rules.
//! - [`render`] produces titles, text and count tables.

use std::collections::BTreeMap;

use crate::types::EntityCounts;

pub mod classify;
pub mod line;
pub mod render;
pub mod summary;

pub use classify::{classify, step_succeeded};
pub use line::{classify_line, LogLine};
pub use render::render_counts_table;
pub use summary::parse_mapping_literal;

/// Counts per entity kind, e.g. `pointsource -> {created: 3, updated: 0}`.
pub type CountsByEntity = BTreeMap<String, EntityCounts>;

/// Structured summary of an import or validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Parsed counts; `None` when the toolkit reported no summary, i.e. the
    /// run failed and only `messages` explain why.
    pub counts: Option<CountsByEntity>,
    /// `VALIDATION:` and `ERROR` lines, in order of appearance.
    pub messages: Vec<String>,
}

impl Summary {
    pub fn is_success(&self) -> bool {
        self.counts.is_some() && self.messages.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericErrorKind {
    /// The toolkit was run without a configured database.
    NoDatabase,
    /// Output matched none of the known line kinds.
    Unclassified,
    /// No output at all, but a failing exit status.
    ExitStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericError {
    pub kind: GenericErrorKind,
    pub message: String,
}

impl GenericError {
    pub fn new(kind: GenericErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Typed result derived from an operation's log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedOutcome {
    /// Dry run summary.
    ValidationSummary(Summary),
    /// Real run summary.
    ImportSummary(Summary),
    GenericError(GenericError),
    /// Unhandled internal error in the toolkit; the full stderr text.
    FatalTrace(String),
}

impl ClassifiedOutcome {
    pub fn summary(&self) -> Option<&Summary> {
        match self {
            ClassifiedOutcome::ValidationSummary(s) | ClassifiedOutcome::ImportSummary(s) => {
                Some(s)
            }
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.summary().is_some_and(Summary::is_success)
    }

    /// Whether the outcome carries an explicit failure signal, as opposed to
    /// merely unrecognised output.
    pub fn is_hard_failure(&self) -> bool {
        match self {
            ClassifiedOutcome::ValidationSummary(s) | ClassifiedOutcome::ImportSummary(s) => {
                !s.is_success()
            }
            ClassifiedOutcome::GenericError(e) => e.kind != GenericErrorKind::Unclassified,
            ClassifiedOutcome::FatalTrace(_) => true,
        }
    }

    pub fn is_no_database(&self) -> bool {
        matches!(
            self,
            ClassifiedOutcome::GenericError(GenericError {
                kind: GenericErrorKind::NoDatabase,
                ..
            })
        )
    }
}
