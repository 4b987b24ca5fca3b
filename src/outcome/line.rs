// src/outcome/line.rs

//! Per-line tagging of the toolkit's stderr log.
//!
//! Matching is case-sensitive and anchored at the start of the line (after
//! leading whitespace), except for the sentinel and the traceback marker,
//! which may appear anywhere in a line.

use crate::outcome::summary::{parse_mapping_literal, trailing_mapping};
use crate::outcome::CountsByEntity;

pub const SUCCESS_MARKER: &str = "successfully";
pub const SUMMARY_PREFIXES: [&str; 2] = ["imported", "validated"];
pub const VALIDATION_PREFIX: &str = "VALIDATION:";
pub const ERROR_PREFIX: &str = "ERROR";
pub const TRACEBACK_MARKER: &str = "Traceback";
pub const NO_DATABASE_SENTINEL: &str = "Database unspecified does not exist";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine<'a> {
    Blank,
    /// A summary line with its parsed counts.
    Summary(CountsByEntity),
    Validation(&'a str),
    Error(&'a str),
    Traceback,
    /// The toolkit was run without a database.
    NoDatabase,
    /// Anything else: informational output or an unrecognised condition.
    Other(&'a str),
}

impl LogLine<'_> {
    /// Message shown to the user for validation/error lines.
    pub fn message(&self) -> Option<&str> {
        match self {
            LogLine::Validation(m) | LogLine::Error(m) => Some(m),
            _ => None,
        }
    }
}

pub fn classify_line(raw: &str) -> LogLine<'_> {
    let line = raw.trim();
    if line.is_empty() {
        return LogLine::Blank;
    }
    if line.contains(NO_DATABASE_SENTINEL) {
        return LogLine::NoDatabase;
    }
    if let Some(counts) = summary_counts(line) {
        return LogLine::Summary(counts);
    }
    if line.starts_with(VALIDATION_PREFIX) {
        return LogLine::Validation(line);
    }
    if line.starts_with(ERROR_PREFIX) {
        return LogLine::Error(line);
    }
    if line.contains(TRACEBACK_MARKER) {
        return LogLine::Traceback;
    }
    LogLine::Other(line)
}

fn summary_counts(line: &str) -> Option<CountsByEntity> {
    let recognised = line.contains(SUCCESS_MARKER)
        || SUMMARY_PREFIXES.iter().any(|p| line.starts_with(p));
    if !recognised {
        return None;
    }
    parse_mapping_literal(trailing_mapping(line)?)
}
