// src/outcome/render.rs

//! User-facing text for classified outcomes.

use std::fmt::Write as _;

use crate::outcome::{ClassifiedOutcome, CountsByEntity, GenericErrorKind, Summary};

/// Plain-text table of counts per entity kind.
///
/// ```text
/// entity      | created | updated
/// ------------+---------+--------
/// pointsource |       3 |       0
/// ```
pub fn render_counts_table(counts: &CountsByEntity) -> String {
    const ENTITY: &str = "entity";
    const CREATED: &str = "created";
    const UPDATED: &str = "updated";

    let entity_w = counts
        .keys()
        .map(|k| k.chars().count())
        .chain([ENTITY.len()])
        .max()
        .unwrap_or(ENTITY.len());
    let num_w = counts
        .values()
        .flat_map(|c| [c.created.to_string().len(), c.updated.to_string().len()])
        .chain([CREATED.len()])
        .max()
        .unwrap_or(CREATED.len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<ew$} | {:>nw$} | {:>nw$}",
        ENTITY,
        CREATED,
        UPDATED,
        ew = entity_w,
        nw = num_w
    );
    let _ = writeln!(
        out,
        "{}-+-{}-+-{}",
        "-".repeat(entity_w),
        "-".repeat(num_w),
        "-".repeat(num_w)
    );
    for (entity, c) in counts {
        let _ = writeln!(
            out,
            "{:<ew$} | {:>nw$} | {:>nw$}",
            entity,
            c.created,
            c.updated,
            ew = entity_w,
            nw = num_w
        );
    }
    out
}

fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();
    if let Some(counts) = &summary.counts {
        if counts.is_empty() {
            out.push_str("No entities were created or updated.\n");
        } else {
            out.push_str(&render_counts_table(counts));
        }
    }
    if !summary.messages.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        for message in &summary.messages {
            let _ = writeln!(out, "{message}");
        }
    }
    out
}

impl ClassifiedOutcome {
    /// Dialog title.
    pub fn title(&self) -> &'static str {
        match self {
            ClassifiedOutcome::ValidationSummary(s) if s.is_success() => "Validation succeeded",
            ClassifiedOutcome::ValidationSummary(_) => "Validation found problems",
            ClassifiedOutcome::ImportSummary(s) if s.is_success() => "Import succeeded",
            ClassifiedOutcome::ImportSummary(_) => "Import failed",
            ClassifiedOutcome::GenericError(e) => match e.kind {
                GenericErrorKind::NoDatabase => "No database configured",
                GenericErrorKind::Unclassified | GenericErrorKind::ExitStatus => "Operation failed",
            },
            ClassifiedOutcome::FatalTrace(_) => "Unexpected error",
        }
    }

    /// Dialog body: a counts table, a message list or free text.
    pub fn body(&self) -> String {
        match self {
            ClassifiedOutcome::ValidationSummary(s) | ClassifiedOutcome::ImportSummary(s) => {
                render_summary(s)
            }
            ClassifiedOutcome::GenericError(e) => e.message.clone(),
            ClassifiedOutcome::FatalTrace(trace) => format!(
                "The toolkit stopped with an internal error. Validate the input first and \
                 retry; if the problem persists, report the trace below.\n\n{trace}"
            ),
        }
    }
}
