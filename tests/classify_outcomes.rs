use eclair_tasks::exec::RawResult;
use eclair_tasks::outcome::{
    classify, classify_line, parse_mapping_literal, render_counts_table, ClassifiedOutcome,
    GenericErrorKind, LogLine,
};
use eclair_tasks::outcome::summary::trailing_mapping;
use eclair_tasks::types::EntityCounts;
use eclair_tasks_test_utils::builders::stderr_result;
use eclair_tasks_test_utils::init_tracing;

const IMPORT_SUMMARY: &str = "imported successfully {'pointsource': {'created': 3, 'updated': 0}, \
                              'areasource': {'created': 1, 'updated': 2}}";

fn summary_of(outcome: &ClassifiedOutcome) -> &eclair_tasks::outcome::Summary {
    outcome.summary().expect("outcome should carry a summary")
}

#[test]
fn import_summary_with_counts() {
    init_tracing();

    let outcome = classify(&stderr_result(IMPORT_SUMMARY, 0), false);

    let ClassifiedOutcome::ImportSummary(summary) = &outcome else {
        panic!("expected import summary, got {outcome:?}");
    };
    let counts = summary.counts.as_ref().expect("counts");
    assert_eq!(counts.len(), 2);
    assert_eq!(counts["pointsource"], EntityCounts::new(3, 0));
    assert_eq!(counts["areasource"], EntityCounts::new(1, 2));
    assert!(summary.messages.is_empty());
    assert!(outcome.is_success());
    assert!(!outcome.is_hard_failure());
}

#[test]
fn dry_run_summary_is_a_validation_summary() {
    let stderr = "validated {'pointsource': {'created': 12, 'updated': 4}}";
    let outcome = classify(&stderr_result(stderr, 0), true);

    assert!(matches!(outcome, ClassifiedOutcome::ValidationSummary(_)));
    assert_eq!(
        summary_of(&outcome).counts.as_ref().map(|c| c["pointsource"]),
        Some(EntityCounts::new(12, 4))
    );
    assert_eq!(outcome.title(), "Validation succeeded");
}

#[test]
fn summary_keeps_validation_messages() {
    let stderr = format!(
        "VALIDATION: row 4: unknown substance 'XYZ'\nprocessing sheet Sources\n{IMPORT_SUMMARY}\n"
    );
    let outcome = classify(&stderr_result(&stderr, 0), false);

    let summary = summary_of(&outcome);
    assert!(summary.counts.is_some());
    assert_eq!(summary.messages, vec!["VALIDATION: row 4: unknown substance 'XYZ'"]);
    assert!(!outcome.is_success(), "messages make the summary a failure");
}

#[test]
fn summary_takes_precedence_over_traceback() {
    let stderr = format!("Traceback (most recent call last):\n  File \"x.py\"\n{IMPORT_SUMMARY}");
    let outcome = classify(&stderr_result(&stderr, 0), false);
    assert!(matches!(outcome, ClassifiedOutcome::ImportSummary(_)));
}

#[test]
fn no_database_sentinel() {
    let stderr = "2024-01-01 etk: Database unspecified does not exist\n";
    let outcome = classify(&stderr_result(stderr, 1), false);

    let ClassifiedOutcome::GenericError(err) = &outcome else {
        panic!("expected generic error, got {outcome:?}");
    };
    assert_eq!(err.kind, GenericErrorKind::NoDatabase);
    assert!(outcome.is_no_database());
    assert!(outcome.is_hard_failure());
}

#[test]
fn sentinel_wins_over_traceback() {
    let stderr = "Traceback (most recent call last):\n\
                  ValueError: Database unspecified does not exist\n";
    let outcome = classify(&stderr_result(stderr, 1), false);
    assert!(outcome.is_no_database());
}

#[test]
fn traceback_yields_full_text() {
    init_tracing();

    let stderr = "ERROR: loading sources\n\
                  Traceback (most recent call last):\n  \
                  File \"/opt/etk/import.py\", line 10, in run\n\
                  KeyError: 'geometry'\n";
    let outcome = classify(&stderr_result(stderr, 1), false);

    assert_eq!(outcome, ClassifiedOutcome::FatalTrace(stderr.to_string()));
    assert!(outcome.body().contains("Validate the input first"));
    assert!(outcome.body().contains("KeyError: 'geometry'"));
}

#[test]
fn error_lines_without_summary_are_failure_summary() {
    let stderr = "reading workbook\nERROR: sheet 'Sources' is missing\n\
                  VALIDATION: column 'x' must be numeric\n";
    let outcome = classify(&stderr_result(stderr, 1), true);

    let ClassifiedOutcome::ValidationSummary(summary) = &outcome else {
        panic!("expected validation summary, got {outcome:?}");
    };
    assert_eq!(summary.counts, None);
    assert_eq!(
        summary.messages,
        vec![
            "ERROR: sheet 'Sources' is missing",
            "VALIDATION: column 'x' must be numeric"
        ]
    );
    assert_eq!(outcome.title(), "Validation found problems");
    assert!(outcome.is_hard_failure());
}

#[test]
fn unrecognised_output_is_unclassified_error() {
    init_tracing();

    let stderr = "starting export\nwrote 3 layers\n";
    let outcome = classify(&stderr_result(stderr, 0), false);

    let ClassifiedOutcome::GenericError(err) = &outcome else {
        panic!("expected generic error, got {outcome:?}");
    };
    assert_eq!(err.kind, GenericErrorKind::Unclassified);
    assert!(err.message.contains("wrote 3 layers"));
    assert!(!outcome.is_hard_failure());
}

#[test]
fn empty_output_with_clean_exit_is_empty_success() {
    let outcome = classify(&stderr_result("", 0), false);

    let summary = summary_of(&outcome);
    assert_eq!(summary.counts.as_ref().map(|c| c.len()), Some(0));
    assert!(outcome.is_success());
    assert!(outcome.body().contains("No entities were created or updated"));
}

#[test]
fn empty_output_with_failing_exit_is_exit_status_error() {
    let outcome = classify(&stderr_result("  \n\n", 3), false);

    let ClassifiedOutcome::GenericError(err) = &outcome else {
        panic!("expected generic error, got {outcome:?}");
    };
    assert_eq!(err.kind, GenericErrorKind::ExitStatus);
    assert!(err.message.contains("status 3"));

    let killed = RawResult {
        exit_code: None,
        ..RawResult::default()
    };
    let ClassifiedOutcome::GenericError(err) = classify(&killed, false) else {
        panic!("expected generic error");
    };
    assert!(err.message.contains("a signal"));
}

#[test]
fn stdout_is_not_classified() {
    let raw = RawResult {
        stdout_text: "ERROR: this went to stdout".into(),
        stderr_text: String::new(),
        exit_code: Some(0),
    };
    assert!(classify(&raw, false).is_success());
}

#[test]
fn line_classifier_is_case_sensitive_and_prefix_anchored() {
    assert_eq!(classify_line("   "), LogLine::Blank);
    assert_eq!(classify_line("ERROR: boom"), LogLine::Error("ERROR: boom"));
    assert_eq!(classify_line("  ERROR: indented"), LogLine::Error("ERROR: indented"));
    assert_eq!(classify_line("error: lower case"), LogLine::Other("error: lower case"));
    assert_eq!(classify_line("an ERROR later"), LogLine::Other("an ERROR later"));
    assert_eq!(
        classify_line("VALIDATION: bad row"),
        LogLine::Validation("VALIDATION: bad row")
    );
    assert_eq!(classify_line("Traceback (most recent call last):"), LogLine::Traceback);
    // Summary-shaped text without a valid mapping is just another line.
    assert_eq!(
        classify_line("imported successfully {broken}"),
        LogLine::Other("imported successfully {broken}")
    );
}

#[test]
fn braces_before_the_mapping_do_not_hide_the_summary() {
    let line = "imported sources{v2}.xlsx successfully {'pointsource': {'created': 4, 'updated': 1}}";
    let LogLine::Summary(counts) = classify_line(line) else {
        panic!("expected a summary line");
    };
    assert_eq!(counts["pointsource"], EntityCounts::new(4, 1));

    assert_eq!(
        trailing_mapping("file {a} done {'x': {'created': 1}}"),
        Some("{'x': {'created': 1}}")
    );
    assert_eq!(trailing_mapping("unbalanced }}"), None);
    assert_eq!(trailing_mapping("no mapping here"), None);
}

#[test]
fn mapping_literal_rejects_malformed_input() {
    assert!(parse_mapping_literal("{}").is_some_and(|c| c.is_empty()));
    assert!(parse_mapping_literal("{'a': {'created': 1, 'updated': 2}}").is_some());
    assert!(parse_mapping_literal("{\"a\": {\"created\": 1}}").is_some());

    assert!(parse_mapping_literal("{'a': {'created': -1}}").is_none());
    assert!(parse_mapping_literal("{'a': {'deleted': 1}}").is_none());
    assert!(parse_mapping_literal("{'a': {}}").is_none());
    assert!(parse_mapping_literal("{'a': 3}").is_none());
    assert!(parse_mapping_literal("{junk 'a': {'created': 1}}").is_none());
    assert!(parse_mapping_literal("'a': {'created': 1}").is_none());
}

#[test]
fn counts_table_is_aligned() {
    let mut counts = eclair_tasks::outcome::CountsByEntity::new();
    counts.insert("pointsource".into(), EntityCounts::new(3, 0));
    counts.insert("area".into(), EntityCounts::new(1200, 2));

    let table = render_counts_table(&counts);
    let lines: Vec<&str> = table.lines().collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "entity      | created | updated");
    assert_eq!(lines[1], "------------+---------+--------");
    assert_eq!(lines[2], "area        |    1200 |       2");
    assert_eq!(lines[3], "pointsource |       3 |       0");
}
