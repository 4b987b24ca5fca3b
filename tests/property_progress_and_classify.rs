use proptest::prelude::*;

use eclair_tasks::exec::RawResult;
use eclair_tasks::outcome::{classify, ClassifiedOutcome};
use eclair_tasks::task::progress::RUNNING_CAP;
use eclair_tasks::task::ProgressCurve;

// Lines biased towards the shapes the toolkit actually prints.
fn log_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("Traceback (most recent call last):".to_string()),
        Just("Database unspecified does not exist".to_string()),
        "[a-z ]{0,20}".prop_map(|s| format!("ERROR{s}")),
        "[a-z ]{0,20}".prop_map(|s| format!("VALIDATION: {s}")),
        (any::<u32>(), any::<u32>()).prop_map(|(c, u)| format!(
            "imported successfully {{'pointsource': {{'created': {c}, 'updated': {u}}}}}"
        )),
        "[{}':,a-z0-9 ]{0,40}".prop_map(|s| format!("validated {s}")),
        any::<String>(),
    ]
}

proptest! {
    #[test]
    fn progress_curve_is_monotonic_and_capped(
        ramp in 2u64..200,
        extra in 1u64..10_000,
        polls in proptest::collection::vec(0u64..20_000, 1..50),
    ) {
        let curve = ProgressCurve::new(ramp, ramp + extra);
        let mut polls = polls;
        polls.sort_unstable();

        let mut last = 0.0f32;
        for poll in polls {
            let p = curve.at(poll);
            prop_assert!(p >= last, "progress fell from {last} to {p} at poll {poll}");
            prop_assert!((0.0..=RUNNING_CAP).contains(&p));
            last = p;
        }
        prop_assert_eq!(curve.at(0), 0.0);
        prop_assert_eq!(curve.at(ramp - 1), 50.0);
    }

    #[test]
    fn classification_never_panics(
        lines in proptest::collection::vec(log_line(), 0..12),
        exit_code in proptest::option::of(-2i32..3),
        dry_run in any::<bool>(),
    ) {
        let raw = RawResult {
            stdout_text: String::new(),
            stderr_text: lines.join("\n"),
            exit_code,
        };
        let outcome = classify(&raw, dry_run);

        // Summaries follow the dry-run flag.
        match &outcome {
            ClassifiedOutcome::ValidationSummary(_) => prop_assert!(dry_run),
            ClassifiedOutcome::ImportSummary(_) => prop_assert!(!dry_run),
            _ => {}
        }
        // Rendering is total as well.
        let _ = outcome.title();
        let _ = outcome.body();
    }
}
