mod common;
use crate::common::{buffered_reports, fake_runner, init_tracing, next_finished, with_timeout};

use std::error::Error;
use std::time::Duration;

use eclair_tasks::dispatch::Dispatcher;
use eclair_tasks::engine::TaskOutcome;
use eclair_tasks::errors::SupervisorError;
use eclair_tasks::task::TaskSpec;
use eclair_tasks::types::{TaskKind, TaskState};
use eclair_tasks_test_utils::builders::{clean_exit, quick_settings, stderr_result};
use eclair_tasks_test_utils::fake_invoker::{FakeBehaviour, FakeInvoker};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(start_paused = true)]
async fn completed_task_reports_exactly_once() -> TestResult {
    init_tracing();

    let result = stderr_result("imported successfully {'pointsource': {'created': 3, 'updated': 0}}", 0);
    let invoker = FakeInvoker::completing(3, result.clone());
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    let handle = runner.submit(TaskSpec::new(TaskKind::Import))?;
    let control = handle.control();
    assert_eq!(control.state(), TaskState::Running);
    assert_eq!(runner.in_flight(), 1);

    let (progress, report) = with_timeout(next_finished(&mut rx)).await;
    assert_eq!(report.id, control.id());
    assert_eq!(report.state, TaskState::Succeeded);
    assert_eq!(report.outcome, TaskOutcome::Completed(result));
    assert_eq!(progress.len(), 2, "two polls before the process exited");

    // The handle receives the same report.
    let waited = with_timeout(handle.wait()).await?;
    assert_eq!(waited, report);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(buffered_reports(&mut rx).is_empty(), "no second terminal report");

    assert_eq!(control.state(), TaskState::Succeeded);
    assert_eq!(control.progress(), 100.0);
    assert_eq!(runner.in_flight(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failing_exit_code_marks_task_failed() -> TestResult {
    init_tracing();

    let invoker = FakeInvoker::completing(1, stderr_result("ERROR: sheet 'Sources' missing", 1));
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    let handle = runner.submit(TaskSpec::new(TaskKind::Import))?;
    let control = handle.control();

    let (_, report) = with_timeout(next_finished(&mut rx)).await;
    assert_eq!(report.state, TaskState::Failed);
    assert_eq!(control.state(), TaskState::Failed);
    assert!(control.progress() < 100.0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn clean_exit_with_validation_messages_is_a_failed_import() -> TestResult {
    init_tracing();

    let invoker =
        FakeInvoker::completing(1, stderr_result("VALIDATION: row 5 missing substance", 0));
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    let handle = runner.submit(TaskSpec::new(TaskKind::Import))?;
    let control = handle.control();

    let (_, report) = with_timeout(next_finished(&mut rx)).await;
    assert_eq!(report.state, TaskState::Failed);
    assert_eq!(control.state(), TaskState::Failed);
    assert!(control.progress() < 100.0);

    let classified = report.classified.as_ref().expect("completed runs are classified");
    assert_eq!(
        classified.summary().map(|s| s.messages.clone()),
        Some(vec!["VALIDATION: row 5 missing substance".to_string()])
    );

    // The dispatcher reaches the same verdict from the same report.
    let dispatch = Dispatcher::new("nc").dispatch(&report);
    assert!(!dispatch.succeeded);
    assert_eq!(with_timeout(handle.wait()).await?.state, TaskState::Failed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn progress_is_monotonic_and_below_completion() -> TestResult {
    init_tracing();

    let invoker = FakeInvoker::completing(40, clean_exit());
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    runner.submit(TaskSpec::new(TaskKind::RasterizeEmissions))?;
    let (progress, report) = with_timeout_secs(next_finished(&mut rx), 120).await;

    assert_eq!(report.state, TaskState::Succeeded);
    assert_eq!(progress.len(), 39);
    assert!(progress.windows(2).all(|w| w[0] < w[1]), "progress must increase: {progress:?}");
    assert!(progress.iter().all(|p| *p > 0.0 && *p < 100.0));
    // The ramp reaches 50% after ten polls with `ramp_polls = 11`.
    assert_eq!(progress[9], 50.0);
    Ok(())
}

async fn with_timeout_secs<F, T>(f: F, secs: u64) -> T
where
    F: std::future::Future<Output = T>,
{
    common::with_timeout_of(Duration::from_secs(secs), f).await
}

#[tokio::test(start_paused = true)]
async fn launch_failure_reports_once_and_returns_error() -> TestResult {
    init_tracing();

    let invoker = FakeInvoker::new(FakeBehaviour::FailToLaunch("etk: command not found".into()));
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    let err = runner
        .submit(TaskSpec::new(TaskKind::Export))
        .expect_err("launch must fail");
    assert!(matches!(err, SupervisorError::Launch(ref m) if m.contains("command not found")));

    let (progress, report) = with_timeout(next_finished(&mut rx)).await;
    assert_eq!(runner.in_flight(), 0);
    assert!(progress.is_empty());
    assert_eq!(report.state, TaskState::Failed);
    assert!(matches!(report.outcome, TaskOutcome::LaunchFailed(ref m) if m.contains("command not found")));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(buffered_reports(&mut rx).is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn poll_error_becomes_crash_and_stops_process() -> TestResult {
    init_tracing();

    let invoker = FakeInvoker::new(FakeBehaviour::FailOnPoll { poll: 2 });
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    runner.submit(TaskSpec::new(TaskKind::AggregateEmissions))?;
    let (_, report) = with_timeout(next_finished(&mut rx)).await;

    assert_eq!(report.state, TaskState::Failed);
    assert!(matches!(report.outcome, TaskOutcome::Crashed(ref m) if m.contains("fake poll failure")));
    assert_eq!(invoker.terminations(), 1);
    assert_eq!(runner.in_flight(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn worker_panic_still_yields_terminal_report() -> TestResult {
    init_tracing();

    let invoker = FakeInvoker::new(FakeBehaviour::PanicOnPoll { poll: 1 });
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    let handle = runner.submit(TaskSpec::new(TaskKind::Export))?;
    let (_, report) = with_timeout(next_finished(&mut rx)).await;

    assert_eq!(report.state, TaskState::Failed);
    assert!(matches!(report.outcome, TaskOutcome::Crashed(_)));
    assert_eq!(with_timeout(handle.wait()).await?, report);
    assert_eq!(runner.in_flight(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn database_is_snapshotted_at_submission() -> TestResult {
    init_tracing();

    let invoker = FakeInvoker::completing(2, clean_exit());
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    let spec = TaskSpec::new(TaskKind::Validate).with_param("file", "sources.xlsx");
    runner.submit(spec)?;
    runner.database().set(Some("/data/other.sqlite".into()));

    let (_, report) = with_timeout(next_finished(&mut rx)).await;
    assert_eq!(report.database.as_deref(), Some(std::path::Path::new("/data/eclair.sqlite")));

    let requests = invoker.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].database, report.database);
    assert_eq!(requests[0].kind, TaskKind::Validate);
    assert!(requests[0].dry_run, "validation runs are dry runs");
    assert_eq!(requests[0].params.get("file").map(String::as_str), Some("sources.xlsx"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn concurrent_tasks_get_distinct_ids_and_one_report_each() -> TestResult {
    init_tracing();

    let invoker = FakeInvoker::completing(2, clean_exit());
    invoker.push(FakeBehaviour::CompleteAfter { polls: 5, result: clean_exit() });
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    let slow = runner.submit(TaskSpec::new(TaskKind::RasterizeEmissions))?;
    let fast = runner.submit(TaskSpec::new(TaskKind::Export))?;
    assert_ne!(slow.id(), fast.id());
    assert_eq!(runner.in_flight(), 2);

    let (_, first) = with_timeout(next_finished(&mut rx)).await;
    let (_, second) = with_timeout(next_finished(&mut rx)).await;
    assert_eq!(first.id, fast.id(), "the quick export is not held up by the rasterization");
    assert_eq!(second.id, slow.id());
    assert_eq!(runner.in_flight(), 0);
    Ok(())
}
