mod common;
use crate::common::{buffered_reports, fake_runner, init_tracing, next_finished, with_timeout, with_timeout_of};

use std::error::Error;
use std::time::Duration;

use eclair_tasks::engine::TaskOutcome;
use eclair_tasks::task::TaskSpec;
use eclair_tasks::types::{TaskKind, TaskState};
use eclair_tasks_test_utils::builders::{clean_exit, quick_settings, stderr_result};
use eclair_tasks_test_utils::fake_invoker::{FakeBehaviour, FakeInvoker, FakeProcessControl};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(start_paused = true)]
async fn cancel_stops_the_process_on_next_poll() -> TestResult {
    init_tracing();

    let invoker = FakeInvoker::new(FakeBehaviour::NeverComplete);
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    let handle = runner.submit(TaskSpec::new(TaskKind::RasterizeEmissions))?;
    let control = handle.control();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(control.cancel());
    assert_eq!(control.state(), TaskState::CancelRequested);
    assert!(!control.cancel(), "a second request is a no-op");

    let (progress, report) = with_timeout(next_finished(&mut rx)).await;
    assert_eq!(progress.len(), 2);
    assert_eq!(report.state, TaskState::Cancelled);
    assert_eq!(report.outcome, TaskOutcome::Cancelled);
    assert_eq!(invoker.terminations(), 1);
    assert_eq!(control.state(), TaskState::Cancelled);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(buffered_reports(&mut rx).is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn completion_wins_over_late_cancellation() -> TestResult {
    init_tracing();

    let process = FakeProcessControl::new();
    let invoker = FakeInvoker::new(FakeBehaviour::Manual(process.clone()));
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    let handle = runner.submit(TaskSpec::new(TaskKind::Export))?;
    let control = handle.control();

    // The process exits, then the user cancels before the worker polls.
    process.complete(clean_exit());
    assert!(control.cancel());

    let (_, report) = with_timeout(next_finished(&mut rx)).await;
    assert_eq!(report.state, TaskState::Succeeded);
    assert_eq!(report.outcome, TaskOutcome::Completed(clean_exit()));
    assert_eq!(invoker.terminations(), 0, "an exited process is not terminated");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_completion_also_wins_over_cancellation() -> TestResult {
    init_tracing();

    let process = FakeProcessControl::new();
    let invoker = FakeInvoker::new(FakeBehaviour::Manual(process.clone()));
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    let handle = runner.submit(TaskSpec::new(TaskKind::Import))?;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let failed = stderr_result("ERROR: no such sheet", 2);
    process.complete(failed.clone());
    assert!(handle.cancel());

    let (_, report) = with_timeout(next_finished(&mut rx)).await;
    assert_eq!(report.state, TaskState::Failed);
    assert_eq!(report.outcome, TaskOutcome::Completed(failed));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancelling_a_finished_task_is_rejected() -> TestResult {
    init_tracing();

    let invoker = FakeInvoker::completing(1, clean_exit());
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    let handle = runner.submit(TaskSpec::new(TaskKind::Export))?;
    let control = handle.control();
    let (_, report) = with_timeout(next_finished(&mut rx)).await;
    assert_eq!(report.state, TaskState::Succeeded);

    assert!(!control.cancel());
    assert_eq!(control.state(), TaskState::Succeeded);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn task_exceeding_budget_times_out() -> TestResult {
    init_tracing();

    let invoker = FakeInvoker::new(FakeBehaviour::NeverComplete);
    let (runner, mut rx) = fake_runner(&invoker, quick_settings());

    let handle = runner.submit(TaskSpec::new(TaskKind::RasterizeEmissions))?;
    let control = handle.control();

    let (progress, report) =
        with_timeout_of(Duration::from_secs(120), next_finished(&mut rx)).await;

    let settings = quick_settings();
    assert_eq!(report.state, TaskState::Failed);
    assert_eq!(report.outcome, TaskOutcome::TimedOut { budget: settings.time_budget });
    assert_eq!(invoker.terminations(), 1);

    // One poll per second up to the budget; the last poll terminates.
    assert_eq!(progress.len() as u64, settings.max_polls() - 1);
    assert!(progress.iter().all(|p| *p < 100.0));
    assert!(control.progress() < 100.0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn default_budget_is_one_hour_of_one_second_polls() -> TestResult {
    init_tracing();

    let settings = eclair_tasks::config::SupervisorSettings::default();
    assert_eq!(settings.max_polls(), 3600);

    let invoker = FakeInvoker::new(FakeBehaviour::NeverComplete);
    let (runner, mut rx) = fake_runner(&invoker, settings);

    let start = tokio::time::Instant::now();
    runner.submit(TaskSpec::new(TaskKind::AggregateEmissions))?;
    let (progress, report) =
        with_timeout_of(Duration::from_secs(2 * 3600), next_finished(&mut rx)).await;

    assert!(matches!(report.outcome, TaskOutcome::TimedOut { .. }));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(3600) && elapsed < Duration::from_secs(3601));
    assert!(progress.last().is_some_and(|p| *p < 100.0));
    Ok(())
}
