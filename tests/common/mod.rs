#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::mpsc;

use eclair_tasks::config::SupervisorSettings;
use eclair_tasks::engine::{ActiveDatabase, TaskEvent, TaskReport, TaskRunner};
use eclair_tasks_test_utils::fake_invoker::FakeInvoker;

pub use eclair_tasks_test_utils::{init_tracing, with_timeout, with_timeout_of};

/// Runner backed by `invoker`, with a fixed active database.
pub fn fake_runner(
    invoker: &FakeInvoker,
    settings: SupervisorSettings,
) -> (TaskRunner, mpsc::Receiver<TaskEvent>) {
    TaskRunner::new(
        Arc::new(invoker.clone()),
        settings,
        ActiveDatabase::new(Some("/data/eclair.sqlite".into())),
    )
}

/// Receive events until the next terminal report.
///
/// Returns the progress values seen on the way, in order.
pub async fn next_finished(rx: &mut mpsc::Receiver<TaskEvent>) -> (Vec<f32>, TaskReport) {
    let mut progress = Vec::new();
    loop {
        match rx.recv().await {
            Some(TaskEvent::Progress { percent, .. }) => progress.push(percent),
            Some(TaskEvent::Finished(report)) => return (progress, report),
            None => panic!("event channel closed before a terminal report"),
        }
    }
}

/// Terminal reports still buffered in the channel.
pub fn buffered_reports(rx: &mut mpsc::Receiver<TaskEvent>) -> Vec<TaskReport> {
    let mut reports = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let TaskEvent::Finished(report) = event {
            reports.push(report);
        }
    }
    reports
}
