// src/dispatch/shell.rs

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dispatch::core::{step_notice, Dispatch, Dispatcher};
use crate::dispatch::raster::find_new_rasters;
use crate::dispatch::{DispatchCommand, MapCanvas, NoticeLevel, RasterScan, UiSink};
use crate::engine::{TaskEvent, TaskReport, TaskRunner};
use crate::fs::FileSystem;
use crate::types::TaskId;

#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    /// Stop once a terminal report leaves no task in flight (used by the CLI).
    pub exit_when_idle: bool,
}

/// Counters returned when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub follow_ups: usize,
}

/// Async shell around [`Dispatcher`]: consumes runner events and executes the
/// resulting commands.
pub struct DispatchLoop {
    dispatcher: Dispatcher,
    runner: TaskRunner,
    ui: Arc<dyn UiSink>,
    canvas: Arc<dyn MapCanvas>,
    fs: Arc<dyn FileSystem>,
    options: DispatchOptions,
    summary: DispatchSummary,
}

impl fmt::Debug for DispatchLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchLoop")
            .field("dispatcher", &self.dispatcher)
            .field("options", &self.options)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl DispatchLoop {
    pub fn new(
        dispatcher: Dispatcher,
        runner: TaskRunner,
        ui: Arc<dyn UiSink>,
        canvas: Arc<dyn MapCanvas>,
        fs: Arc<dyn FileSystem>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            dispatcher,
            runner,
            ui,
            canvas,
            fs,
            options,
            summary: DispatchSummary::default(),
        }
    }

    /// Main event loop.
    ///
    /// Runs until the event channel closes, or, with `exit_when_idle`, until
    /// a terminal report leaves no task in flight.
    pub async fn run(mut self, mut events: mpsc::Receiver<TaskEvent>) -> DispatchSummary {
        info!("dispatch loop started");

        while let Some(event) = events.recv().await {
            match event {
                TaskEvent::Progress { id, kind, percent } => {
                    self.ui.progress(id, kind, percent);
                }
                TaskEvent::Finished(report) => {
                    self.handle_report(&report);
                    if self.options.exit_when_idle && self.runner.in_flight() == 0 {
                        info!("no tasks in flight; stopping dispatch loop");
                        break;
                    }
                }
            }
        }

        info!(?self.summary, "dispatch loop exiting");
        self.summary
    }

    pub fn summary(&self) -> DispatchSummary {
        self.summary
    }

    /// Dispatch one terminal report and execute its commands.
    pub fn handle_report(&mut self, report: &TaskReport) -> Dispatch {
        let dispatch = self.dispatcher.dispatch(report);

        self.summary.dispatched += 1;
        if dispatch.succeeded {
            self.summary.succeeded += 1;
        } else {
            self.summary.failed += 1;
        }

        for command in dispatch.commands.iter().cloned() {
            self.execute(report, command);
        }
        dispatch
    }

    fn execute(&mut self, report: &TaskReport, command: DispatchCommand) {
        match command {
            DispatchCommand::ShowNotice(notice) => self.ui.notify(notice),
            DispatchCommand::SubmitFollowUp { after, spec } => {
                info!(after, kind = %spec.kind, "submitting follow-up step");
                match self.runner.submit(spec) {
                    Ok(handle) => {
                        self.summary.follow_ups += 1;
                        debug!(after, task_id = handle.id(), "follow-up step running");
                    }
                    // The runner reports the launch failure of the follow-up
                    // itself, so it is attributed to that step.
                    Err(e) => warn!(after, error = %e, "follow-up step could not be started"),
                }
            }
            DispatchCommand::RefreshCanvas => self.canvas.refresh(),
            DispatchCommand::LoadRasters { task_id, scan } => {
                if let Err(e) = self.load_rasters(task_id, &scan) {
                    warn!(task_id, error = %format!("{e:#}"), "loading rasters failed");
                    self.ui.notify(step_notice(
                        report,
                        "load rasters",
                        NoticeLevel::Error,
                        "Loading rasters failed",
                        &format!("{e:#}"),
                    ));
                }
            }
        }
    }

    /// Load every new raster that is not entirely zero. Returns how many
    /// were loaded.
    fn load_rasters(&self, task_id: TaskId, scan: &RasterScan) -> Result<usize> {
        let candidates = find_new_rasters(self.fs.as_ref(), scan)?;
        let mut loaded = 0;
        for path in candidates {
            if self.canvas.raster_is_all_zero(&path)? {
                debug!(task_id, path = ?path, "raster is all zero; not loading");
                continue;
            }
            self.canvas.load_raster(&path)?;
            info!(task_id, path = ?path, "raster loaded");
            loaded += 1;
        }
        Ok(loaded)
    }
}
