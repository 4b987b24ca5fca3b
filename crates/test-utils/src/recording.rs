use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use eclair_tasks::dispatch::{MapCanvas, Notice, UiSink};
use eclair_tasks::types::{TaskId, TaskKind};

/// A UI sink that remembers everything it was shown.
#[derive(Debug, Default)]
pub struct RecordingUi {
    progress: Mutex<Vec<(TaskId, TaskKind, f32)>>,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> Vec<(TaskId, TaskKind, f32)> {
        self.progress.lock().unwrap().clone()
    }

    /// Progress values reported for one task, in order.
    pub fn progress_of(&self, task_id: TaskId) -> Vec<f32> {
        self.progress
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _, _)| *id == task_id)
            .map(|(_, _, p)| *p)
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl UiSink for RecordingUi {
    fn progress(&self, task_id: TaskId, kind: TaskKind, percent: f32) {
        self.progress.lock().unwrap().push((task_id, kind, percent));
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// A map canvas that records refreshes and loaded rasters.
///
/// Rasters registered with [`RecordingCanvas::mark_all_zero`] report as
/// all-zero; [`RecordingCanvas::fail_loading`] makes every load fail.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    refreshes: AtomicUsize,
    loaded: Mutex<Vec<PathBuf>>,
    all_zero: Mutex<BTreeSet<PathBuf>>,
    fail_loads: Mutex<Option<String>>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_all_zero(&self, path: impl Into<PathBuf>) {
        self.all_zero.lock().unwrap().insert(path.into());
    }

    pub fn fail_loading(&self, message: &str) {
        *self.fail_loads.lock().unwrap() = Some(message.to_string());
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn loaded(&self) -> Vec<PathBuf> {
        self.loaded.lock().unwrap().clone()
    }
}

impl MapCanvas for RecordingCanvas {
    fn refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }

    fn raster_is_all_zero(&self, path: &Path) -> Result<bool> {
        Ok(self.all_zero.lock().unwrap().contains(path))
    }

    fn load_raster(&self, path: &Path) -> Result<()> {
        if let Some(message) = self.fail_loads.lock().unwrap().as_ref() {
            return Err(anyhow!("{message}"));
        }
        self.loaded.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}
