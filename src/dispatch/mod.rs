// src/dispatch/mod.rs

//! Result Dispatcher.
//!
//! Routes finished tasks to the UI and chains the declared pipeline steps.
//! Like the runner, it is split in two:
//!
//! - [`core`]: a pure, synchronous [`Dispatcher`] mapping a `TaskReport` to
//!   [`DispatchCommand`]s. No IO, no channels.
//! - [`shell`]: the async [`DispatchLoop`] that consumes runner events and
//!   executes those commands against the collaborators below.
//! - [`raster`]: scanning an output directory for freshly written rasters.
//! - [`console`]: terminal implementations of the collaborators for the CLI.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::outcome::CountsByEntity;
use crate::task::TaskSpec;
use crate::types::{TaskId, TaskKind};

pub mod console;
pub mod core;
pub mod raster;
pub mod shell;

pub use self::core::{Dispatch, Dispatcher};
pub use console::{ConsoleCanvas, ConsoleUi};
pub use raster::find_new_rasters;
pub use shell::{DispatchLoop, DispatchOptions, DispatchSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Something the UI can offer alongside a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeAction {
    /// Let the user choose an existing database or create one.
    ChooseDatabase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeBody {
    Text(String),
    /// Counts table plus line-level messages.
    Table {
        counts: CountsByEntity,
        messages: Vec<String>,
    },
}

/// One dialog shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub task_id: TaskId,
    pub kind: TaskKind,
    /// Pipeline step the notice is about; a follow-up failure names its own
    /// step rather than the task that triggered it.
    pub step: String,
    pub level: NoticeLevel,
    pub title: String,
    pub body: NoticeBody,
    pub action: Option<NoticeAction>,
}

/// Which rasters to load after a rasterization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterScan {
    pub dir: PathBuf,
    /// Only files modified after this instant are considered.
    pub since: SystemTime,
    /// Expected extension without the dot, e.g. `nc`.
    pub extension: String,
}

/// Work the dispatch shell performs for one report.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchCommand {
    ShowNotice(Notice),
    /// Submit the next pipeline step.
    SubmitFollowUp { after: TaskId, spec: TaskSpec },
    RefreshCanvas,
    LoadRasters { task_id: TaskId, scan: RasterScan },
}

/// Receives progress and notices.
pub trait UiSink: Send + Sync {
    fn progress(&self, task_id: TaskId, kind: TaskKind, percent: f32);
    fn notify(&self, notice: Notice);
}

/// The map canvas layers are loaded into.
pub trait MapCanvas: Send + Sync {
    fn refresh(&self);

    /// Whether every cell of the raster is zero (nothing worth showing).
    fn raster_is_all_zero(&self, path: &Path) -> anyhow::Result<bool>;

    fn load_raster(&self, path: &Path) -> anyhow::Result<()>;
}
