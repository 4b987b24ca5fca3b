// src/dispatch/console.rs

//! Terminal stand-ins for the panel and the map canvas, used by the CLI.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};

use crate::dispatch::{MapCanvas, Notice, NoticeAction, NoticeBody, NoticeLevel, UiSink};
use crate::outcome::render_counts_table;
use crate::types::{TaskId, TaskKind};

/// Prints progress and notices to stdout.
///
/// Progress is printed only when the whole percentage changes.
#[derive(Debug, Default)]
pub struct ConsoleUi {
    last_shown: Mutex<HashMap<TaskId, u32>>,
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UiSink for ConsoleUi {
    fn progress(&self, task_id: TaskId, kind: TaskKind, percent: f32) {
        let whole = percent.floor() as u32;
        let mut last = self
            .last_shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if last.insert(task_id, whole) == Some(whole) {
            return;
        }
        println!("[{task_id}] {kind}: {whole}%");
    }

    fn notify(&self, notice: Notice) {
        self.last_shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&notice.task_id);

        let level = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        println!("[{}] {} ({level}): {}", notice.task_id, notice.step, notice.title);
        match &notice.body {
            NoticeBody::Text(text) if text.is_empty() => {}
            NoticeBody::Text(text) => println!("{text}"),
            NoticeBody::Table { counts, messages } => {
                print!("{}", render_counts_table(counts));
                for message in messages {
                    println!("{message}");
                }
            }
        }
        if notice.action == Some(NoticeAction::ChooseDatabase) {
            println!("hint: pass --database <path> or set the database environment variable");
        }
    }
}

/// Reports canvas activity on stdout.
#[derive(Debug, Default)]
pub struct ConsoleCanvas;

impl MapCanvas for ConsoleCanvas {
    fn refresh(&self) {
        println!("map canvas refreshed");
    }

    /// Treats the raw file bytes as cell data: an empty or all-zero file
    /// holds nothing worth showing.
    fn raster_is_all_zero(&self, path: &Path) -> Result<bool> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading raster {}", path.display()))?;
        Ok(bytes.iter().all(|b| *b == 0))
    }

    fn load_raster(&self, path: &Path) -> Result<()> {
        println!("loaded raster layer {}", path.display());
        Ok(())
    }
}
