// src/dispatch/raster.rs

//! Finding the rasters a rasterization just wrote.

use std::path::PathBuf;

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use tracing::debug;

use crate::dispatch::RasterScan;
use crate::fs::FileSystem;

fn extension_matcher(extension: &str) -> Result<GlobMatcher> {
    let pattern = format!("*.{}", extension.trim_start_matches('.'));
    let glob = Glob::new(&pattern)
        .with_context(|| format!("invalid raster extension pattern '{pattern}'"))?;
    Ok(glob.compile_matcher())
}

/// Files in `scan.dir` with the expected extension, modified after
/// `scan.since`, sorted by path.
///
/// Older files are leftovers of earlier runs and are never reloaded.
pub fn find_new_rasters(fs: &dyn FileSystem, scan: &RasterScan) -> Result<Vec<PathBuf>> {
    let matcher = extension_matcher(&scan.extension)?;

    let mut found = Vec::new();
    for path in fs.read_dir(&scan.dir)? {
        if !fs.is_file(&path) {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        if !matcher.is_match(name) {
            continue;
        }
        let modified = fs.modified(&path)?;
        if modified > scan.since {
            found.push(path);
        } else {
            debug!(path = ?path, "raster predates the task; skipping");
        }
    }
    found.sort();
    Ok(found)
}
