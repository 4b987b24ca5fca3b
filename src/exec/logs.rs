// src/exec/logs.rs

//! Log file naming and discovery.
//!
//! Every invocation writes `<kind>_stdout_<N>.log` and `<kind>_stderr_<N>.log`
//! into the log directory, where `N` grows by one per invocation of that kind.
//! The latest log of a kind is therefore the one with the largest suffix.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::exec::invoker::LogPaths;
use crate::fs::FileSystem;
use crate::types::{LogStream, TaskKind};

pub fn log_file_name(kind: TaskKind, stream: LogStream, index: u64) -> String {
    format!("{}_{}_{}.log", kind.as_str(), stream.as_str(), index)
}

/// Extract `N` from a file name produced by [`log_file_name`].
pub fn parse_log_index(file_name: &str, kind: TaskKind, stream: LogStream) -> Option<u64> {
    let prefix = format!("{}_{}_", kind.as_str(), stream.as_str());
    let digits = file_name.strip_prefix(&prefix)?.strip_suffix(".log")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn indexed_logs(
    fs: &dyn FileSystem,
    dir: &Path,
    kind: TaskKind,
    stream: LogStream,
) -> Result<Vec<(u64, PathBuf)>> {
    if !fs.exists(dir) {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for path in fs.read_dir(dir)? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(index) = parse_log_index(name, kind, stream) {
            found.push((index, path));
        }
    }
    Ok(found)
}

/// Largest suffix used by either stream of `kind`.
pub fn latest_log_index(fs: &dyn FileSystem, dir: &Path, kind: TaskKind) -> Result<Option<u64>> {
    let mut latest = None;
    for stream in [LogStream::Stdout, LogStream::Stderr] {
        for (index, _) in indexed_logs(fs, dir, kind, stream)? {
            latest = latest.max(Some(index));
        }
    }
    Ok(latest)
}

/// Path of the most recent log of `kind` for `stream`, if any.
pub fn latest_log(
    fs: &dyn FileSystem,
    dir: &Path,
    kind: TaskKind,
    stream: LogStream,
) -> Result<Option<PathBuf>> {
    Ok(indexed_logs(fs, dir, kind, stream)?
        .into_iter()
        .max_by_key(|(index, _)| *index)
        .map(|(_, path)| path))
}

pub fn log_paths(dir: &Path, kind: TaskKind, index: u64) -> LogPaths {
    LogPaths {
        stdout: dir.join(log_file_name(kind, LogStream::Stdout, index)),
        stderr: dir.join(log_file_name(kind, LogStream::Stderr, index)),
    }
}

/// Paths for the next invocation of `kind`.
pub fn next_log_paths(fs: &dyn FileSystem, dir: &Path, kind: TaskKind) -> Result<(u64, LogPaths)> {
    let index = latest_log_index(fs, dir, kind)?.map_or(1, |i| i + 1);
    Ok((index, log_paths(dir, kind, index)))
}
