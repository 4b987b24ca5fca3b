// src/exec/toolkit.rs

//! Production invoker: runs the emission toolkit as a child process.
//!
//! The command line is
//! `<program> <subcommand> [args...] [--<key> <value>...] [--dryrun]`, with
//! the active database exported in the configured environment variable and
//! both output streams redirected to fresh log files.

use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::exec::invoker::{
    LogPaths, OperationHandle, OperationInvoker, OperationRequest, ProcessExit, RawResult,
};
use crate::exec::logs::{log_paths, next_log_paths};
use crate::fs::FileSystem;

/// Attempts at claiming a fresh log index when concurrent invocations race.
const MAX_LOG_CLAIMS: u64 = 16;

/// Starts toolkit processes.
///
/// The child writes its logs through OS file handles, so log files are always
/// created on the real disk under the configured `log_dir`. The injected
/// [`FileSystem`] is used to discover existing log indexes and to read the
/// logs back, and must therefore see the same disk (in production
/// [`RealFileSystem`](crate::fs::RealFileSystem)).
#[derive(Debug, Clone)]
pub struct ToolkitInvoker {
    config: Arc<ConfigFile>,
    fs: Arc<dyn FileSystem>,
}

impl ToolkitInvoker {
    pub fn new(config: Arc<ConfigFile>, fs: Arc<dyn FileSystem>) -> Self {
        Self { config, fs }
    }

    /// Build the command for `request` without spawning it.
    pub fn command(&self, request: &OperationRequest) -> Command {
        let (subcommand, args) = self.config.operation(request.kind);

        let mut cmd = Command::new(&self.config.toolkit.program);
        cmd.arg(subcommand).args(args);
        for (key, value) in request.params.iter() {
            cmd.arg(format!("--{key}"));
            if !value.is_empty() {
                cmd.arg(value);
            }
        }
        if request.dry_run {
            cmd.arg("--dryrun");
        }
        match &request.database {
            Some(db) => {
                cmd.env(&self.config.toolkit.database_env, db);
            }
            None => {
                cmd.env_remove(&self.config.toolkit.database_env);
            }
        }
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    /// Create both log files on disk for the next invocation of this kind.
    ///
    /// Files are created with `create_new`, so two tasks of the same kind
    /// started at once never share an index.
    fn claim_log_files(&self, request: &OperationRequest) -> Result<(LogPaths, File, File)> {
        let dir = &self.config.toolkit.log_dir;
        self.fs.create_dir_all(dir)?;

        let (mut index, _) = next_log_paths(self.fs.as_ref(), dir, request.kind)?;
        for _ in 0..MAX_LOG_CLAIMS {
            let paths = log_paths(dir, request.kind, index);
            match create_new(&paths.stdout) {
                Ok(stdout) => {
                    let stderr = File::create(&paths.stderr)
                        .with_context(|| format!("creating log file {:?}", paths.stderr))?;
                    return Ok((paths, stdout, stderr));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(task_id = request.task_id, index, "log index taken; trying next");
                    index += 1;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("creating log file {:?}", paths.stdout));
                }
            }
        }
        Err(anyhow!(
            "could not claim a log file for '{}' in {:?}",
            request.kind,
            dir
        ))
    }
}

fn create_new(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

impl OperationInvoker for ToolkitInvoker {
    fn start(&self, request: &OperationRequest) -> Result<Box<dyn OperationHandle>> {
        let (paths, stdout, stderr) = self.claim_log_files(request)?;

        let mut cmd = self.command(request);
        cmd.stdout(Stdio::from(stdout)).stderr(Stdio::from(stderr));

        let child = cmd.spawn().with_context(|| {
            format!(
                "spawning '{}' for {} (task {})",
                self.config.toolkit.program, request.kind, request.task_id
            )
        })?;

        info!(
            task_id = request.task_id,
            kind = %request.kind,
            pid = child.id(),
            stderr_log = ?paths.stderr,
            "toolkit process started"
        );

        Ok(Box::new(ToolkitProcess {
            child,
            paths,
            fs: Arc::clone(&self.fs),
            exit: None,
        }))
    }
}

/// A running toolkit process and its log files.
#[derive(Debug)]
pub struct ToolkitProcess {
    child: Child,
    paths: LogPaths,
    fs: Arc<dyn FileSystem>,
    exit: Option<ProcessExit>,
}

impl OperationHandle for ToolkitProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn log_paths(&self) -> &LogPaths {
        &self.paths
    }

    fn try_wait(&mut self) -> Result<Option<ProcessExit>> {
        if self.exit.is_some() {
            return Ok(self.exit);
        }
        let status = self.child.try_wait().context("polling toolkit process")?;
        self.exit = status.map(|s| ProcessExit { code: s.code() });
        Ok(self.exit)
    }

    fn terminate(&mut self) -> Pin<Box<dyn Future<Output = Result<ProcessExit>> + Send + '_>> {
        Box::pin(async move {
            if let Some(exit) = self.try_wait()? {
                return Ok(exit);
            }
            if let Err(e) = self.child.start_kill() {
                // The process may have exited between the poll and the kill.
                warn!(pid = self.child.id(), error = %e, "failed to signal toolkit process");
            }
            let status = self
                .child
                .wait()
                .await
                .context("waiting for toolkit process to exit")?;
            let exit = ProcessExit { code: status.code() };
            self.exit = Some(exit);
            debug!(code = ?exit.code, "toolkit process exited after termination");
            Ok(exit)
        })
    }

    fn collect(&mut self, exit: ProcessExit) -> Result<RawResult> {
        let stdout_text = self.fs.read_to_string_lossy(&self.paths.stdout)?;
        let stderr_text = self.fs.read_to_string_lossy(&self.paths.stderr)?;
        Ok(RawResult {
            stdout_text,
            stderr_text,
            exit_code: exit.code,
        })
    }
}
