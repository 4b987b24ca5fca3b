// src/lib.rs

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod outcome;
pub mod task;
pub mod types;

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, RunArgs};
use crate::config::load_or_default;
use crate::config::model::ConfigFile;
use crate::dispatch::{
    ConsoleCanvas, ConsoleUi, DispatchLoop, DispatchOptions, Dispatcher,
};
use crate::engine::{ActiveDatabase, TaskRunner};
use crate::exec::{latest_log, ToolkitInvoker};
use crate::fs::{FileSystem, RealFileSystem};
use crate::task::{TaskControl, TaskSpec};
use crate::types::{LogStream, TaskKind};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the toolkit invoker and task runner
/// - the dispatch loop with console collaborators
/// - Ctrl-C handling (cancels the running task)
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)?;

    match args.command {
        Command::Check => {
            print_settings(&cfg);
            Ok(())
        }
        Command::Logs { kind, stderr } => {
            let stream = if stderr {
                LogStream::Stderr
            } else {
                LogStream::Stdout
            };
            print_latest_log(&RealFileSystem, &cfg, kind, stream)
        }
        Command::Run(run_args) => run_task(cfg, run_args).await,
    }
}

async fn run_task(cfg: ConfigFile, args: RunArgs) -> Result<()> {
    let cfg = Arc::new(cfg);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let database = ActiveDatabase::from_env(&cfg.toolkit.database_env);
    if let Some(path) = args.database.clone() {
        info!(database = ?path, "active database overridden on the command line");
        database.set(Some(path));
    }

    let invoker = Arc::new(ToolkitInvoker::new(Arc::clone(&cfg), Arc::clone(&fs)));
    let (runner, events) = TaskRunner::new(invoker, cfg.supervisor, database);

    let spec = spec_from_args(&args);
    match runner.submit(spec) {
        Ok(handle) => spawn_ctrl_c(handle.control()),
        // The launch failure is still reported through the dispatch loop.
        Err(e) => warn!(error = %e, "task could not be started"),
    }

    let dispatch = DispatchLoop::new(
        Dispatcher::new(cfg.raster.extension.clone()),
        runner,
        Arc::new(ConsoleUi::new()),
        Arc::new(ConsoleCanvas),
        fs,
        DispatchOptions {
            exit_when_idle: true,
        },
    );
    let summary = dispatch.run(events).await;
    debug!(?summary, "all tasks finished");

    if summary.failed > 0 {
        bail!("{} of {} step(s) did not succeed", summary.failed, summary.dispatched);
    }
    Ok(())
}

fn spec_from_args(args: &RunArgs) -> TaskSpec {
    let mut spec = TaskSpec::new(args.kind).load_after_creation(args.load_after_creation);
    if args.dry_run {
        spec = spec.dry_run(true);
    }
    for (key, value) in &args.params {
        spec = spec.with_param(key.clone(), value.clone());
    }
    if let Some(dir) = &args.output_dir {
        spec = spec.with_output_dir(dir.clone());
    }
    spec
}

/// Ctrl-C → cancel the task; the worker stops the process on its next poll.
fn spawn_ctrl_c(control: TaskControl) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        if control.cancel() {
            info!(task_id = control.id(), "cancellation requested");
        } else {
            debug!(task_id = control.id(), state = %control.state(), "task not running; nothing to cancel");
        }
    });
}

fn print_latest_log(
    fs: &dyn FileSystem,
    cfg: &ConfigFile,
    kind: TaskKind,
    stream: LogStream,
) -> Result<()> {
    match latest_log(fs, &cfg.toolkit.log_dir, kind, stream)? {
        Some(path) => {
            println!("==> {} <==", path.display());
            print!("{}", fs.read_to_string_lossy(&path)?);
        }
        None => println!(
            "no {} log for '{kind}' in {}",
            stream.as_str(),
            cfg.toolkit.log_dir.display()
        ),
    }
    Ok(())
}

fn print_settings(cfg: &ConfigFile) {
    let s = &cfg.supervisor;
    println!("eclair-tasks settings");
    println!("  supervisor.poll_interval = {:?}", s.poll_interval);
    println!("  supervisor.time_budget = {:?}", s.time_budget);
    println!("  supervisor.max_polls = {}", s.max_polls());
    println!("  supervisor.ramp_polls = {}", s.ramp_polls);
    println!("  supervisor.event_buffer = {}", s.event_buffer);
    println!();
    println!("  toolkit.program = {}", cfg.toolkit.program);
    println!("  toolkit.database_env = {}", cfg.toolkit.database_env);
    println!("  toolkit.log_dir = {}", cfg.toolkit.log_dir.display());
    println!("  raster.extension = {}", cfg.raster.extension);
    println!();

    println!("operations ({}):", TaskKind::ALL.len());
    for kind in TaskKind::ALL {
        let (subcommand, args) = cfg.operation(kind);
        if args.is_empty() {
            println!("  - {kind}: {subcommand}");
        } else {
            println!("  - {kind}: {subcommand} {}", args.join(" "));
        }
    }
}
