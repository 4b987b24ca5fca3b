// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::TaskKind;

/// Command-line arguments for `eclair-tasks`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "eclair-tasks",
    version,
    about = "Supervise long-running emission toolkit operations.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// A missing file is not an error; built-in defaults are used instead.
    #[arg(long, value_name = "PATH", default_value = "Eclair.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ECLAIR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run one toolkit operation under supervision and print its outcome.
    Run(RunArgs),

    /// Print the latest log file written for an operation kind.
    Logs {
        /// Operation kind, e.g. `import` or `rasterize_emissions`.
        #[arg(value_parser = parse_kind)]
        kind: TaskKind,

        /// Show the stderr log instead of stdout.
        #[arg(long)]
        stderr: bool,
    },

    /// Load and validate the config, then print the effective settings.
    Check,
}

#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Operation kind, e.g. `import` or `rasterize_emissions`.
    #[arg(value_parser = parse_kind)]
    pub kind: TaskKind,

    /// Operation parameter passed through to the toolkit (repeatable).
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Validate only; nothing is written to the database.
    #[arg(long)]
    pub dry_run: bool,

    /// Load created rasters onto the map once rasterization succeeds.
    #[arg(long)]
    pub load_after_creation: bool,

    /// Directory the operation writes its output files into.
    #[arg(long, value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// Override the active database for this invocation.
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_kind(s: &str) -> Result<TaskKind, String> {
    s.parse()
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid parameter '{s}': expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid parameter '{s}': empty key"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
