// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `repobatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "repobatch",
    version,
    about = "Run sequences of git commands across many repositories.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the batch file (TOML).
    ///
    /// Default: `Repobatch.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Only run this group. Repeat to select several groups.
    ///
    /// A group whose dependency is not selected is blocked.
    #[arg(long = "group", value_name = "NAME")]
    pub groups: Vec<String>,

    /// Never ask what to do after a failure: the failing group stops.
    #[arg(long)]
    pub no_prompt: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `REPOBATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the groups and their commands, but don't run
    /// git.
    #[arg(long)]
    pub dry_run: bool,
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

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
