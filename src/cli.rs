// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `treetask`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "treetask",
    version,
    about = "Run dependency-ordered build tasks against a source tree.",
    long_about = None
)]
pub struct CliArgs {
    /// Tasks to run, in order. Each task runs at most once across all of
    /// them.
    #[arg(value_name = "TASK")]
    pub targets: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Treetask.toml` in the current working directory; built-in
    /// defaults are used if it does not exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// List the available tasks with their descriptions.
    #[arg(short = 'T', long)]
    pub list: bool,

    /// Print the order the tasks would run in, without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TREETASK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Checker config used instead of merging `~/.jshintrc` and the
    /// project's rc file.
    #[arg(long, value_name = "PATH")]
    pub lint_config: Option<String>,

    /// Custom reporter handed to the checker.
    #[arg(long, value_name = "PATH")]
    pub reporter: Option<String>,

    /// Use the checker's JSLint-compatible XML reporter.
    #[arg(long)]
    pub jslint_reporter: bool,

    /// Use the checker's reporter that also lists implied globals and
    /// unused variables.
    #[arg(long)]
    pub show_non_errors: bool,
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
