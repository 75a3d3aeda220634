// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod lintrc;
pub mod logging;
pub mod pipeline;
pub mod tasks;
pub mod types;
pub mod walk;
pub mod watch;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::CommandFactory;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_or_default};
use crate::engine::{BuildSession, TaskGraph, TaskName};
use crate::lintrc::{LintOverrides, Reporter};
use crate::tasks::builtin_graph;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the build session and the built-in task graph
/// - `--list` / `--dry-run` output
/// - Ctrl-C handling (cancels the session token)
pub async fn run(args: CliArgs) -> Result<()> {
    run_with_output(args, &mut io::stdout()).await
}

/// [`run`], writing help, `--list` and `--dry-run` output to `out`.
pub async fn run_with_output<W: Write>(args: CliArgs, out: &mut W) -> Result<()> {
    let (config_path, explicit) = match &args.config {
        Some(path) => (PathBuf::from(path), true),
        None => (default_config_path(), false),
    };
    let cfg = load_or_default(&config_path, explicit)?;

    let cancel = CancellationToken::new();
    let lint = LintOverrides {
        custom_config: args.lint_config.as_ref().map(PathBuf::from),
        reporter: Reporter::select(
            args.reporter.as_ref().map(PathBuf::from),
            args.jslint_reporter,
            args.show_non_errors,
        ),
    };

    let session = BuildSession::builder(cfg)
        .cancel_token(cancel.clone())
        .lint_overrides(lint)
        .build();
    let mut graph = builtin_graph(Arc::new(session))?;

    if args.list {
        print_task_list(&graph, out)?;
        return Ok(());
    }

    if args.targets.is_empty() {
        CliArgs::command().write_help(out)?;
        writeln!(out)?;
        return Ok(());
    }

    if args.dry_run {
        print_plan(&graph.plan(&args.targets)?, out)?;
        return Ok(());
    }

    // Ctrl-C: first cancels the session, second exits.
    {
        let mut interrupts = Interrupts::new(cancel.clone());
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    eprintln!("failed to listen for Ctrl+C: {e}");
                    return;
                }
                if !interrupts.on_signal() {
                    std::process::exit(INTERRUPT_EXIT_CODE);
                }
            }
        });
    }

    info!(targets = ?args.targets, "running tasks");
    graph.invoke_all(&args.targets).await?;
    Ok(())
}

/// Exit status after a second Ctrl-C (128 + SIGINT).
const INTERRUPT_EXIT_CODE: i32 = 130;

/// Counts Ctrl-C presses for one session.
struct Interrupts {
    cancel: CancellationToken,
    seen: u32,
}

impl Interrupts {
    fn new(cancel: CancellationToken) -> Self {
        Self { cancel, seen: 0 }
    }

    /// Handle one interrupt. Returns `false` once the process should exit.
    fn on_signal(&mut self) -> bool {
        self.seen += 1;
        if self.seen == 1 {
            info!("interrupt received; stopping (press Ctrl-C again to exit now)");
            self.cancel.cancel();
            true
        } else {
            warn!("second interrupt; exiting");
            false
        }
    }
}

/// `--list` output: one task per line with its description.
fn print_task_list<C: Send + Sync + 'static, W: Write>(graph: &TaskGraph<C>, out: &mut W) -> io::Result<()> {
    let listing = graph.list();
    let width = listing.iter().map(|t| t.name.len()).max().unwrap_or(0);

    for task in listing {
        let description = task.description.as_deref().unwrap_or("");
        if task.prerequisites.is_empty() {
            writeln!(out, "treetask {:<width$}  # {description}", task.name)?;
        } else {
            writeln!(
                out,
                "treetask {:<width$}  # {description} (after: {})",
                task.name,
                task.prerequisites.join(", ")
            )?;
        }
    }
    Ok(())
}

/// `--dry-run` output: the order tasks would run in.
fn print_plan<W: Write>(plan: &[TaskName], out: &mut W) -> io::Result<()> {
    writeln!(out, "treetask dry-run")?;
    for (i, name) in plan.iter().enumerate() {
        writeln!(out, "  {}. {name}", i + 1)?;
    }
    debug!("dry-run complete (no execution)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_interrupt_cancels_and_second_asks_to_exit() {
        let cancel = CancellationToken::new();
        let mut interrupts = Interrupts::new(cancel.clone());

        assert!(interrupts.on_signal());
        assert!(cancel.is_cancelled());
        assert!(!interrupts.on_signal());
    }
}
