// src/pipeline/lint.rs

//! Lint stage: collect source files under the library directory and hand
//! them to the external checker in one invocation.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::errors::{Result, TreetaskError};
use crate::exec::runner::{CommandRunner, CommandSpec};
use crate::lintrc::{IgnoreSet, Reporter, ResolvedLintRc};
use crate::pipeline::classify::{Classifier, FileClass};
use crate::walk::{Visit, Walker};

/// Checker exit code meaning "ran fine, reported findings".
pub const FINDINGS_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintOutcome {
    Clean,
    Findings,
}

/// Map a checker exit code onto the lint outcome. Only 0 and 1 are
/// recognised; anything else (including death by signal) fails the task.
pub fn interpret_exit(program: &str, code: Option<i32>) -> Result<LintOutcome> {
    match code {
        Some(0) => Ok(LintOutcome::Clean),
        Some(FINDINGS_EXIT_CODE) => Ok(LintOutcome::Findings),
        other => Err(TreetaskError::CommandFailed {
            program: program.to_string(),
            code: other.unwrap_or(-1),
        }),
    }
}

/// Checker invocation settings from `[lint]`.
#[derive(Debug, Clone)]
pub struct Checker {
    pub cmd: String,
    pub args: Vec<String>,
    pub config_flag: String,
    /// Always passed after the collected sources (e.g. the build file).
    pub extra_files: Vec<PathBuf>,
}

pub struct LintStage {
    walker: Walker,
    classifier: Classifier,
    runner: Arc<dyn CommandRunner>,
    checker: Checker,
    root: PathBuf,
    lib_dir: PathBuf,
    ignore: IgnoreSet,
    reporter: Reporter,
    rc: ResolvedLintRc,
}

impl LintStage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        walker: Walker,
        classifier: Classifier,
        runner: Arc<dyn CommandRunner>,
        checker: Checker,
        root: impl Into<PathBuf>,
        lib_dir: impl Into<PathBuf>,
        ignore: IgnoreSet,
        reporter: Reporter,
        rc: ResolvedLintRc,
    ) -> Self {
        Self {
            walker,
            classifier,
            runner,
            checker,
            root: root.into(),
            lib_dir: lib_dir.into(),
            ignore,
            reporter,
            rc,
        }
    }

    /// Source files under the library directory, sorted, minus minified
    /// artifacts and anything the ignore file names.
    pub async fn collect_targets(&self) -> Result<Vec<PathBuf>> {
        let classifier = self.classifier.clone();
        let ignore = self.ignore.clone();
        let lib_dir = self.lib_dir.clone();
        let found: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
        let sink = Arc::clone(&found);

        let summary = self
            .walker
            .walk(self.lib_dir.clone(), move |visit: Visit| {
                if visit.entry.is_err() {
                    return;
                }
                let is_source = matches!(
                    classifier.classify(&lib_dir, &visit.path),
                    FileClass::Source { .. }
                );
                if !is_source {
                    return;
                }
                if ignore.is_ignored(&visit.path) {
                    debug!(path = ?visit.path, "ignored by lint ignore file");
                    return;
                }
                sink.lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .push(visit.path);
            })
            .await;

        summary.into_result()?;

        let mut targets = std::mem::take(&mut *found.lock().unwrap_or_else(|p| p.into_inner()));
        targets.sort();
        Ok(targets)
    }

    /// Run the checker over every collected target plus the extra files.
    pub async fn run(&self) -> Result<LintOutcome> {
        let mut targets = self.collect_targets().await?;
        targets.extend(self.checker.extra_files.iter().map(|f| self.root.join(f)));

        if targets.is_empty() {
            info!("nothing to lint");
            return Ok(LintOutcome::Clean);
        }

        // The checker reads the merged config from disk; the file must
        // outlive the process.
        let rc_file = if self.rc.config.is_empty() {
            None
        } else {
            Some(write_rc(&self.rc)?)
        };

        let spec = self.build_spec(&targets, rc_file.as_ref().map(|f| f.path()));
        info!(files = targets.len(), "linting");

        let output = self.runner.run(spec).await?;
        let outcome = interpret_exit(&self.checker.cmd, output.code)?;
        if outcome == LintOutcome::Findings {
            warn!("lint reported findings");
        }
        Ok(outcome)
    }

    fn build_spec(&self, targets: &[PathBuf], rc_path: Option<&Path>) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.checker.cmd)
            .args(self.checker.args.iter().cloned())
            .args(self.reporter.checker_args())
            .cwd(&self.root);

        if let Some(path) = rc_path {
            spec = spec
                .arg(&self.checker.config_flag)
                .arg(path.display().to_string());
        }

        spec.args(targets.iter().map(|p| p.display().to_string()))
    }
}

fn write_rc(rc: &ResolvedLintRc) -> Result<NamedTempFile> {
    let json = rc.to_json()?;
    let mut file = tempfile::Builder::new()
        .prefix("treetask-lintrc-")
        .suffix(".json")
        .tempfile()
        .context("creating merged lint config")?;
    file.write_all(json.as_bytes())
        .context("writing merged lint config")?;
    file.flush().context("flushing merged lint config")?;
    debug!(path = ?file.path(), sources = ?rc.sources, "wrote merged lint config");
    Ok(file)
}
