// src/tasks/check.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, SecondsFormat};
use tracing::{info, warn};

use crate::engine::BuildSession;
use crate::errors::{Result, TreetaskError};
use crate::exec::{run_checked, TestCommand};
use crate::lintrc::{load_ignore, IgnoreSet, ResolvedLintRc};
use crate::pipeline::lint::{Checker, LintOutcome, LintStage};
use crate::watch::{Poller, WatchFilter};

pub(super) async fn lint(session: Arc<BuildSession>) -> Result<()> {
    let cfg = session.config();
    let fs = Arc::clone(session.fs());
    let overrides = session.lint_overrides();

    let rc = ResolvedLintRc::resolve(
        Arc::clone(&fs),
        overrides.custom_config.as_deref(),
        session.home_dir(),
        session.root(),
        &cfg.lint.rc_file,
    )?;
    overrides.reporter.check(fs.as_ref())?;

    let patterns = load_ignore(fs.as_ref(), &cfg.path(&cfg.lint.ignore_file))?;
    let ignore = IgnoreSet::new(session.root(), &patterns)?;

    let checker = Checker {
        cmd: cfg.lint.cmd.clone(),
        args: cfg.lint.args.clone(),
        config_flag: cfg.lint.config_flag.clone(),
        extra_files: cfg.lint.extra_files.iter().map(PathBuf::from).collect(),
    };

    let stage = LintStage::new(
        session.walker().clone(),
        session.classifier()?,
        Arc::clone(session.runner()),
        checker,
        session.root(),
        cfg.lib_dir(),
        ignore,
        overrides.reporter.clone(),
        rc,
    );

    match stage.run().await? {
        LintOutcome::Clean => info!("lint clean"),
        LintOutcome::Findings => info!("lint finished with findings"),
    }
    Ok(())
}

pub(super) async fn test(session: Arc<BuildSession>) -> Result<()> {
    let cmd = resolve_test_command(&session);
    run_checked(session.runner().as_ref(), cmd.to_spec(session.root())).await?;
    Ok(())
}

/// Watch the project and rerun the tests on every change until the session
/// is cancelled. A failing test run is reported and watching continues.
pub(super) async fn autotest(session: Arc<BuildSession>) -> Result<()> {
    let cfg = session.config();
    let filter = WatchFilter::from_section(&cfg.watch, session.classifier()?)?;
    let interval = Duration::from_millis(cfg.watch.interval_ms);
    let mut poller = Poller::new(session.walker().clone(), session.root(), filter, interval);

    info!(interval_ms = cfg.watch.interval_ms, "watching for changes");

    let cycles = poller
        .run(session.cancel_token().clone(), |changed| {
            let session = Arc::clone(&session);
            async move {
                info!(
                    files = changed.len(),
                    "Running at {}",
                    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
                );
                let cmd = resolve_test_command(&session);
                match run_checked(session.runner().as_ref(), cmd.to_spec(session.root())).await {
                    Ok(_) => {}
                    Err(TreetaskError::CommandFailed { program, code }) => {
                        warn!(program = %program, code, "test run failed");
                    }
                    Err(err) => return Err(err),
                }
                info!("Waiting for a change.");
                Ok(())
            }
        })
        .await?;

    info!(cycles, "autotest stopped");
    Ok(())
}

fn resolve_test_command(session: &BuildSession) -> TestCommand {
    TestCommand::resolve(&session.config().test, session.root(), |key| {
        session.env_var(key)
    })
}
