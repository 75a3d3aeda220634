// src/tasks/artifacts.rs

use std::sync::Arc;

use tracing::info;

use crate::config::DocsSection;
use crate::engine::BuildSession;
use crate::errors::{Result, TreetaskError};
use crate::exec::{run_checked, CommandSpec};
use crate::pipeline::minify::{CommandMinifier, MinifyStage};

/// Overrides the extracted version for `docs`.
pub const DOCS_VERSION_ENV: &str = "VERSION";
/// Output directory for `docs`; takes precedence over `[docs].dir`.
pub const DOCS_DIR_ENV: &str = "DIR";

pub(super) async fn version(session: Arc<BuildSession>) -> Result<()> {
    session.version().await?;
    Ok(())
}

pub(super) async fn minify(session: Arc<BuildSession>) -> Result<()> {
    let cfg = session.config();
    let version = session.version().await?;

    let minifier = CommandMinifier::new(
        Arc::clone(session.runner()),
        cfg.minify.cmd.clone(),
        cfg.minify.args.clone(),
    );
    let stage = MinifyStage::new(
        session.walker().clone(),
        session.classifier()?,
        Arc::new(minifier),
        cfg.lib_dir(),
        cfg.output_dir(),
    );

    let report = stage.run(&session.banner(version)).await?;
    info!(
        deleted = report.deleted.len(),
        generated = report.generated.len(),
        "minify finished"
    );
    Ok(())
}

pub(super) async fn docs(session: Arc<BuildSession>) -> Result<()> {
    let cfg = session.config();

    let version = match session.env_var(DOCS_VERSION_ENV).filter(|v| !v.trim().is_empty()) {
        Some(v) => v,
        None => session.version().await?.to_string(),
    };

    let dir = session
        .env_var(DOCS_DIR_ENV)
        .filter(|d| !d.trim().is_empty())
        .or_else(|| cfg.docs.dir.clone())
        .ok_or_else(|| {
            TreetaskError::ConfigError(format!(
                "docs needs an output directory: set {DOCS_DIR_ENV} or [docs].dir"
            ))
        })?;

    let spec = CommandSpec::new(&cfg.docs.cmd)
        .args(docs_args(&cfg.docs, &dir, &version))
        .cwd(session.root());
    run_checked(session.runner().as_ref(), spec).await?;

    info!(dir = %dir, version = %version, "docs generated");
    Ok(())
}

/// `[docs].args` with `{dir}` and `{version}` substituted.
pub fn docs_args(section: &DocsSection, dir: &str, version: &str) -> Vec<String> {
    section
        .args
        .iter()
        .map(|arg| arg.replace("{dir}", dir).replace("{version}", version))
        .collect()
}
