// src/config/validate.rs

use std::path::Path;

use globset::Glob;

use crate::config::model::RawConfigFile;
use crate::errors::{Result, TreetaskError};

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - `project.lib_dir`, `project.version_file` and every command are non-empty
/// - `project.source_extension` is a bare extension (no leading dot)
/// - `minify.output_dir` is relative
/// - `watch.interval_ms >= 1`
/// - every watch include/exclude glob compiles
///
/// It does **not** check that the referenced files or tools exist; that is
/// discovered (and reported) by the task that needs them.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_project(cfg)?;
    validate_commands(cfg)?;
    validate_watch(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> TreetaskError {
    TreetaskError::ConfigError(msg.into())
}

fn validate_project(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project.lib_dir.trim().is_empty() {
        return Err(config_error("[project].lib_dir must not be empty"));
    }
    if cfg.project.version_file.trim().is_empty() {
        return Err(config_error("[project].version_file must not be empty"));
    }

    let ext = cfg.project.source_extension.trim();
    if ext.is_empty() || ext.starts_with('.') {
        return Err(config_error(format!(
            "[project].source_extension must be a bare extension like \"js\" (got {:?})",
            cfg.project.source_extension
        )));
    }

    if Path::new(&cfg.minify.output_dir).is_absolute() {
        return Err(config_error(format!(
            "[minify].output_dir must be relative to lib_dir (got {:?})",
            cfg.minify.output_dir
        )));
    }

    Ok(())
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    let commands = [
        ("[minify].cmd", &cfg.minify.cmd),
        ("[lint].cmd", &cfg.lint.cmd),
        ("[docs].cmd", &cfg.docs.cmd),
        ("[vcs].program", &cfg.vcs.program),
    ];

    for (field, value) in commands {
        if value.trim().is_empty() {
            return Err(config_error(format!("{field} must not be empty")));
        }
    }

    if let Some(cmd) = &cfg.test.cmd {
        if cmd.trim().is_empty() {
            return Err(config_error("[test].cmd must not be empty when set"));
        }
    }

    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.interval_ms == 0 {
        return Err(config_error("[watch].interval_ms must be >= 1 (got 0)"));
    }

    let include = cfg.watch.include.as_deref().unwrap_or_default();
    if cfg.watch.include.is_some() && include.is_empty() {
        return Err(config_error("[watch].include must list at least one glob"));
    }

    for pat in include.iter().chain(cfg.watch.exclude.iter()) {
        Glob::new(pat)
            .map_err(|e| config_error(format!("invalid watch glob {pat:?}: {e}")))?;
    }

    Ok(())
}
