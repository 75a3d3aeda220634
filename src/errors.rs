// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::walk::WalkError;

#[derive(Error, Debug)]
pub enum TreetaskError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A checker config, ignore file or reporter could not be read or parsed.
    #[error("Error opening config file {path:?}: {message}")]
    LintConfig { path: PathBuf, message: String },

    #[error("no VERSION assignment found in {path:?}")]
    VersionNotFound { path: PathBuf },

    #[error("`{program}` exited with status {code}")]
    CommandFailed { program: String, code: i32 },

    #[error("traversal error: {0}")]
    Walk(#[from] WalkError),

    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        source: Box<TreetaskError>,
    },

    #[error("task '{0}' already failed in this session")]
    TaskAlreadyFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TreetaskError>;
