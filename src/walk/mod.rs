// src/walk/mod.rs

//! Asynchronous recursive tree walker with fan-out/fan-in completion.
//!
//! - [`fan_in`] holds the per-walk wait-group ([`FanIn`]) and the RAII
//!   branch token ([`Release`]) handed to file callbacks.
//! - [`walker`] holds the traversal itself ([`Walker`]).
//!
//! Every file-touching pipeline stage (minify, lint, the watch loop) is a
//! callback composed over a walk.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use thiserror::Error;

pub mod fan_in;
pub mod walker;

pub use fan_in::{FanIn, Release};
pub use walker::{FileEntry, Visit, WalkSummary, Walker};

/// Failure attached to a single path during a walk.
///
/// Stored as a rendered message so it can be cloned into both the file
/// callback and the walk summary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path:?}: {message}")]
pub struct WalkError {
    pub path: PathBuf,
    pub message: String,
}

impl WalkError {
    pub fn new(path: &Path, err: &anyhow::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            message: format!("{err:#}"),
        }
    }

    pub fn msg(path: &Path, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Run a blocking filesystem call on Tokio's blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(res) => res,
        Err(join_err) => Err(anyhow!("filesystem worker failed: {join_err}")),
    }
}
