// src/pipeline/mod.rs

//! File-processing stages built on the tree walker.
//!
//! - [`classify`] decides what a file under the library root is.
//! - [`version`] scrapes the version token out of the version file.
//! - [`minify`] deletes stale artifacts, then regenerates them.
//! - [`lint`] runs the external checker over the collected sources.

pub mod classify;
pub mod lint;
pub mod minify;
pub mod version;

pub use classify::{Classifier, FileClass};
pub use lint::{interpret_exit, Checker, LintOutcome, LintStage};
pub use minify::{artifact_names, Banner, CommandMinifier, Minifier, MinifyReport, MinifyStage};
pub use version::{extract_version, read_version, VersionToken};
