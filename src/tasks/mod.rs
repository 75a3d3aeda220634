// src/tasks/mod.rs

//! Built-in tasks, registered on a [`TaskGraph`] over a [`BuildSession`].

use std::sync::Arc;

use crate::engine::{BuildSession, TaskGraph};
use crate::errors::Result;

mod artifacts;
mod check;
mod publish;

pub use artifacts::{docs_args, DOCS_DIR_ENV, DOCS_VERSION_ENV};

pub const VERSION: &str = "version";
pub const MINIFY: &str = "minify";
pub const LINT: &str = "lint";
pub const TEST: &str = "test";
pub const AUTOTEST: &str = "autotest";
pub const TAG: &str = "tag";
pub const RELEASE: &str = "release";
pub const DOCS: &str = "docs";

/// The standard task set.
pub fn builtin_graph(session: Arc<BuildSession>) -> Result<TaskGraph<BuildSession>> {
    let cancel = session.cancel_token().clone();
    let mut graph = TaskGraph::new(session).with_cancellation(cancel);

    graph
        .define(VERSION, &[], artifacts::version)?
        .describe(VERSION, "Pull the current version from the version file")?
        .define(MINIFY, &[VERSION], artifacts::minify)?
        .describe(MINIFY, "Minify every source module into versioned and latest artifacts")?
        .define(LINT, &[], check::lint)?
        .describe(LINT, "Check sources with the lint checker")?
        .define(TEST, &[], check::test)?
        .describe(TEST, "Run the test command against the test target")?
        .define_background(AUTOTEST, &[], check::autotest)?
        .describe(AUTOTEST, "Rerun the tests whenever a watched file changes")?
        .define(TAG, &[VERSION], publish::tag)?
        .describe(TAG, "Commit, tag and push the current version")?
        .define(RELEASE, &[MINIFY, TAG], publish::release)?
        .describe(RELEASE, "Minify, then tag the release")?
        .define(DOCS, &[VERSION], artifacts::docs)?
        .describe(DOCS, "Generate the docs for the current version into DIR")?;

    Ok(graph)
}
