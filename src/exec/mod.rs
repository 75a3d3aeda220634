// src/exec/mod.rs

//! External process execution layer.
//!
//! - [`runner`] holds the `CommandRunner` trait and the production
//!   [`ProcessRunner`] built on `tokio::process::Command`.
//! - [`vcs`] runs the fixed version-control sequence used by `tag`.
//! - [`test_runner`] resolves the environment-configurable test command.

pub mod runner;
pub mod test_runner;
pub mod vcs;

pub use runner::{
    run_checked, CommandFuture, CommandOutput, CommandRunner, CommandSpec, ProcessRunner,
};
pub use test_runner::TestCommand;
pub use vcs::tag_release;
