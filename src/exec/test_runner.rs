// src/exec/test_runner.rs

//! Resolution of the external test command.
//!
//! Priority for the command:
//! 1. `TEST_CMD` environment variable
//! 2. `[test].cmd` in the config
//! 3. the platform file opener (`xdg-open`, `open`, `start`)
//!
//! Priority for the target:
//! 1. `TEST` environment variable (used verbatim)
//! 2. `[test].target`, resolved against the project root

use std::path::Path;

use tracing::debug;

use crate::config::TestSection;
use crate::exec::runner::CommandSpec;

pub const TEST_CMD_ENV: &str = "TEST_CMD";
pub const TEST_TARGET_ENV: &str = "TEST";

/// Fully resolved test invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCommand {
    pub cmd: String,
    pub target: String,
}

impl TestCommand {
    pub fn resolve<E>(cfg: &TestSection, root: &Path, env: E) -> Self
    where
        E: Fn(&str) -> Option<String>,
    {
        let cmd = env(TEST_CMD_ENV)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| cfg.cmd.clone())
            .unwrap_or_else(|| platform_opener().to_string());

        let target = env(TEST_TARGET_ENV)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| root.join(&cfg.target).to_string_lossy().into_owned());

        debug!(cmd = %cmd, target = %target, "resolved test command");
        Self { cmd, target }
    }

    /// Invocation running `cmd` against the target.
    ///
    /// On Unix `cmd` is a shell fragment and the target is appended quoted.
    /// On Windows the target is handed to `cmd /C` as its own argument;
    /// cmd.exe has no escape for a `"` spliced into the line.
    pub fn to_spec(&self, cwd: &Path) -> CommandSpec {
        let spec = if cfg!(windows) {
            let words = shell_words::split(&self.cmd).unwrap_or_else(|_| vec![self.cmd.clone()]);
            CommandSpec::new("cmd").arg("/C").args(words).arg(&self.target)
        } else {
            CommandSpec::shell(format!("{} {}", self.cmd, shell_words::quote(&self.target)))
        };
        spec.cwd(cwd)
    }
}

/// Program used to "open" the test page when nothing else is configured.
pub fn platform_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "start \"\""
    } else {
        "xdg-open"
    }
}
