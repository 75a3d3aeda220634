// src/exec/runner.rs

//! Pluggable external-process runner.
//!
//! Task bodies talk to a `CommandRunner` instead of `tokio::process`
//! directly. Production code uses [`ProcessRunner`]; tests provide a fake
//! that records invocations and returns scripted exit codes.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{Result, TreetaskError};

/// Description of one external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Text fed to the child's stdin, which is closed afterwards.
    pub stdin: Option<String>,
    /// Capture stdout instead of passing it through to the user.
    pub capture_stdout: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
            capture_stdout: false,
        }
    }

    /// Run `line` through the platform shell.
    pub fn shell(line: impl Into<String>) -> Self {
        if cfg!(windows) {
            Self::new("cmd").arg("/C").arg(line)
        } else {
            Self::new("sh").arg("-c").arg(line)
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn capture_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `None` if the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured stdout; empty unless `capture_stdout` was set.
    pub stdout: String,
}

impl CommandOutput {
    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit code with signals mapped to `-1`.
    pub fn code_or_signal(&self) -> i32 {
        self.code.unwrap_or(-1)
    }
}

pub type CommandFuture<'a> = Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + 'a>>;

/// Trait abstracting how external commands are executed.
///
/// A non-zero exit is *not* an error at this level; callers decide what an
/// exit code means (see [`run_checked`]). Errors are reserved for failing
/// to start or talk to the process.
pub trait CommandRunner: Send + Sync {
    fn run(&self, spec: CommandSpec) -> CommandFuture<'_>;
}

/// Run `spec` and fail with [`TreetaskError::CommandFailed`] on any
/// non-zero exit.
pub async fn run_checked(runner: &dyn CommandRunner, spec: CommandSpec) -> Result<CommandOutput> {
    let program = spec.program.clone();
    let output = runner.run(spec).await?;
    if output.success() {
        Ok(output)
    } else {
        Err(TreetaskError::CommandFailed {
            program,
            code: output.code_or_signal(),
        })
    }
}

/// Runner backed by `tokio::process::Command`.
///
/// stderr is always passed through; stdout is passed through unless the
/// spec asks for it to be captured.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, spec: CommandSpec) -> CommandFuture<'_> {
        Box::pin(async move { run_process(spec).await })
    }
}

async fn run_process(spec: CommandSpec) -> Result<CommandOutput> {
    info!(cmd = %spec, "running external command");

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(if spec.capture_stdout {
            Stdio::piped()
        } else {
            Stdio::inherit()
        })
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning `{}`", spec.program))?;

    // Feed stdin from a separate task so a child that writes a lot of output
    // before draining its input cannot deadlock against us.
    let writer = match (spec.stdin.clone(), child.stdin.take()) {
        (Some(input), Some(mut stdin)) => Some(tokio::spawn(async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await?;
            Ok::<(), io::Error>(())
        })),
        _ => None,
    };

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for `{}`", spec.program))?;

    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) if output.status.success() => {
                return Err(anyhow::Error::from(err)
                    .context(format!("writing stdin of `{}`", spec.program))
                    .into());
            }
            Ok(Err(err)) => {
                debug!(cmd = %spec, error = %err, "stdin write failed for a failing process");
            }
            Err(join_err) => {
                warn!(cmd = %spec, error = %join_err, "stdin writer task failed");
            }
        }
    }

    let code = output.status.code();
    debug!(cmd = %spec, exit_code = ?code, "external command exited");

    Ok(CommandOutput {
        code,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
    })
}
