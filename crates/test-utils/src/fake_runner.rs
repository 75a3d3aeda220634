use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use treetask::errors::TreetaskError;
use treetask::exec::{CommandFuture, CommandOutput, CommandRunner, CommandSpec};

type StdinTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Default)]
struct Inner {
    calls: Vec<CommandSpec>,
    /// One-shot exit codes per program, consumed in order.
    queued: HashMap<String, VecDeque<i32>>,
    /// Exit code used once a program's queue is empty.
    fallback: HashMap<String, i32>,
    /// Programs that fail to start at all.
    unspawnable: HashSet<String>,
    transforms: HashMap<String, StdinTransform>,
}

/// A fake command runner that:
/// - records every spec it is asked to run
/// - returns scripted exit codes per program (default 0)
/// - produces stdout from stdin through an optional per-program transform
#[derive(Clone, Default)]
pub struct FakeRunner {
    inner: Arc<Mutex<Inner>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next call to `program` exits with `code`; later calls fall back.
    pub fn exit_once(&self, program: &str, code: i32) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .queued
            .entry(program.to_string())
            .or_default()
            .push_back(code);
        self
    }

    /// Every call to `program` without a queued code exits with `code`.
    pub fn always_exit(&self, program: &str, code: i32) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .fallback
            .insert(program.to_string(), code);
        self
    }

    pub fn fail_to_spawn(&self, program: &str) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .unspawnable
            .insert(program.to_string());
        self
    }

    /// Captured stdout of `program` is `f(stdin)`.
    pub fn transform_stdin<F>(&self, program: &str, f: F) -> &Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.inner
            .lock()
            .unwrap()
            .transforms
            .insert(program.to_string(), Arc::new(f));
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.program).collect()
    }

    fn respond(&self, spec: CommandSpec) -> Result<CommandOutput, TreetaskError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(spec.clone());

        if inner.unspawnable.contains(&spec.program) {
            return Err(TreetaskError::Other(anyhow::anyhow!(
                "spawning `{}`: no such file or directory",
                spec.program
            )));
        }

        let queued = inner
            .queued
            .get_mut(&spec.program)
            .and_then(VecDeque::pop_front);
        let code = queued
            .or_else(|| inner.fallback.get(&spec.program).copied())
            .unwrap_or(0);

        let stdout = match (spec.capture_stdout, inner.transforms.get(&spec.program)) {
            (true, Some(f)) => f(spec.stdin.as_deref().unwrap_or("")),
            _ => String::new(),
        };

        Ok(CommandOutput {
            code: Some(code),
            stdout,
        })
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, spec: CommandSpec) -> CommandFuture<'_> {
        let result = self.respond(spec);
        Box::pin(async move { result })
    }
}
