// src/dag/task_info.rs

//! Task metadata and per-session state.

use crate::engine::TaskName;
use crate::types::TaskMode;

/// Per-session state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Requested in this session, waiting on prerequisites.
    Pending,
    /// Dispatched and not yet finished.
    Running,
    /// Body finished successfully. Terminal for the session.
    DoneSuccess,
    /// Body failed, or a prerequisite did. Terminal for the session.
    DoneFailed,
}

/// Public, read-only view of a task's per-session state.
///
/// This is exposed for tests and diagnostics without leaking the internal
/// `RunState` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task has not been requested in this session.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

/// Static shape of a task: what the scheduler needs to know, without the
/// body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: TaskName,
    pub deps: Vec<TaskName>,
    pub mode: TaskMode,
}

impl TaskSpec {
    pub fn new<N, D, S>(name: N, deps: D) -> Self
    where
        N: Into<TaskName>,
        D: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Self {
            name: name.into(),
            deps: deps.into_iter().map(Into::into).collect(),
            mode: TaskMode::Blocking,
        }
    }

    pub fn background(mut self) -> Self {
        self.mode = TaskMode::Background;
        self
    }
}

/// Static task information plus per-session state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    pub mode: TaskMode,
    /// Direct prerequisites, in declaration order.
    pub deps: Vec<TaskName>,
    /// Position in the session's depth-first plan; lower runs first.
    pub rank: Option<u64>,
    pub run_state: Option<RunState>,
}

impl TaskInfo {
    pub fn from_spec(spec: &TaskSpec) -> Self {
        Self {
            name: spec.name.clone(),
            mode: spec.mode,
            deps: spec.deps.clone(),
            rank: None,
            run_state: None,
        }
    }

    /// Whether dependents may start. A background task stops holding its
    /// dependents back as soon as it is dispatched.
    pub fn satisfies_dependents(&self) -> bool {
        match self.run_state {
            Some(RunState::DoneSuccess) => true,
            Some(RunState::Running) => self.mode == TaskMode::Background,
            _ => false,
        }
    }
}

/// A task the scheduler wants the runtime to start now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub mode: TaskMode,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo) -> Self {
        Self {
            name: info.name.clone(),
            mode: info.mode,
        }
    }
}
