// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep, TaskRunState, TaskSpec};
use crate::errors::{Result, TreetaskError};
use crate::types::TaskMode;

use super::{TaskBody, TaskName, TaskOutcome};

/// One row of `--list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListing {
    pub name: TaskName,
    pub description: Option<String>,
    pub prerequisites: Vec<TaskName>,
    pub mode: TaskMode,
}

struct TaskEntry {
    spec: TaskSpec,
    description: Option<String>,
}

/// Named tasks with prerequisites, run against a shared context `C`.
///
/// Tasks are registered with [`define`](Self::define) and run with
/// [`invoke`](Self::invoke) / [`invoke_all`](Self::invoke_all). The first
/// invocation validates the graph and starts the session: from then on each
/// task runs at most once, no matter how many invocations need it, and no
/// more tasks can be defined.
pub struct TaskGraph<C> {
    ctx: Arc<C>,
    entries: Vec<TaskEntry>,
    bodies: HashMap<TaskName, Arc<dyn TaskBody<C>>>,
    scheduler: Option<Scheduler>,
    cancel: CancellationToken,
}

impl<C> fmt::Debug for TaskGraph<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.entries.iter().map(|e| &e.spec.name).collect::<Vec<_>>())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<C: Send + Sync + 'static> TaskGraph<C> {
    pub fn new(ctx: Arc<C>) -> Self {
        Self {
            ctx,
            entries: Vec::new(),
            bodies: HashMap::new(),
            scheduler: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Token cancelled when a task fails, so background tasks watching it
    /// can wind down before the session reports the failure.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn context(&self) -> &Arc<C> {
        &self.ctx
    }

    /// Register a blocking task: nothing else is dispatched until its body
    /// completes.
    pub fn define<B>(&mut self, name: &str, prerequisites: &[&str], body: B) -> Result<&mut Self>
    where
        B: TaskBody<C>,
    {
        self.register(TaskSpec::new(name, prerequisites.iter().copied()), body)
    }

    /// Register a background task: it is spawned and the graph moves on.
    pub fn define_background<B>(
        &mut self,
        name: &str,
        prerequisites: &[&str],
        body: B,
    ) -> Result<&mut Self>
    where
        B: TaskBody<C>,
    {
        self.register(
            TaskSpec::new(name, prerequisites.iter().copied()).background(),
            body,
        )
    }

    fn register<B>(&mut self, spec: TaskSpec, body: B) -> Result<&mut Self>
    where
        B: TaskBody<C>,
    {
        if self.scheduler.is_some() {
            return Err(TreetaskError::ConfigError(format!(
                "cannot define task '{}' after the session has started",
                spec.name
            )));
        }
        if self.bodies.contains_key(&spec.name) {
            return Err(TreetaskError::ConfigError(format!(
                "task '{}' is defined more than once",
                spec.name
            )));
        }

        debug!(task = %spec.name, deps = ?spec.deps, mode = %spec.mode, "defined task");
        self.bodies.insert(spec.name.clone(), Arc::new(body));
        self.entries.push(TaskEntry {
            spec,
            description: None,
        });
        Ok(self)
    }

    /// Attach a one-line description shown by `--list`.
    pub fn describe(&mut self, name: &str, description: impl Into<String>) -> Result<&mut Self> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.spec.name == name)
            .ok_or_else(|| TreetaskError::TaskNotFound(name.to_string()))?;
        entry.description = Some(description.into());
        Ok(self)
    }

    /// Registered tasks in definition order.
    pub fn list(&self) -> Vec<TaskListing> {
        self.entries
            .iter()
            .map(|e| TaskListing {
                name: e.spec.name.clone(),
                description: e.description.clone(),
                prerequisites: e.spec.deps.clone(),
                mode: e.spec.mode,
            })
            .collect()
    }

    /// Depth-first execution order for `targets`, without running anything
    /// and regardless of what already ran.
    pub fn plan<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<TaskName>> {
        match &self.scheduler {
            Some(scheduler) => scheduler.graph().plan_for_all(targets),
            None => Scheduler::from_specs(&self.specs())?
                .graph()
                .plan_for_all(targets),
        }
    }

    /// Session state of `task`; `None` for unknown tasks or before the
    /// session has started.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        self.scheduler.as_ref()?.run_state_of(task)
    }

    pub async fn invoke(&mut self, target: &str) -> Result<()> {
        self.invoke_all(&[target]).await
    }

    /// Run `targets` and everything they need, in one merged depth-first
    /// order, skipping tasks that already completed in this session.
    ///
    /// After the first failure nothing new is dispatched; tasks already
    /// running are awaited and the first error is returned.
    pub async fn invoke_all<S: AsRef<str>>(&mut self, targets: &[S]) -> Result<()> {
        if self.scheduler.is_none() {
            self.scheduler = Some(Scheduler::from_specs(&self.specs())?);
        }
        let Some(scheduler) = self.scheduler.as_mut() else {
            return Err(TreetaskError::ConfigError("task scheduler unavailable".to_string()));
        };

        let first = scheduler.begin_all(targets)?;
        let mut dispatch = Dispatch {
            scheduler,
            bodies: &self.bodies,
            ctx: &self.ctx,
            cancel: &self.cancel,
            running: JoinSet::new(),
            names: HashMap::new(),
            first_error: None,
        };
        dispatch.run(first).await
    }

    fn specs(&self) -> Vec<TaskSpec> {
        self.entries.iter().map(|e| e.spec.clone()).collect()
    }
}

/// Async shell around the scheduler for one invocation.
struct Dispatch<'a, C> {
    scheduler: &'a mut Scheduler,
    bodies: &'a HashMap<TaskName, Arc<dyn TaskBody<C>>>,
    ctx: &'a Arc<C>,
    cancel: &'a CancellationToken,
    running: JoinSet<Result<()>>,
    names: HashMap<Id, TaskName>,
    first_error: Option<TreetaskError>,
}

impl<C: Send + Sync + 'static> Dispatch<'_, C> {
    async fn run(&mut self, first: SchedulerStep) -> Result<()> {
        self.spawn_all(first.newly_scheduled);

        while let Some(joined) = self.running.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(join_err) => (
                    join_err.id(),
                    Err(TreetaskError::Other(anyhow!("task body did not finish: {join_err}"))),
                ),
            };

            let Some(name) = self.names.remove(&id) else {
                warn!(?id, "completion for an untracked task; ignoring");
                continue;
            };

            match result {
                Ok(()) => {
                    let step = self.scheduler.step_completion(&name, TaskOutcome::Success);
                    if self.first_error.is_none() {
                        self.spawn_all(step.newly_scheduled);
                    }
                }
                Err(err) => {
                    self.scheduler.step_completion(&name, TaskOutcome::Failed);
                    self.record_failure(&name, err);
                }
            }
        }

        match self.first_error.take() {
            Some(err) => Err(err),
            None => {
                if !self.scheduler.is_idle() {
                    warn!("tasks left pending with nothing running; dropping them");
                    self.scheduler.halt();
                }
                Ok(())
            }
        }
    }

    fn spawn_all(&mut self, tasks: Vec<ScheduledTask>) {
        for task in tasks {
            let Some(body) = self.bodies.get(&task.name) else {
                // Unreachable with a graph built from the same entries.
                self.scheduler.step_completion(&task.name, TaskOutcome::Failed);
                self.record_failure(
                    &task.name,
                    TreetaskError::TaskNotFound(task.name.clone()),
                );
                continue;
            };

            let fut = body.call(Arc::clone(self.ctx));
            let name = task.name.clone();
            let handle = self.running.spawn(async move {
                let started = Instant::now();
                let result = fut.await;
                debug!(
                    task = %name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    ok = result.is_ok(),
                    "task body finished"
                );
                result
            });
            self.names.insert(handle.id(), task.name);
        }
    }

    fn record_failure(&mut self, task: &str, err: TreetaskError) {
        error!(task = %task, error = %err, "task failed");
        if self.first_error.is_some() {
            return;
        }

        let dropped = self.scheduler.halt();
        if !dropped.is_empty() {
            info!(tasks = ?dropped, "not running remaining tasks");
        }
        self.cancel.cancel();
        self.first_error = Some(TreetaskError::TaskFailed {
            task: task.to_string(),
            source: Box::new(err),
        });
    }
}
