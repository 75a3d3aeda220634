// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, TaskInfo, TaskRunState, TaskSpec};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::{Result, TreetaskError};

/// Scheduler holds the immutable graph plus mutable per-session state.
///
/// It is a pure state machine: it never runs anything itself. It is
/// responsible for:
/// - remembering which tasks were requested in this session
/// - deciding when a requested task is ready (prerequisites satisfied)
/// - marking tasks as succeeded or failed
/// - failing pending dependents when a task fails
///
/// State is session-scoped: a task that finished is never dispatched again,
/// however many later requests name it.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    next_rank: u64,
}

impl Scheduler {
    /// Build a scheduler, validating the graph.
    pub fn from_specs(specs: &[TaskSpec]) -> Result<Self> {
        let graph = DagGraph::from_specs(specs)?;
        let tasks = specs
            .iter()
            .map(|spec| (spec.name.clone(), TaskInfo::from_spec(spec)))
            .collect();

        Ok(Self {
            graph,
            tasks,
            next_rank: 0,
        })
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Returns `true` if no task is pending or running.
    pub fn is_idle(&self) -> bool {
        ReadOnlyStateManager::new(&self.tasks).all_tasks_settled()
    }

    /// Read-only view of the given task's state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Whether the prerequisites of `task` currently let it start.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(ReadOnlyStateManager::new(&self.tasks).deps_satisfied_for_info(info))
    }

    /// Task names in declaration order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    /// Depth-first plan for `target`, ignoring session state.
    pub fn plan_for(&self, target: &str) -> Result<Vec<TaskName>> {
        self.graph.plan_for(target)
    }

    /// Request `target` (and, transitively, its prerequisites).
    pub fn begin(&mut self, target: &str) -> Result<SchedulerStep> {
        self.begin_all(&[target])
    }

    /// Request several targets at once. Their plans are merged in order, so
    /// every prerequisite of the first target is ranked before anything
    /// only the second one needs.
    ///
    /// Fails without changing any state if a target is unknown or if the
    /// merged plan contains a task that already failed in this session.
    pub fn begin_all<S: AsRef<str>>(&mut self, targets: &[S]) -> Result<SchedulerStep> {
        let plan = self.graph.plan_for_all(targets)?;

        if let Some(failed) = plan
            .iter()
            .find(|name| self.state(name) == Some(RunState::DoneFailed))
        {
            return Err(TreetaskError::TaskAlreadyFailed(failed.clone()));
        }

        debug!(plan = ?plan, "scheduler: requesting tasks");

        let mut manager = StateManager::new(&self.graph, &mut self.tasks);
        manager.mark_plan_pending(&plan, &mut self.next_rank);
        let newly_scheduled = manager.collect_new_ready_tasks();

        Ok(SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            idle: self.is_idle(),
        })
    }

    /// Record that a dispatched task finished.
    ///
    /// A success dispatches whatever it unlocked. A failure marks pending
    /// dependents failed and dispatches nothing.
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let mut newly_scheduled = Vec::new();
        let mut newly_failed = Vec::new();

        match self.tasks.get_mut(task) {
            Some(info) if info.run_state == Some(RunState::Running) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    debug!(task = %info.name, "task completed successfully");
                    let mut manager = StateManager::new(&self.graph, &mut self.tasks);
                    newly_scheduled.extend(manager.collect_new_ready_tasks());
                }
                TaskOutcome::Failed => {
                    info.run_state = Some(RunState::DoneFailed);
                    warn!(task = %info.name, "task failed; failing pending dependents");
                    newly_failed.push(info.name.clone());
                    let mut manager = StateManager::new(&self.graph, &mut self.tasks);
                    newly_failed.extend(manager.mark_dependents_failed(task));
                }
            },
            Some(info) => {
                warn!(task = %task, state = ?info.run_state, "completion for a task that is not running; ignoring");
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        let idle = self.is_idle();
        if idle {
            info!("scheduler: nothing pending or running");
        }

        SchedulerStep {
            newly_scheduled,
            newly_failed,
            idle,
        }
    }

    /// Stop dispatching: every pending task goes back to "not requested".
    /// Running tasks are unaffected and still report completion.
    pub fn halt(&mut self) -> Vec<TaskName> {
        let reset = StateManager::new(&self.graph, &mut self.tasks).reset_pending();
        if !reset.is_empty() {
            debug!(tasks = ?reset, "scheduler: dropped pending tasks");
        }
        reset
    }

    fn state(&self, task: &str) -> Option<RunState> {
        self.tasks.get(task).and_then(|info| info.run_state)
    }
}
