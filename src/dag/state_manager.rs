// src/dag/state_manager.rs

//! Per-session state transitions for tasks in the scheduler.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::dag::DagGraph;
use crate::engine::TaskName;
use crate::types::TaskMode;

/// Mutable view over the scheduler's task table.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a DagGraph, tasks: &'a mut HashMap<TaskName, TaskInfo>) -> Self {
        Self { graph, tasks }
    }

    /// Mark every task of `plan` that has not been requested yet as
    /// `Pending`, ranking it by plan position. Tasks already requested in
    /// this session keep their state and rank.
    pub fn mark_plan_pending(&mut self, plan: &[TaskName], next_rank: &mut u64) {
        for name in plan {
            match self.tasks.get_mut(name) {
                Some(info) if info.run_state.is_none() => {
                    info.run_state = Some(RunState::Pending);
                    info.rank = Some(*next_rank);
                    *next_rank += 1;
                    debug!(task = %info.name, rank = ?info.rank, "marked Pending for this session");
                }
                Some(_) => {}
                None => warn!(task = %name, "planned task missing from tasks map"),
            }
        }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        ReadOnlyStateManager::new(self.tasks).deps_satisfied_for_info(info)
    }

    /// Mark every pending dependent (transitively) of a failed task as
    /// `DoneFailed`. Returns the newly failed names, excluding the root.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut newly_failed = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                if info.run_state == Some(RunState::Pending) {
                    info.run_state = Some(RunState::DoneFailed);
                    debug!(
                        task = %info.name,
                        upstream = %failed_task,
                        "marking dependent as DoneFailed due to upstream failure"
                    );
                    newly_failed.push(info.name.clone());
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                }
            }
        }

        newly_failed
    }

    /// Dispatch ready tasks in rank order.
    ///
    /// Nothing is dispatched while a blocking task is running. Background
    /// tasks are dispatched one after another (each may unlock more work);
    /// the first blocking task dispatched ends the batch.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let mut ready = Vec::new();

        if self.blocking_task_running() {
            return ready;
        }

        while let Some(name) = self.next_ready() {
            let Some(info) = self.tasks.get_mut(&name) else {
                break;
            };
            info.run_state = Some(RunState::Running);
            info!(task = %info.name, mode = %info.mode, "running task");
            ready.push(ScheduledTask::from_task_info(info));

            if info.mode == TaskMode::Blocking {
                break;
            }
        }

        ready
    }

    fn next_ready(&self) -> Option<TaskName> {
        self.tasks
            .values()
            .filter(|info| info.run_state == Some(RunState::Pending))
            .filter(|info| self.deps_satisfied_for_info(info))
            .min_by_key(|info| info.rank)
            .map(|info| info.name.clone())
    }

    fn blocking_task_running(&self) -> bool {
        self.tasks.values().any(|info| {
            info.run_state == Some(RunState::Running) && info.mode == TaskMode::Blocking
        })
    }

    /// Return every `Pending` task to "not requested". Used once the session
    /// has stopped dispatching, so those tasks are not reported as failed.
    pub fn reset_pending(&mut self) -> Vec<TaskName> {
        let mut reset = Vec::new();
        for info in self.tasks.values_mut() {
            if info.run_state == Some(RunState::Pending) {
                info.run_state = None;
                info.rank = None;
                reset.push(info.name.clone());
            }
        }
        reset.sort();
        reset
    }
}

/// A read-only view for checking prerequisite satisfaction.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// Whether every prerequisite of `info` lets it start.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| match self.tasks.get(dep_name) {
            Some(dep) => dep.satisfies_dependents(),
            None => {
                warn!(task = %info.name, dep = %dep_name, "dependency missing from tasks map");
                false
            }
        })
    }

    /// Whether no task is pending or running.
    pub fn all_tasks_settled(&self) -> bool {
        !self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}
