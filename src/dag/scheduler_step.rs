// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the graph and make
/// assertions about what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Tasks to start now, in order. Holds at most one blocking task, and
    /// if present it is last.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks newly marked as failed in this step (the task that failed
    /// first, then dependents that can no longer run).
    pub newly_failed: Vec<TaskName>,
    /// Whether nothing is pending or running after this step.
    pub idle: bool,
}
