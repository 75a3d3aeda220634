// tests/scheduler_property.rs

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;

use treetask::dag::{Scheduler, TaskRunState, TaskSpec};
use treetask::engine::TaskOutcome;

/// Random acyclic task sets: task N may only depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<TaskSpec>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        );
        let background = proptest::collection::vec(any::<bool>(), num_tasks);

        (deps, background).prop_map(move |(raw_deps, background)| {
            raw_deps
                .into_iter()
                .zip(background)
                .enumerate()
                .map(|(i, (potential, is_background))| {
                    let deps: BTreeSet<String> = potential
                        .into_iter()
                        .filter(|_| i > 0)
                        .map(|d| format!("task_{}", d % i))
                        .collect();
                    let spec = TaskSpec::new(format!("task_{i}"), deps);
                    if is_background {
                        spec.background()
                    } else {
                        spec
                    }
                })
                .collect()
        })
    })
}

proptest! {
    /// Driving the scheduler to quiescence runs every task in the plan
    /// exactly once, and never before its prerequisites finished (or, for
    /// background prerequisites, started).
    #[test]
    fn every_planned_task_runs_once_after_its_prerequisites(
        specs in dag_strategy(10),
        target_idx in any::<usize>(),
    ) {
        let target = format!("task_{}", target_idx % specs.len());
        let mut scheduler = Scheduler::from_specs(&specs).unwrap();
        let plan = scheduler.plan_for(&target).unwrap();

        let mut queue = scheduler.begin(&target).unwrap().newly_scheduled;
        let mut started: Vec<String> = Vec::new();
        let mut seen = HashSet::new();

        while let Some(task) = queue.first().cloned() {
            queue.remove(0);
            prop_assert!(seen.insert(task.name.clone()), "{} dispatched twice", task.name);

            for dep in scheduler.graph().dependencies_of(&task.name) {
                prop_assert!(started.contains(dep), "{} started before {}", task.name, dep);
            }
            started.push(task.name.clone());

            let step = scheduler.step_completion(&task.name, TaskOutcome::Success);
            queue.extend(step.newly_scheduled);
        }

        let mut expected = plan.clone();
        expected.sort();
        let mut ran = started.clone();
        ran.sort();
        prop_assert_eq!(ran, expected);
        prop_assert!(scheduler.is_idle());
    }

    /// A failure fails the task's pending dependents; once the session
    /// halts, nothing new starts.
    #[test]
    fn failure_never_dispatches_more_work(
        specs in dag_strategy(10),
        fail_idx in any::<usize>(),
    ) {
        let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
        let failing = names[fail_idx % names.len()].clone();
        let target = names[names.len() - 1].clone();

        let mut scheduler = Scheduler::from_specs(&specs).unwrap();
        let mut queue = scheduler.begin(&target).unwrap().newly_scheduled;
        let mut failed = false;

        while let Some(task) = queue.first().cloned() {
            queue.remove(0);
            let outcome = if task.name == failing {
                TaskOutcome::Failed
            } else {
                TaskOutcome::Success
            };
            let step = scheduler.step_completion(&task.name, outcome);

            if failed {
                prop_assert!(step.newly_scheduled.is_empty());
            } else if outcome == TaskOutcome::Failed {
                failed = true;
                prop_assert!(step.newly_scheduled.is_empty());
                for dependent in scheduler.graph().dependents_of(&failing) {
                    let state = scheduler.run_state_of(dependent).unwrap();
                    prop_assert!(
                        state != TaskRunState::Pending,
                        "{} still pending after {} failed",
                        dependent,
                        failing
                    );
                }
                scheduler.halt();
            } else {
                queue.extend(step.newly_scheduled);
            }
        }

        prop_assert!(scheduler.is_idle());
        if failed {
            prop_assert_eq!(scheduler.run_state_of(&failing), Some(TaskRunState::DoneFailed));
        }
    }
}
