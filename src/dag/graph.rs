// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::task_info::TaskSpec;
use crate::engine::TaskName;
use crate::errors::{Result, TreetaskError};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Prerequisites in declaration order.
    deps: Vec<TaskName>,
    /// Tasks that list this one as a prerequisite.
    dependents: Vec<TaskName>,
}

/// Task graph keyed by task name.
///
/// Construction validates that every prerequisite exists, that no task
/// depends on itself and that the graph is acyclic, so traversals never
/// need to guard against cycles.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<TaskName, DagNode>,
    /// Task names in declaration order.
    order: Vec<TaskName>,
}

impl DagGraph {
    pub fn from_specs(specs: &[TaskSpec]) -> Result<Self> {
        let mut nodes: HashMap<TaskName, DagNode> = HashMap::new();
        let mut order = Vec::with_capacity(specs.len());

        for spec in specs {
            if nodes.contains_key(&spec.name) {
                return Err(TreetaskError::ConfigError(format!(
                    "task '{}' is defined more than once",
                    spec.name
                )));
            }
            nodes.insert(
                spec.name.clone(),
                DagNode {
                    deps: spec.deps.clone(),
                    dependents: Vec::new(),
                },
            );
            order.push(spec.name.clone());
        }

        for spec in specs {
            for dep in &spec.deps {
                if dep == &spec.name {
                    return Err(TreetaskError::DagCycle(format!(
                        "task '{}' cannot be its own prerequisite",
                        spec.name
                    )));
                }
                match nodes.get_mut(dep) {
                    Some(dep_node) => dep_node.dependents.push(spec.name.clone()),
                    None => {
                        return Err(TreetaskError::TaskNotFound(format!(
                            "'{dep}' (prerequisite of '{}')",
                            spec.name
                        )));
                    }
                }
            }
        }

        let graph = Self { nodes, order };
        graph.check_acyclic()?;
        Ok(graph)
    }

    fn check_acyclic(&self) -> Result<()> {
        // Edge direction: prerequisite -> dependent.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in &self.order {
            graph.add_node(name.as_str());
        }
        for name in &self.order {
            for dep in self.dependencies_of(name) {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(TreetaskError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                cycle.node_id()
            ))),
        }
    }

    /// All task names, in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate prerequisites of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Depth-first post-order over `target`'s prerequisites: every task
    /// appears once, after all of its prerequisites, and prerequisites are
    /// visited in declaration order. `target` is last.
    pub fn plan_for(&self, target: &str) -> Result<Vec<TaskName>> {
        let mut plan = Vec::new();
        let mut visited = HashSet::new();
        self.extend_plan(target, &mut visited, &mut plan)?;
        Ok(plan)
    }

    /// Merged plan for several targets, each task at most once.
    pub fn plan_for_all<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<TaskName>> {
        let mut plan = Vec::new();
        let mut visited = HashSet::new();
        for target in targets {
            self.extend_plan(target.as_ref(), &mut visited, &mut plan)?;
        }
        Ok(plan)
    }

    fn extend_plan(
        &self,
        target: &str,
        visited: &mut HashSet<TaskName>,
        plan: &mut Vec<TaskName>,
    ) -> Result<()> {
        if !self.contains(target) {
            return Err(TreetaskError::TaskNotFound(target.to_string()));
        }

        if !visited.insert(target.to_string()) {
            return Ok(());
        }

        // (task, next prerequisite index)
        let mut stack: Vec<(&str, usize)> = vec![(target, 0)];

        while let Some((name, idx)) = stack.pop() {
            let deps = self.dependencies_of(name);
            match deps.get(idx) {
                Some(dep) => {
                    stack.push((name, idx + 1));
                    if visited.insert(dep.clone()) {
                        stack.push((dep.as_str(), 0));
                    }
                }
                None => plan.push(name.to_string()),
            }
        }

        Ok(())
    }
}
