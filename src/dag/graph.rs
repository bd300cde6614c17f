// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap};

use crate::config::model::ConfigFile;
use crate::engine::TaskName;
use crate::tasks::TaskId;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must finish before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// In-memory DAG over the built-in tasks, keyed by task name.
///
/// Every built-in task is a node; edges come from `[task.<name>] after`.
/// Acyclicity is checked in `config::validate`.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<TaskName, DagNode>,
}

impl DagGraph {
    /// Build the DAG from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut nodes: HashMap<TaskName, DagNode> = TaskId::ALL
            .iter()
            .map(|id| {
                (
                    id.as_str().to_string(),
                    DagNode {
                        deps: cfg.after_of(id.as_str()).to_vec(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        for id in TaskId::ALL {
            for dep in cfg.after_of(id.as_str()) {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(id.as_str().to_string());
                }
            }
        }

        for node in nodes.values_mut() {
            node.dependents.sort();
        }

        Self { nodes }
    }

    /// All task names, sorted.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        let names: BTreeSet<&str> = self.nodes.keys().map(|s| s.as_str()).collect();
        names.into_iter()
    }

    /// Immediate dependencies of a task (the tasks listed in its `after`).
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task (tasks that list this one in their `after`).
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Transitive dependencies of `name`, excluding `name` itself.
    pub fn ancestors_of(&self, name: &str) -> BTreeSet<TaskName> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = self.dependencies_of(name).iter().map(|s| s.as_str()).collect();
        while let Some(current) = stack.pop() {
            if seen.insert(current.to_string()) {
                stack.extend(self.dependencies_of(current).iter().map(|s| s.as_str()));
            }
        }
        seen
    }

    /// `names` ordered so that every task comes after its dependencies.
    ///
    /// Ties keep the input order. Names unknown to the graph are kept last.
    pub fn topo_order(&self, names: &[TaskName]) -> Vec<TaskName> {
        let wanted: BTreeSet<&str> = names.iter().map(|s| s.as_str()).collect();
        let mut placed: BTreeSet<&str> = BTreeSet::new();
        let mut ordered = Vec::with_capacity(names.len());

        while ordered.len() < names.len() {
            let next = names.iter().find(|name| {
                !placed.contains(name.as_str())
                    && self
                        .dependencies_of(name)
                        .iter()
                        .all(|dep| !wanted.contains(dep.as_str()) || placed.contains(dep.as_str()))
            });
            match next {
                Some(name) => {
                    placed.insert(name.as_str());
                    ordered.push(name.clone());
                }
                // Only reachable with a cycle, which validation rejects.
                None => {
                    ordered.extend(names.iter().filter(|n| !placed.contains(n.as_str())).cloned());
                    break;
                }
            }
        }
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{RawConfigFile, TaskConfig};

    fn graph_with(edges: &[(&str, &[&str])]) -> DagGraph {
        let mut raw = RawConfigFile::default();
        for (task, after) in edges {
            raw.task.insert(
                task.to_string(),
                TaskConfig {
                    after: after.iter().map(|s| s.to_string()).collect(),
                },
            );
        }
        DagGraph::from_config(&ConfigFile::try_from(raw).unwrap())
    }

    #[test]
    fn every_builtin_task_is_a_node() {
        let graph = graph_with(&[]);
        assert_eq!(graph.tasks().count(), TaskId::ALL.len());
        assert!(graph.dependencies_of("styles").is_empty());
    }

    #[test]
    fn after_edges_are_mirrored_as_dependents() {
        let graph = graph_with(&[
            ("app-ngdocs", &["app-annotate"]),
            ("app-annotate", &["app-html-minify"]),
        ]);
        assert_eq!(graph.dependents_of("app-annotate"), ["app-ngdocs"]);
        let ancestors: Vec<_> = graph.ancestors_of("app-ngdocs").into_iter().collect();
        assert_eq!(ancestors, ["app-annotate", "app-html-minify"]);
    }

    #[test]
    fn topo_order_puts_dependencies_first() {
        let graph = graph_with(&[("app-ngdocs", &["app-annotate"]), ("images", &["sprite"])]);
        let names: Vec<TaskName> = ["app-ngdocs", "images", "app-annotate", "styles", "sprite"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            graph.topo_order(&names),
            ["app-annotate", "app-ngdocs", "styles", "sprite", "images"]
        );
    }
}
