// src/dag/scheduler.rs

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::dag::graph::DagGraph;
use crate::dag::task_info::{ScheduledTask, TaskRunState, TaskSlot};
use crate::engine::{TaskName, TaskOutcome};
use crate::tasks::TaskId;

/// The task graph plus the state of the active run.
///
/// A run starts with the first trigger and ends once no task in it is
/// pending or running. Triggering a task pulls its dependents into the run
/// too, so a rebuilt bundle also refreshes whatever is declared after it.
///
/// A dependency only holds a task back while it takes part in the run;
/// outside the run its last outputs are taken as they are.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: BTreeMap<TaskName, TaskSlot>,
    runs: u64,
    current_run_id: Option<u64>,
}

impl Scheduler {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let graph = DagGraph::from_config(cfg);
        let tasks = TaskId::ALL
            .into_iter()
            .map(|id| {
                let deps = graph.dependencies_of(id.as_str()).to_vec();
                (id.as_str().to_string(), TaskSlot::new(id, deps))
            })
            .collect();

        Self {
            graph,
            tasks,
            runs: 0,
            current_run_id: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// State of `task` in the active run; `None` for unknown names.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let slot = self.tasks.get(task)?;
        Some(if self.is_idle() {
            TaskRunState::NotInRun
        } else {
            slot.state
        })
    }

    /// Tasks taking part in the active run (empty when idle), sorted.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.is_idle() {
            return Vec::new();
        }
        self.names_where(|s| s.state != TaskRunState::NotInRun)
    }

    /// Tasks handed to the executor that have not reported back, sorted.
    pub fn running_tasks(&self) -> Vec<TaskName> {
        self.names_where(|s| s.state == TaskRunState::Running)
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Whether nothing in the active run holds `task` back.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let slot = self.tasks.get(task)?;
        Some(self.ready_to_start(slot))
    }

    /// Open a new run with every task outside it.
    pub fn start_new_run(&mut self) {
        self.runs += 1;
        self.current_run_id = Some(self.runs);
        for slot in self.tasks.values_mut() {
            slot.state = TaskRunState::NotInRun;
        }
        debug!(run_id = self.runs, "starting DAG run");
    }

    /// Add `task` and its dependents to the run (opening one if needed) and
    /// return whatever can start now.
    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.handle_triggers([task])
    }

    /// Like [`handle_trigger`](Self::handle_trigger) for several tasks at
    /// once. Everything joins the run before anything is dispatched, so the
    /// order of `tasks` never lets a dependent start ahead of its dependency.
    pub fn handle_triggers<'a>(&mut self, tasks: impl IntoIterator<Item = &'a str>) -> Vec<ScheduledTask> {
        let mut stack: Vec<TaskName> = Vec::new();
        for task in tasks {
            if self.tasks.contains_key(task) {
                stack.push(task.to_string());
            } else {
                warn!(task = %task, "trigger for unknown task; ignoring");
            }
        }
        if stack.is_empty() {
            return Vec::new();
        }
        if self.is_idle() {
            self.start_new_run();
        }

        while let Some(name) = stack.pop() {
            if let Some(slot) = self.tasks.get_mut(&name) {
                if slot.state == TaskRunState::NotInRun {
                    slot.state = TaskRunState::Pending;
                    debug!(task = %name, "joined run as pending");
                }
            }
            stack.extend(self.graph.dependents_of(&name).iter().cloned());
        }

        self.advance()
    }

    /// A long-lived task is up: it counts as done for its dependents.
    pub fn handle_progress(&mut self, task: &str) -> Vec<ScheduledTask> {
        let Some(run_id) = self.current_run_id else {
            debug!(task = %task, "progress with no active run; ignoring");
            return Vec::new();
        };
        match self.tasks.get_mut(task) {
            Some(slot) => {
                slot.state = TaskRunState::DoneSuccess;
                debug!(task = %task, run_id, "long-lived task is up");
            }
            None => {
                warn!(task = %task, "progress from unknown task; ignoring");
                return Vec::new();
            }
        }
        self.advance()
    }

    /// Record how a task ended and return what that unblocks.
    ///
    /// A failed or cancelled task takes its pending dependents down with it
    /// for the rest of this run.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        let Some(run_id) = self.current_run_id else {
            debug!(task = %task, ?outcome, "completion with no active run; ignoring");
            return Vec::new();
        };
        let Some(slot) = self.tasks.get_mut(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return Vec::new();
        };

        match outcome {
            TaskOutcome::Success => {
                slot.state = TaskRunState::DoneSuccess;
                debug!(task = %task, run_id, "task succeeded");
            }
            TaskOutcome::Failed | TaskOutcome::Cancelled => {
                slot.state = TaskRunState::DoneFailed;
                let blocked = self.block_dependents(task);
                warn!(task = %task, run_id, ?outcome, ?blocked, "task did not succeed");
            }
        }
        self.advance()
    }

    /// Start every pending task whose dependencies allow it, then close the
    /// run if nothing is left in flight.
    fn advance(&mut self) -> Vec<ScheduledTask> {
        let run_id = self.current_run_id.unwrap_or_default();
        let ready: Vec<TaskName> = self
            .tasks
            .iter()
            .filter(|(_, slot)| slot.state == TaskRunState::Pending && self.ready_to_start(slot))
            .map(|(name, _)| name.clone())
            .collect();

        let mut scheduled = Vec::with_capacity(ready.len());
        for name in ready {
            if let Some(slot) = self.tasks.get_mut(&name) {
                slot.state = TaskRunState::Running;
                slot.dispatched += 1;
                info!(task = %name, run_id, rerun = slot.dispatched > 1, "scheduling task");
                scheduled.push(ScheduledTask {
                    name,
                    long_lived: slot.id.is_long_lived(),
                    run_id,
                });
            }
        }

        if !self.tasks.values().any(|s| s.state.is_active()) {
            info!(run_id, "all tasks settled; run finished");
            self.current_run_id = None;
        }
        scheduled
    }

    fn ready_to_start(&self, slot: &TaskSlot) -> bool {
        slot.deps.iter().all(|dep| {
            match self.tasks.get(dep).map(|d| d.state) {
                Some(TaskRunState::NotInRun) | Some(TaskRunState::DoneSuccess) => true,
                Some(_) => false,
                None => {
                    warn!(dep = %dep, "dependency is not a known task");
                    false
                }
            }
        })
    }

    /// Mark pending dependents of `task`, transitively, as failed.
    fn block_dependents(&mut self, task: &str) -> Vec<TaskName> {
        let mut blocked = Vec::new();
        let mut stack: Vec<TaskName> = self.graph.dependents_of(task).to_vec();
        while let Some(name) = stack.pop() {
            if let Some(slot) = self.tasks.get_mut(&name) {
                if slot.state == TaskRunState::Pending {
                    slot.state = TaskRunState::DoneFailed;
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                    blocked.push(name);
                }
            }
        }
        blocked
    }

    fn names_where(&self, pred: impl Fn(&TaskSlot) -> bool) -> Vec<TaskName> {
        self.tasks
            .iter()
            .filter(|(_, slot)| pred(slot))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{RawConfigFile, TaskConfig};

    fn scheduler(edges: &[(&str, &[&str])]) -> Scheduler {
        let mut raw = RawConfigFile::default();
        for (task, after) in edges {
            raw.task.insert(
                task.to_string(),
                TaskConfig {
                    after: after.iter().map(|s| s.to_string()).collect(),
                },
            );
        }
        Scheduler::from_config(&ConfigFile::try_from(raw).unwrap())
    }

    fn names(tasks: Vec<ScheduledTask>) -> Vec<String> {
        tasks.into_iter().map(|t| t.name).collect()
    }

    #[test]
    fn trigger_pulls_dependents_into_the_run() {
        let mut s = scheduler(&[("app-ngdocs", &["app-annotate"])]);

        assert_eq!(names(s.handle_trigger("app-annotate")), ["app-annotate"]);
        assert_eq!(s.run_state_of("app-ngdocs"), Some(TaskRunState::Pending));
        assert_eq!(s.deps_satisfied("app-ngdocs"), Some(false));

        assert_eq!(names(s.handle_completion("app-annotate", TaskOutcome::Success)), ["app-ngdocs"]);
        assert!(names(s.handle_completion("app-ngdocs", TaskOutcome::Success)).is_empty());
        assert!(s.is_idle());
    }

    #[test]
    fn dependency_outside_the_run_does_not_block() {
        let mut s = scheduler(&[("app-ngdocs", &["app-annotate"])]);
        assert_eq!(names(s.handle_trigger("app-ngdocs")), ["app-ngdocs"]);
        assert_eq!(s.run_state_of("app-annotate"), Some(TaskRunState::NotInRun));
    }

    #[test]
    fn failure_blocks_pending_dependents() {
        let mut s = scheduler(&[("app-ngdocs", &["app-annotate"]), ("images", &["app-ngdocs"])]);
        s.handle_trigger("app-annotate");

        assert!(s.handle_completion("app-annotate", TaskOutcome::Failed).is_empty());
        assert!(s.is_idle());
        assert_eq!(s.current_run_id(), None);
        assert_eq!(s.run_state_of("images"), Some(TaskRunState::NotInRun));
    }

    #[test]
    fn long_lived_progress_unblocks_dependents() {
        let mut s = scheduler(&[("styles", &["serve"])]);
        let first = s.handle_trigger("serve");
        assert!(first[0].long_lived);

        assert_eq!(s.running_tasks(), ["serve"]);
        assert_eq!(names(s.handle_progress("serve")), ["styles"]);
        assert_eq!(s.tasks_in_current_run(), ["serve", "styles"]);
    }

    #[test]
    fn batch_order_does_not_matter() {
        let mut s = scheduler(&[("app-ngdocs", &["app-annotate"])]);
        let started = names(s.handle_triggers(["app-ngdocs", "app-annotate", "sprite"]));
        assert_eq!(started, ["app-annotate", "sprite"]);
        assert_eq!(s.run_state_of("app-ngdocs"), Some(TaskRunState::Pending));
    }

    #[test]
    fn run_ids_increase_per_run() {
        let mut s = scheduler(&[]);
        let a = s.handle_trigger("sprite");
        s.handle_completion("sprite", TaskOutcome::Success);
        let b = s.handle_trigger("sprite");
        assert_eq!((a[0].run_id, b[0].run_id), (1, 2));
    }
}
