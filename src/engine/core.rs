// src/engine/core.rs

//! The scheduling state machine, free of IO.
//!
//! [`CoreRuntime::step`] takes one event and answers with the commands the
//! async shell in [`super::runtime`] must carry out. Nothing here touches
//! Tokio, the disk or a pipeline, so every rule is tested by feeding events.

use std::collections::BTreeSet;

use crate::dag::Scheduler;
use crate::engine::event_handlers::{CoreStep, on_completion, on_progress, on_shutdown, on_trigger};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunSummary, RuntimeEvent, RuntimeOptions, TaskName, TaskOutcome};
use crate::types::TriggerWhileRunningBehaviour;

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
    runs: u64,
    failed: BTreeSet<TaskName>,
    cancelled: usize,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
            runs: 0,
            failed: BTreeSet::new(),
            cancelled: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle() && self.queue.is_empty()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            runs: self.runs,
            failed: self.failed.iter().cloned().collect(),
            cancelled: self.cancelled,
        }
    }

    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        let before = self.scheduler.current_run_id();

        let step = match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                on_trigger(&mut self.scheduler, &mut self.queue, task, reason)
            }
            RuntimeEvent::TaskProgressed { task } => {
                on_progress(&mut self.scheduler, &mut self.queue, &self.options, &task)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => {
                match outcome {
                    TaskOutcome::Success => {}
                    TaskOutcome::Failed => {
                        self.failed.insert(task.clone());
                    }
                    TaskOutcome::Cancelled => self.cancelled += 1,
                }
                on_completion(&mut self.scheduler, &mut self.queue, &self.options, &task, outcome)
            }
            RuntimeEvent::ShutdownRequested => on_shutdown(&self.scheduler),
        };

        let after = self.scheduler.current_run_id();
        if after.is_some() && after != before {
            self.runs += 1;
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig};
    use crate::engine::TriggerReason;
    use crate::engine::event_handlers::CoreCommand;

    fn core(edges: &[(&str, &str)], behaviour: TriggerWhileRunningBehaviour, exit_when_idle: bool) -> CoreRuntime {
        let mut raw = RawConfigFile::default();
        for (task, dep) in edges {
            raw.task
                .entry(task.to_string())
                .or_insert_with(TaskConfig::default)
                .after
                .push(dep.to_string());
        }
        let cfg = ConfigFile::try_from(raw).unwrap();
        CoreRuntime::new(
            Scheduler::from_config(&cfg),
            behaviour,
            1,
            RuntimeOptions { exit_when_idle },
        )
    }

    fn trigger(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskTriggered {
            task: task.to_string(),
            reason: TriggerReason::FileWatch,
        }
    }

    fn done(task: &str, outcome: TaskOutcome) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task: task.to_string(),
            outcome,
        }
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks.iter().map(|t| t.name.clone())),
                _ => None,
            })
            .flatten()
            .collect()
    }

    #[test]
    fn retrigger_of_running_task_cancels_then_reruns() {
        let mut core = core(&[], TriggerWhileRunningBehaviour::Cancel, false);

        assert_eq!(dispatched(&core.step(trigger("styles"))), ["styles"]);

        let step = core.step(trigger("styles"));
        assert_eq!(step.commands, [CoreCommand::CancelTasks(vec!["styles".to_string()])]);

        let step = core.step(done("styles", TaskOutcome::Cancelled));
        assert_eq!(dispatched(&step), ["styles"]);
        assert_eq!(core.summary().cancelled, 1);
        assert_eq!(core.summary().runs, 2);
    }

    #[test]
    fn queue_mode_lets_the_instance_finish() {
        let mut core = core(&[], TriggerWhileRunningBehaviour::Queue, false);
        core.step(trigger("scripts"));

        let step = core.step(trigger("scripts"));
        assert!(step.commands.is_empty());

        let step = core.step(done("scripts", TaskOutcome::Success));
        assert_eq!(dispatched(&step), ["scripts"]);
    }

    #[test]
    fn unrelated_trigger_joins_the_active_run() {
        let mut core = core(&[], TriggerWhileRunningBehaviour::Cancel, false);
        core.step(trigger("styles"));
        let step = core.step(trigger("images"));
        assert_eq!(dispatched(&step), ["images"]);
        assert_eq!(core.summary().runs, 1);
    }

    #[test]
    fn failure_blocks_dependents_and_is_counted() {
        let mut core = core(&[("app-ngdocs", "app-annotate")], TriggerWhileRunningBehaviour::Cancel, true);

        assert_eq!(dispatched(&core.step(trigger("app-annotate"))), ["app-annotate"]);

        let step = core.step(done("app-annotate", TaskOutcome::Failed));
        assert!(dispatched(&step).is_empty());
        assert!(!step.keep_running);
        assert!(step.commands.contains(&CoreCommand::RequestExit));
        assert_eq!(core.summary().failed, ["app-annotate"]);
    }

    #[test]
    fn shutdown_cancels_in_flight_tasks() {
        let mut core = core(&[], TriggerWhileRunningBehaviour::Cancel, false);
        core.step(trigger("sprite"));
        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert!(!step.keep_running);
        assert_eq!(
            step.commands,
            [
                CoreCommand::CancelTasks(vec!["sprite".to_string()]),
                CoreCommand::RequestExit
            ]
        );
    }
}
