// src/engine/mod.rs

//! Deciding what runs when.
//!
//! Watchers, the executor and Ctrl-C all feed [`RuntimeEvent`]s into one
//! channel. [`core::CoreRuntime`] turns each event into [`CoreCommand`]s
//! using the [`crate::dag::Scheduler`] and the [`TriggerQueue`];
//! [`runtime::Runtime`] reads the channel and carries the commands out.

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;

pub use crate::types::TriggerWhileRunningBehaviour;

/// Tasks are addressed by their command-line names (`app-annotate`, ...).
pub type TaskName = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Already reported through the notifier.
    Failed,
    /// Stopped at a stage boundary by a newer trigger or by shutdown.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Named on the command line, directly or through `default`/`watch`.
    Manual,
    /// A watched input changed.
    FileWatch,
}

#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// One-shot invocations stop once nothing is running or queued;
    /// `watch` and `serve` keep going until Ctrl-C.
    pub exit_when_idle: bool,
}

#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskTriggered { task: TaskName, reason: TriggerReason },
    /// `serve` is listening; tasks ordered after it may start.
    TaskProgressed { task: TaskName },
    TaskCompleted { task: TaskName, outcome: TaskOutcome },
    ShutdownRequested,
}

/// Totals reported when the runtime stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub runs: u64,
    /// Every task that failed at least once, sorted.
    pub failed: Vec<TaskName>,
    pub cancelled: usize,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}
