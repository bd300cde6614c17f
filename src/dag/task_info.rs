// src/dag/task_info.rs

//! Per-task bookkeeping for the scheduler.

use crate::engine::TaskName;
use crate::tasks::TaskId;

/// Where a task stands in the active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// Not part of the active run (or there is none).
    NotInRun,
    /// Triggered, waiting for dependencies inside the run.
    Pending,
    /// Handed to the executor.
    Running,
    /// Finished, or (long-lived) reported that it is up.
    DoneSuccess,
    /// Failed, was cancelled, or a dependency in the run did not succeed.
    DoneFailed,
}

impl TaskRunState {
    pub fn is_active(self) -> bool {
        matches!(self, TaskRunState::Pending | TaskRunState::Running)
    }
}

/// Static task facts plus its state in the active run.
#[derive(Debug, Clone)]
pub(crate) struct TaskSlot {
    pub id: TaskId,
    /// Names from `after = [...]`.
    pub deps: Vec<TaskName>,
    pub state: TaskRunState,
    /// How often the task has been dispatched since startup.
    pub dispatched: u64,
}

impl TaskSlot {
    pub fn new(id: TaskId, deps: Vec<TaskName>) -> Self {
        Self {
            id,
            deps,
            state: TaskRunState::NotInRun,
            dispatched: 0,
        }
    }
}

/// A task the scheduler wants the executor to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub long_lived: bool,
    /// The DAG run this dispatch belongs to.
    pub run_id: u64,
}
