// src/engine/event_handlers.rs

//! What the core does for each kind of [`RuntimeEvent`](super::RuntimeEvent).

use tracing::debug;

use crate::dag::{ScheduledTask, Scheduler, TaskRunState};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome, TriggerReason};

/// Instruction for the async shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Hand these tasks to their executor loops.
    DispatchTasks(Vec<ScheduledTask>),
    /// Flag these in-flight tasks as cancelled.
    CancelTasks(Vec<TaskName>),
    /// Leave the event loop once the commands before this one are done.
    RequestExit,
}

/// Commands produced by one event, in order, and whether to keep looping.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

impl Default for CoreStep {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }
}

impl CoreStep {
    fn dispatch(&mut self, tasks: Vec<ScheduledTask>) {
        if !tasks.is_empty() {
            self.commands.push(CoreCommand::DispatchTasks(tasks));
        }
    }

    fn cancel(&mut self, tasks: Vec<TaskName>) {
        if !tasks.is_empty() {
            self.commands.push(CoreCommand::CancelTasks(tasks));
        }
    }

    fn exit(mut self) -> Self {
        self.commands.push(CoreCommand::RequestExit);
        self.keep_running = false;
        self
    }
}

/// A task was asked to run.
///
/// | state in the active run | effect                                      |
/// |-------------------------|---------------------------------------------|
/// | no active run           | open one with this task plus the next batch |
/// | not in the run          | joins the run                               |
/// | pending                 | nothing; it has not read its inputs yet     |
/// | running                 | queued; cancelled too in `cancel` mode      |
/// | done                    | queued                                      |
pub fn on_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    let mut step = CoreStep::default();

    if scheduler.is_idle() {
        let mut batch = queue.next_batch();
        batch.push(task);
        step.dispatch(scheduler.handle_triggers(batch.iter().map(String::as_str)));
        return step;
    }

    match scheduler.run_state_of(&task) {
        None => debug!(task = %task, "ignoring trigger for unknown task"),
        Some(TaskRunState::NotInRun) => step.dispatch(scheduler.handle_trigger(&task)),
        Some(TaskRunState::Pending) => {
            debug!(task = %task, ?reason, "already pending; trigger absorbed");
        }
        Some(TaskRunState::Running) => {
            queue.record_trigger(&task);
            if queue.cancels_running() {
                step.cancel(vec![task]);
            }
        }
        Some(TaskRunState::DoneSuccess | TaskRunState::DoneFailed) => queue.record_trigger(&task),
    }
    step
}

/// A long-lived task reported that it is up.
pub fn on_progress(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    task: &str,
) -> CoreStep {
    let mut step = CoreStep::default();
    step.dispatch(scheduler.handle_progress(task));
    settle(scheduler, queue, options, step)
}

/// A task instance ended.
pub fn on_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    task: &str,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut step = CoreStep::default();
    step.dispatch(scheduler.handle_completion(task, outcome));
    settle(scheduler, queue, options, step)
}

/// Ctrl-C: stop whatever is in flight and leave.
pub fn on_shutdown(scheduler: &Scheduler) -> CoreStep {
    let mut step = CoreStep::default();
    step.cancel(scheduler.running_tasks());
    step.exit()
}

/// Once the run is over, start the next queued batch, or exit if this is a
/// one-shot invocation with nothing left to do.
fn settle(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    mut step: CoreStep,
) -> CoreStep {
    if !scheduler.is_idle() {
        return step;
    }
    if !queue.is_empty() {
        let batch = queue.next_batch();
        debug!(tasks = ?batch, "starting queued batch");
        step.dispatch(scheduler.handle_triggers(batch.iter().map(String::as_str)));
    }
    if options.exit_when_idle && scheduler.is_idle() && queue.is_empty() {
        return step.exit();
    }
    step
}
