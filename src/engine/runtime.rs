// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::{CoreCommand, CoreRuntime, RunSummary, RuntimeEvent};
use crate::errors::Result;
use crate::exec::ExecutorBackend;

/// The async shell around [`CoreRuntime`].
///
/// Owns the event receiver and the executor; every decision is made by the
/// core, this loop only carries the resulting commands out.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    events: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime").field("core", &self.core).finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, events: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self { core, events, executor }
    }

    /// Process events until the core asks to exit or every sender is gone.
    pub async fn run(mut self) -> Result<RunSummary> {
        debug!("runtime loop started");

        while let Some(event) = self.events.recv().await {
            debug!(?event, "event");
            let step = self.core.step(event);

            for command in step.commands {
                match command {
                    CoreCommand::DispatchTasks(tasks) => {
                        debug!(tasks = ?tasks.iter().map(|t| &t.name).collect::<Vec<_>>(), "dispatching");
                        self.executor.spawn_ready_tasks(tasks).await?;
                    }
                    CoreCommand::CancelTasks(names) => {
                        info!(tasks = ?names, "cancelling superseded tasks");
                        self.executor.cancel_tasks(names).await?;
                    }
                    CoreCommand::RequestExit => debug!("exit requested"),
                }
            }

            if !step.keep_running {
                break;
            }
        }

        let summary = self.core.summary();
        info!(
            runs = summary.runs,
            failed = ?summary.failed,
            cancelled = summary.cancelled,
            "runtime stopped"
        );
        Ok(summary)
    }
}
