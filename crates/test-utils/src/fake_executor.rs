use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use assetpipe::dag::ScheduledTask;
use assetpipe::engine::{RuntimeEvent, TaskName, TaskOutcome};
use assetpipe::exec::ExecutorBackend;
use assetpipe::errors::Result;

/// What the fake executor observed.
#[derive(Debug, Default, Clone)]
pub struct ExecutorLog {
    pub executed: Vec<TaskName>,
    pub cancelled: Vec<TaskName>,
}

/// A fake executor that:
/// - records which tasks were "run" and which were asked to stop
/// - answers each scheduled task right away: `TaskProgressed` for
///   long-lived tasks, otherwise `TaskCompleted` with the configured outcome
///   (`Success` unless told otherwise)
/// - leaves "held" tasks running until cancelled, which then completes
///   them with `Cancelled`.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    log: Arc<Mutex<ExecutorLog>>,
    outcomes: HashMap<TaskName, TaskOutcome>,
    held: HashSet<TaskName>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, log: Arc<Mutex<ExecutorLog>>) -> Self {
        Self {
            runtime_tx,
            log,
            outcomes: HashMap::new(),
            held: HashSet::new(),
        }
    }

    /// Report `outcome` whenever `task` runs.
    pub fn with_outcome(mut self, task: &str, outcome: TaskOutcome) -> Self {
        self.outcomes.insert(task.to_string(), outcome);
        self
    }

    /// Never complete `task` on its own.
    pub fn hold(mut self, task: &str) -> Self {
        self.held.insert(task.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let log = Arc::clone(&self.log);

        Box::pin(async move {
            for t in tasks {
                log.lock().unwrap().executed.push(t.name.clone());

                if self.held.contains(&t.name) {
                    continue;
                }

                let event = if t.long_lived {
                    RuntimeEvent::TaskProgressed { task: t.name.clone() }
                } else {
                    RuntimeEvent::TaskCompleted {
                        task: t.name.clone(),
                        outcome: self.outcomes.get(&t.name).copied().unwrap_or(TaskOutcome::Success),
                    }
                };
                tx.send(event).await.map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }

    fn cancel_tasks(
        &mut self,
        tasks: Vec<TaskName>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let log = Arc::clone(&self.log);

        Box::pin(async move {
            for name in tasks {
                log.lock().unwrap().cancelled.push(name.clone());
                // Released: a second start of this task completes normally.
                self.held.remove(&name);
                let _ = tx
                    .send(RuntimeEvent::TaskCompleted {
                        task: name,
                        outcome: TaskOutcome::Cancelled,
                    })
                    .await;
            }
            Ok(())
        })
    }
}
