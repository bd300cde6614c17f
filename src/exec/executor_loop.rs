// src/exec/executor_loop.rs

//! Main executor loop that manages running task instances.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskName};
use crate::exec::task_runner::{TaskEnv, run_task};
use crate::pipeline::CancelToken;

/// Requests the executor loop accepts.
#[derive(Debug, Clone)]
pub enum ExecRequest {
    Run(ScheduledTask),
    Cancel(Vec<TaskName>),
}

/// Handle for a task instance that is currently running.
///
/// - `cancel` is checked by pipelines between stages and files.
/// - `stop` wakes async (long-lived) tasks that never poll the token.
/// - `handle` is the Tokio task driving the instance.
struct ActiveTask {
    cancel: CancelToken,
    stop: Option<oneshot::Sender<()>>,
    long_lived: bool,
    handle: tokio::task::JoinHandle<()>,
}

impl ActiveTask {
    fn request_stop(&mut self) {
        self.cancel.cancel();
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

/// Spawn the background executor loop.
///
/// Per task name there is never more than one live instance:
///
/// - A long-lived task that is already up satisfies the new request; a
///   `TaskProgressed` event is synthesized for the new run.
/// - A batch task whose previous instance is still winding down (it already
///   reported completion, or was cancelled) is stopped before the new one
///   starts.
pub fn spawn_executor(
    env: Arc<TaskEnv>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ExecRequest> {
    let (tx, mut rx) = mpsc::channel::<ExecRequest>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<TaskName, ActiveTask> = HashMap::new();

        while let Some(request) = rx.recv().await {
            match request {
                ExecRequest::Run(task) => {
                    handle_scheduled_task(task, &env, &mut active, &runtime_tx).await;
                }
                ExecRequest::Cancel(names) => cancel_tasks(&names, &mut active),
            }
        }

        for (name, task) in active.iter_mut() {
            debug!(task = %name, "executor closing; stopping task");
            task.request_stop();
        }
        info!("executor loop finished (channel closed)");
    });

    tx
}

async fn handle_scheduled_task(
    task: ScheduledTask,
    env: &Arc<TaskEnv>,
    active: &mut HashMap<TaskName, ActiveTask>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    let name = task.name.clone();

    if let Some(existing) = active.get_mut(&name) {
        if !existing.handle.is_finished() {
            if existing.long_lived {
                debug!(
                    task = %name,
                    run_id = task.run_id,
                    "long-lived task already up; reporting progress for the new run"
                );
                let _ = runtime_tx
                    .send(RuntimeEvent::TaskProgressed { task: name.clone() })
                    .await;
                return;
            }

            debug!(
                task = %name,
                run_id = task.run_id,
                "previous instance still winding down; stopping it"
            );
            existing.request_stop();
        }
    }

    let cancel = CancelToken::new();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let long_lived = task.long_lived;
    let spawn_name = name.clone();

    let handle = tokio::spawn({
        let env = Arc::clone(env);
        let rt_tx = runtime_tx.clone();
        let cancel = cancel.clone();
        async move {
            run_task(task, env, rt_tx, cancel, stop_rx).await;
            debug!(task = %spawn_name, "task runner future finished");
        }
    });

    active.insert(
        name,
        ActiveTask {
            cancel,
            stop: Some(stop_tx),
            long_lived,
            handle,
        },
    );
}

fn cancel_tasks(names: &[TaskName], active: &mut HashMap<TaskName, ActiveTask>) {
    for name in names {
        match active.get_mut(name) {
            Some(task) if !task.handle.is_finished() => {
                info!(task = %name, "cancelling running instance");
                task.request_stop();
            }
            _ => debug!(task = %name, "cancel requested but no live instance"),
        }
    }
}
