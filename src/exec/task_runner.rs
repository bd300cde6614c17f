// src/exec/task_runner.rs

//! Individual task instance runner.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::pipeline::CancelToken;
use crate::serve;
use crate::tasks::{TaskContext, TaskId, TaskRegistry, execute};

/// Everything a task instance needs besides its cancel signals.
pub struct TaskEnv {
    pub registry: TaskRegistry,
    pub ctx: Arc<TaskContext>,
}

impl fmt::Debug for TaskEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskEnv")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Run one task instance and report its outcome to the runtime.
///
/// Batch tasks always end with exactly one `TaskCompleted`, including when
/// cancelled. The dev server reports `TaskProgressed` once it listens and
/// only completes if it fails before that.
pub async fn run_task(
    task: ScheduledTask,
    env: Arc<TaskEnv>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    cancel: CancelToken,
    stop_rx: oneshot::Receiver<()>,
) {
    let name = task.name.clone();
    let run_id = task.run_id;

    let outcome = match run_task_inner(task, env, &runtime_tx, cancel, stop_rx).await {
        Ok(Some(outcome)) => outcome,
        Ok(None) => return,
        Err(err) => {
            error!(task = %name, run_id, error = %format!("{err:#}"), "task execution error");
            TaskOutcome::Failed
        }
    };

    if let Err(err) = runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: name.clone(),
            outcome,
        })
        .await
    {
        warn!(task = %name, run_id, error = %err, "runtime gone; dropping completion");
    }
}

async fn run_task_inner(
    task: ScheduledTask,
    env: Arc<TaskEnv>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    cancel: CancelToken,
    stop_rx: oneshot::Receiver<()>,
) -> Result<Option<TaskOutcome>> {
    let id = TaskId::from_str(&task.name)?;
    info!(task = %id, run_id = task.run_id, "starting task");

    if id == TaskId::Serve {
        return run_server(id, env, runtime_tx, stop_rx).await;
    }

    let batch = env
        .registry
        .get(id)
        .ok_or_else(|| anyhow!("no runner registered for task '{id}'"))?;
    let ctx = Arc::clone(&env.ctx);

    let outcome = tokio::task::spawn_blocking(move || execute(batch.as_ref(), &ctx, &cancel))
        .await
        .with_context(|| format!("joining blocking thread of task '{id}'"))?;

    info!(task = %id, run_id = task.run_id, ?outcome, "task finished");
    Ok(Some(outcome))
}

async fn run_server(
    id: TaskId,
    env: Arc<TaskEnv>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    stop_rx: oneshot::Receiver<()>,
) -> Result<Option<TaskOutcome>> {
    let (ready_tx, ready_rx) = oneshot::channel();
    let ctx = Arc::clone(&env.ctx);
    let mut server = tokio::spawn(async move { serve::run(ctx, ready_tx, stop_rx).await });

    let ready = tokio::select! {
        ready = ready_rx => ready.ok(),
        finished = &mut server => {
            let err = startup_error(finished);
            env.ctx.notifier.failure(&format!("{err:#}"));
            return Ok(Some(TaskOutcome::Failed));
        }
    };

    let Some(addr) = ready else {
        let err = startup_error(server.await);
        env.ctx.notifier.failure(&format!("{err:#}"));
        return Ok(Some(TaskOutcome::Failed));
    };

    info!(task = %id, %addr, "dev server listening");
    runtime_tx
        .send(RuntimeEvent::TaskProgressed {
            task: id.as_str().to_string(),
        })
        .await
        .with_context(|| format!("sending TaskProgressed for '{id}'"))?;

    match server.await {
        Ok(Ok(())) => info!(task = %id, "dev server stopped"),
        Ok(Err(e)) => {
            error!(task = %id, error = %format!("{e:#}"), "dev server failed");
            env.ctx.notifier.failure(&format!("{e:#}"));
        }
        Err(join) => warn!(task = %id, error = %join, "dev server task aborted"),
    }
    Ok(None)
}

/// Why the server ended before it was listening.
fn startup_error(finished: std::result::Result<Result<()>, tokio::task::JoinError>) -> anyhow::Error {
    match finished {
        Ok(Ok(())) => anyhow!("server stopped before listening"),
        Ok(Err(e)) => e,
        Err(join) => anyhow!(join),
    }
}
