// src/exec/backend.rs

use std::sync::Arc;

use anyhow::anyhow;
use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskName};
use crate::errors::{AssetpipeError, Result};

use super::executor_loop::{ExecRequest, spawn_executor};
use super::task_runner::TaskEnv;

/// Where the runtime sends scheduled tasks.
///
/// Every dispatched task must eventually answer with a `TaskCompleted`
/// event (or `TaskProgressed` for `serve`) on the runtime channel; a fake
/// in `assetpipe-test-utils` does exactly that without running anything.
pub trait ExecutorBackend: Send {
    fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> BoxFuture<'_, Result<()>>;

    /// Cancelled instances still report `TaskCompleted`, normally with
    /// `Cancelled`.
    fn cancel_tasks(&mut self, tasks: Vec<TaskName>) -> BoxFuture<'_, Result<()>>;
}

/// Runs the real pipelines through [`spawn_executor`].
pub struct PipelineBackend {
    requests: mpsc::Sender<ExecRequest>,
}

impl PipelineBackend {
    pub fn new(env: Arc<TaskEnv>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            requests: spawn_executor(env, runtime_tx),
        }
    }

    fn send(&self, requests: Vec<ExecRequest>) -> BoxFuture<'static, Result<()>> {
        let tx = self.requests.clone();
        Box::pin(async move {
            for request in requests {
                tx.send(request)
                    .await
                    .map_err(|_| AssetpipeError::Other(anyhow!("executor loop has stopped")))?;
            }
            Ok(())
        })
    }
}

impl ExecutorBackend for PipelineBackend {
    fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> BoxFuture<'_, Result<()>> {
        self.send(tasks.into_iter().map(ExecRequest::Run).collect())
    }

    fn cancel_tasks(&mut self, tasks: Vec<TaskName>) -> BoxFuture<'_, Result<()>> {
        self.send(vec![ExecRequest::Cancel(tasks)])
    }
}
