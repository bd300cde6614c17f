// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait the runtime talks to,
//!   and `PipelineBackend`, the production implementation.
//! - [`executor_loop`] owns the background loop that keeps at most one
//!   instance per task name and routes cancellation requests.
//! - [`task_runner`] runs one task instance: batch tasks on the blocking
//!   pool, the dev server on the async runtime.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, PipelineBackend};
pub use executor_loop::{ExecRequest, spawn_executor};
pub use task_runner::TaskEnv;
