// src/dag/mod.rs

//! Task ordering.
//!
//! [`DagGraph`] holds the `after` edges from the config; [`Scheduler`]
//! tracks one run over them and hands out tasks as their dependencies
//! settle.

pub mod graph;
pub mod scheduler;
pub mod task_info;

pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use task_info::{ScheduledTask, TaskRunState};
