// src/errors.rs

//! Errors that stop assetpipe before any task runs.
//!
//! Failures inside a task are [`crate::pipeline::PipelineError`]s instead:
//! they are reported through the notifier and never abort the process.

use std::path::PathBuf;

use thiserror::Error;

use crate::tasks::TaskId;

#[derive(Error, Debug)]
pub enum AssetpipeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot read {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid TOML: {source}", path.display())]
    ConfigSyntax {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown task '{0}'; expected one of: {expected}", expected = known_tasks())]
    UnknownTask(String),

    #[error("task ordering has a cycle through '{0}'")]
    DependencyCycle(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AssetpipeError>;

fn known_tasks() -> String {
    let mut names = vec![crate::DEFAULT_TASK, crate::WATCH_TASK];
    names.extend(TaskId::ALL.iter().map(|id| id.as_str()));
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_task_lists_the_alternatives() {
        let msg = AssetpipeError::UnknownTask("sass".into()).to_string();
        assert!(msg.starts_with("unknown task 'sass'"));
        assert!(msg.contains("default, watch, sprite"));
        assert!(msg.ends_with("copyTask, serve"));
    }
}
