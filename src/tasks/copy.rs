// src/tasks/copy.rs

use tracing::debug;

use crate::config::{InputCategory, OutputCategory};
use crate::pipeline::dest::write_all;
use crate::pipeline::{CancelToken, PipelineError};
use crate::tasks::{AssetTask, TaskContext, TaskId};

/// Input/output pairs copied verbatim.
const COPIES: [(InputCategory, OutputCategory); 2] = [
    (InputCategory::JsLib, OutputCategory::JsLib),
    (InputCategory::Fonts, OutputCategory::Fonts),
];

/// Vendor script libraries and fonts, byte-for-byte.
#[derive(Debug, Default)]
pub struct CopyTask;

impl CopyTask {
    pub fn new() -> Self {
        Self
    }
}

impl AssetTask for CopyTask {
    fn id(&self) -> TaskId {
        TaskId::CopyTask
    }

    fn stages(&self) -> Vec<String> {
        vec!["copy".to_string()]
    }

    fn run(&self, ctx: &TaskContext, cancel: &CancelToken) -> Result<(), PipelineError> {
        let sctx = ctx.stage_context(self.id().as_str(), cancel);
        for (input, output) in COPIES {
            cancel.check()?;
            let assets = ctx.read_inputs(input)?;
            let written = write_all(&assets, ctx.paths.output(output), &sctx)?;
            debug!(from = input.as_str(), files = written.len(), "copied");
        }
        Ok(())
    }
}
