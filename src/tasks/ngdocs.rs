// src/tasks/ngdocs.rs

use crate::config::{InputCategory, OutputCategory};
use crate::pipeline::{CancelToken, Pipeline, PipelineError};
use crate::tasks::{AssetTask, TaskContext, TaskId, build};
use crate::transform::ngdocs::NgDocs;

/// API documentation site generated from `@ngdoc` comments.
pub struct NgDocsTask {
    pipeline: Pipeline,
}

impl NgDocsTask {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pipeline: Pipeline::new().pipe(NgDocs::new()?),
        })
    }
}

impl AssetTask for NgDocsTask {
    fn id(&self) -> TaskId {
        TaskId::AppNgdocs
    }

    fn stages(&self) -> Vec<String> {
        self.pipeline.stage_names().into_iter().map(str::to_string).collect()
    }

    fn run(&self, ctx: &TaskContext, cancel: &CancelToken) -> Result<(), PipelineError> {
        let input = ctx.read_inputs(InputCategory::App)?;
        let written = build(ctx, cancel, self.id(), input, &self.pipeline, OutputCategory::Docs)?;
        if !written.is_empty() {
            ctx.notifier.success("App Documents task complete");
        }
        Ok(())
    }
}
