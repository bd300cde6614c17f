// src/tasks/html.rs

//! HTML tasks: minified component templates and rewritten views.

use crate::config::{ConfigFile, InputCategory, OutputCategory};
use crate::pipeline::{CancelToken, PerFile, Pipeline, PipelineError};
use crate::tasks::{AssetTask, TaskContext, TaskId, build};
use crate::transform::html::htmlify::Htmlify;
use crate::transform::html::minify::CollapseWhitespace;
use crate::transform::rename::Flatten;

const TEMPLATES_DONE: &str = "App templates task complete";

/// Component templates, whitespace-collapsed and flattened into one directory.
pub struct HtmlMinifyTask {
    pipeline: Pipeline,
}

impl HtmlMinifyTask {
    pub fn new() -> Self {
        Self {
            pipeline: Pipeline::new()
                .pipe(PerFile::halt(CollapseWhitespace))
                .pipe(PerFile::halt(Flatten)),
        }
    }
}

impl Default for HtmlMinifyTask {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetTask for HtmlMinifyTask {
    fn id(&self) -> TaskId {
        TaskId::AppHtmlMinify
    }

    fn stages(&self) -> Vec<String> {
        self.pipeline.stage_names().into_iter().map(str::to_string).collect()
    }

    fn run(&self, ctx: &TaskContext, cancel: &CancelToken) -> Result<(), PipelineError> {
        let input = ctx.read_inputs(InputCategory::HtmlTemplates)?;
        let written = build(ctx, cancel, self.id(), input, &self.pipeline, OutputCategory::Templates)?;
        if !written.is_empty() {
            ctx.notifier.success(TEMPLATES_DONE);
        }
        Ok(())
    }
}

/// Views with framework attributes rewritten to valid `data-` attributes.
pub struct HtmlifyTask {
    pipeline: Pipeline,
}

impl HtmlifyTask {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            pipeline: Pipeline::new().pipe(PerFile::halt(Htmlify::new(cfg.htmlify.prefixes.clone()))),
        }
    }
}

impl AssetTask for HtmlifyTask {
    fn id(&self) -> TaskId {
        TaskId::AppHtmlify
    }

    fn stages(&self) -> Vec<String> {
        self.pipeline.stage_names().into_iter().map(str::to_string).collect()
    }

    fn run(&self, ctx: &TaskContext, cancel: &CancelToken) -> Result<(), PipelineError> {
        let input = ctx.read_inputs(InputCategory::Htmlify)?;
        let written = build(ctx, cancel, self.id(), input, &self.pipeline, OutputCategory::Root)?;
        if !written.is_empty() {
            ctx.notifier.success(TEMPLATES_DONE);
        }
        Ok(())
    }
}
