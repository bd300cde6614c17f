// src/tasks/app_annotate.rs

use crate::config::{ConfigFile, InputCategory, OutputCategory, PathTable};
use crate::pipeline::dest::{InitMaps, WriteMaps};
use crate::pipeline::{Asset, CancelToken, PerFile, Pipeline, PipelineError};
use crate::tasks::{AssetTask, TaskContext, TaskId, build};
use crate::transform::concat::Concat;
use crate::transform::js::{Annotate, MinifyJs};
use crate::transform::templates::TemplateCache;

/// Directory the generated template script appears under in source maps.
const TEMPLATES_DIR: &str = "templates";

/// The application bundle: ordered sources plus the generated template
/// cache, concatenated into `app.js`, DI-annotated and minified.
pub struct AppAnnotateTask {
    templates: Pipeline,
    pipeline: Pipeline,
}

impl AppAnnotateTask {
    pub fn from_config(cfg: &ConfigFile, paths: &PathTable) -> Self {
        Self {
            templates: Pipeline::new().pipe(TemplateCache::from_config(&cfg.templates)),
            pipeline: Pipeline::new()
                .pipe(InitMaps)
                .pipe(Concat::new("app.js"))
                .pipe(PerFile::halt(Annotate))
                .pipe(PerFile::halt(MinifyJs::new(
                    cfg.minify.min_suffix.clone(),
                    cfg.minify.keep_source,
                )))
                .pipe(WriteMaps::new(paths.maps_dir())),
        }
    }

    /// The template-cache registration script, or nothing without templates.
    fn template_script(&self, ctx: &TaskContext, cancel: &CancelToken) -> Result<Vec<Asset>, PipelineError> {
        let html = ctx.read_inputs(InputCategory::HtmlTemplates)?;
        if html.is_empty() {
            return Ok(Vec::new());
        }
        let sctx = ctx.stage_context(self.id().as_str(), cancel);
        let mut generated = self.templates.run(html, &sctx)?;
        for asset in &mut generated {
            asset.relative = format!("{TEMPLATES_DIR}/{}", asset.relative);
            asset.origin = asset.relative.clone();
        }
        Ok(generated)
    }
}

impl AssetTask for AppAnnotateTask {
    fn id(&self) -> TaskId {
        TaskId::AppAnnotate
    }

    fn stages(&self) -> Vec<String> {
        let mut stages: Vec<String> = self
            .templates
            .stage_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        stages.extend(self.pipeline.stage_names().into_iter().map(str::to_string));
        stages
    }

    fn run(&self, ctx: &TaskContext, cancel: &CancelToken) -> Result<(), PipelineError> {
        let mut input = ctx.read_inputs(InputCategory::App)?;
        input.extend(self.template_script(ctx, cancel)?);

        let written = build(ctx, cancel, self.id(), input, &self.pipeline, OutputCategory::Js)?;
        if !written.is_empty() {
            ctx.notifier.success("App task complete");
        }
        Ok(())
    }
}
