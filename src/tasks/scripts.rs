// src/tasks/scripts.rs

//! Plain script bundles: the site script and the vendor dependencies.

use crate::config::{ConfigFile, InputCategory, OutputCategory, PathTable};
use crate::pipeline::dest::{InitMaps, WriteMaps};
use crate::pipeline::{CancelToken, PerFile, Pipeline, PipelineError};
use crate::tasks::{AssetTask, TaskContext, TaskId, build};
use crate::transform::concat::Concat;
use crate::transform::js::{Downlevel, MinifyJs};

fn stage_list(pipeline: &Pipeline) -> Vec<String> {
    pipeline.stage_names().into_iter().map(str::to_string).collect()
}

/// `scripts.js`, down-levelled, concatenated and minified.
pub struct ScriptsTask {
    pipeline: Pipeline,
}

impl ScriptsTask {
    pub fn from_config(cfg: &ConfigFile, paths: &PathTable) -> Self {
        Self {
            pipeline: Pipeline::new()
                .pipe(InitMaps)
                .pipe(PerFile::halt(Downlevel))
                .pipe(Concat::new("scripts.js"))
                .pipe(PerFile::halt(MinifyJs::new(
                    cfg.minify.min_suffix.clone(),
                    cfg.minify.keep_source,
                )))
                .pipe(WriteMaps::new(paths.maps_dir())),
        }
    }
}

impl AssetTask for ScriptsTask {
    fn id(&self) -> TaskId {
        TaskId::Scripts
    }

    fn stages(&self) -> Vec<String> {
        stage_list(&self.pipeline)
    }

    fn run(&self, ctx: &TaskContext, cancel: &CancelToken) -> Result<(), PipelineError> {
        let input = ctx.read_inputs(InputCategory::Scripts)?;
        let written = build(ctx, cancel, self.id(), input, &self.pipeline, OutputCategory::Js)?;
        if !written.is_empty() {
            ctx.notifier.success("Scripts task complete");
        }
        Ok(())
    }
}

/// Vendor libraries concatenated into `app-deps.js` in declared order.
pub struct AppDepsTask {
    pipeline: Pipeline,
}

impl AppDepsTask {
    pub fn from_config(cfg: &ConfigFile, paths: &PathTable) -> Self {
        Self {
            pipeline: Pipeline::new()
                .pipe(InitMaps)
                .pipe(Concat::new("app-deps.js"))
                .pipe(PerFile::halt(MinifyJs::new(
                    cfg.minify.min_suffix.clone(),
                    cfg.minify.keep_source,
                )))
                .pipe(WriteMaps::new(paths.maps_dir())),
        }
    }
}

impl AssetTask for AppDepsTask {
    fn id(&self) -> TaskId {
        TaskId::AppDeps
    }

    fn stages(&self) -> Vec<String> {
        stage_list(&self.pipeline)
    }

    fn run(&self, ctx: &TaskContext, cancel: &CancelToken) -> Result<(), PipelineError> {
        let input = ctx.read_inputs(InputCategory::AppDeps)?;
        let written = build(ctx, cancel, self.id(), input, &self.pipeline, OutputCategory::Js)?;
        if !written.is_empty() {
            ctx.notifier.success("App dependences task complete");
        }
        Ok(())
    }
}
