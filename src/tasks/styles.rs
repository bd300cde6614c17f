// src/tasks/styles.rs

use crate::config::{ConfigFile, InputCategory, OutputCategory, PathTable};
use crate::errors::{AssetpipeError, Result};
use crate::pipeline::dest::{InitMaps, WriteMaps};
use crate::pipeline::{CancelToken, PerFile, Pipeline, PipelineError};
use crate::tasks::{AssetTask, TaskContext, TaskId, build};
use crate::transform::css::{Autoprefix, SassCompile};

/// Sass entry points compiled, prefixed and minified into `css/`.
///
/// A file that fails to compile is reported and dropped; the rest of the
/// stylesheets are still written.
pub struct StylesTask {
    pipeline: Pipeline,
}

impl StylesTask {
    pub fn from_config(cfg: &ConfigFile, paths: &PathTable) -> Result<Self> {
        let prefixer = Autoprefix::new(&cfg.styles.browsers)
            .map_err(|e| AssetpipeError::Config(format!("[styles].browsers: {e:#}")))?;
        Ok(Self {
            pipeline: Pipeline::new()
                .pipe(InitMaps)
                .pipe(PerFile::skip(SassCompile))
                .pipe(PerFile::halt(prefixer))
                .pipe(WriteMaps::new(paths.maps_dir())),
        })
    }
}

impl AssetTask for StylesTask {
    fn id(&self) -> TaskId {
        TaskId::Styles
    }

    fn stages(&self) -> Vec<String> {
        self.pipeline.stage_names().into_iter().map(str::to_string).collect()
    }

    fn run(&self, ctx: &TaskContext, cancel: &CancelToken) -> std::result::Result<(), PipelineError> {
        let input = ctx.read_inputs(InputCategory::Styles)?;
        let written = build(ctx, cancel, self.id(), input, &self.pipeline, OutputCategory::Css)?;
        if !written.is_empty() {
            ctx.notifier.success("Styles task complete");
        }
        Ok(())
    }
}
