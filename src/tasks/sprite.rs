// src/tasks/sprite.rs

use crate::config::{InputCategory, OutputCategory};
use crate::pipeline::{CancelToken, Pipeline, PipelineError};
use crate::tasks::{AssetTask, TaskContext, TaskId, build};
use crate::transform::sprite::SymbolSprite;

/// Every SVG icon becomes a `<symbol>` in `svg/spritemap.svg`.
pub struct SpriteTask {
    pipeline: Pipeline,
}

impl SpriteTask {
    pub fn new() -> Self {
        Self {
            pipeline: Pipeline::new().pipe(SymbolSprite::new("spritemap")),
        }
    }
}

impl Default for SpriteTask {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetTask for SpriteTask {
    fn id(&self) -> TaskId {
        TaskId::Sprite
    }

    fn stages(&self) -> Vec<String> {
        self.pipeline.stage_names().into_iter().map(str::to_string).collect()
    }

    fn run(&self, ctx: &TaskContext, cancel: &CancelToken) -> Result<(), PipelineError> {
        let input = ctx.read_inputs(InputCategory::Sprite)?;
        let written = build(ctx, cancel, self.id(), input, &self.pipeline, OutputCategory::Svg)?;
        if !written.is_empty() {
            ctx.notifier.success("SVG task complete");
        }
        Ok(())
    }
}
