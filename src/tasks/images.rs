// src/tasks/images.rs

use tracing::{debug, info};

use crate::config::{InputCategory, OutputCategory};
use crate::pipeline::dest::write_all;
use crate::pipeline::source::resolve;
use crate::pipeline::{Asset, CancelToken, PipelineError};
use crate::tasks::{AssetTask, TaskContext, TaskId};
use crate::transform::images::content_hash;

const STAGE: &str = "tinypng";

/// Lossy image compression through the configured service.
///
/// Files whose bytes match the cache are never resubmitted, and a cache
/// that cannot be read fails the task before anything is submitted. The
/// first service failure stops the task; files already compressed in this
/// run keep their outputs and cache entries.
#[derive(Debug, Default)]
pub struct ImagesTask;

impl ImagesTask {
    pub fn new() -> Self {
        Self
    }
}

fn file_error(file: &str, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::File {
        stage: STAGE.to_string(),
        file: file.to_string(),
        message: err.to_string(),
    }
}

impl AssetTask for ImagesTask {
    fn id(&self) -> TaskId {
        TaskId::Images
    }

    fn stages(&self) -> Vec<String> {
        vec!["cached".to_string(), STAGE.to_string()]
    }

    fn run(&self, ctx: &TaskContext, cancel: &CancelToken) -> Result<(), PipelineError> {
        let root = ctx.root();
        let sources = resolve(ctx.fs.as_ref(), root, ctx.paths.inputs(InputCategory::Images))
            .map_err(|e| PipelineError::stage("src", format!("{e:#}")))?;

        let mut cache = ctx
            .image_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let present: Vec<&str> = sources.iter().map(|s| s.origin.as_str()).collect();
        cache
            .begin_run(&present)
            .map_err(|e| PipelineError::stage("cached", format!("{e:#}")))?;

        let sctx = ctx.stage_context(self.id().as_str(), cancel);
        let mut compressed_count = 0usize;

        for file in &sources {
            cancel.check()?;

            let data = ctx
                .fs
                .read(&root.join(&file.origin))
                .map_err(|e| file_error(&file.origin, format!("{e:#}")))?;
            let hash = content_hash(&data);

            if cache.is_fresh(&file.origin, &hash) {
                debug!(file = %file.origin, "unchanged since last compression; skipping");
                continue;
            }

            let compressed = ctx
                .compressor
                .compress(&file.origin, &data)
                .map_err(|e| file_error(&file.origin, e))?;

            info!(
                file = %file.origin,
                before = data.len(),
                after = compressed.len(),
                "image compressed"
            );

            let asset = Asset::new(file.relative.clone(), file.origin.clone(), compressed);
            write_all(std::slice::from_ref(&asset), ctx.paths.output(OutputCategory::Img), &sctx)?;

            cache
                .save(&file.origin, &hash)
                .map_err(|e| file_error(&file.origin, format!("{e:#}")))?;
            compressed_count += 1;

            ctx.notifier
                .success(&format!("Image Task Completed: {}", file.relative));
        }

        debug!(compressed = compressed_count, total = sources.len(), "images done");
        Ok(())
    }
}
