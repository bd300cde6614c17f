// src/pipeline/mod.rs

//! Stream pipeline: in-memory assets flowing through ordered stages.
//!
//! - [`source`] resolves input globs into assets (base-relative paths).
//! - [`dest`] writes the surviving assets below a destination directory.
//! - [`sourcemap`] carries v3 source maps through the stages.
//!
//! A task builds one [`Pipeline`], feeds it the resolved sources and writes
//! the result. Stages run strictly in sequence; the only branch is a failure,
//! which either stops the pipeline ([`FailurePolicy::Halt`]) or drops the
//! offending file after notifying ([`FailurePolicy::Skip`]).

pub mod dest;
pub mod source;
pub mod sourcemap;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::notifier::Notifier;

pub use sourcemap::SourceMap;

/// Failure of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} failed on {file}: {message}")]
    File {
        stage: String,
        file: String,
        message: String,
    },

    #[error("{stage} failed: {message}")]
    Stage { stage: String, message: String },

    #[error("pipeline cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn stage(stage: &str, err: impl std::fmt::Display) -> Self {
        PipelineError::Stage {
            stage: stage.to_string(),
            message: err.to_string(),
        }
    }

    fn file(stage: &str, file: &str, err: &anyhow::Error) -> Self {
        PipelineError::File {
            stage: stage.to_string(),
            file: file.to_string(),
            message: format!("{err:#}"),
        }
    }
}

/// An in-memory file travelling through a pipeline.
#[derive(Debug, Clone)]
pub struct Asset {
    /// Output path relative to the destination directory, `/`-separated.
    pub relative: String,
    /// Project-relative path of the file this asset was read from.
    pub origin: String,
    pub contents: Vec<u8>,
    pub source_map: Option<SourceMap>,
}

impl Asset {
    pub fn new(relative: impl Into<String>, origin: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            relative: relative.into(),
            origin: origin.into(),
            contents,
            source_map: None,
        }
    }

    /// Contents as UTF-8 text.
    pub fn text(&self) -> anyhow::Result<&str> {
        std::str::from_utf8(&self.contents)
            .map_err(|e| anyhow::anyhow!("{} is not valid UTF-8: {e}", self.origin))
    }

    pub fn set_text(&mut self, text: String) {
        self.contents = text.into_bytes();
    }

    /// File name component of `relative`.
    pub fn file_name(&self) -> &str {
        self.relative.rsplit('/').next().unwrap_or(&self.relative)
    }

    /// File name without its last extension.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }

    /// Replace the last extension of `relative` (`ext` without the dot).
    pub fn set_extension(&mut self, ext: &str) {
        let name_start = self.relative.rfind('/').map(|i| i + 1).unwrap_or(0);
        let stem_end = match self.relative[name_start..].rfind('.') {
            Some(0) | None => self.relative.len(),
            Some(idx) => name_start + idx,
        };
        self.relative.truncate(stem_end);
        self.relative.push('.');
        self.relative.push_str(ext);
    }
}

/// Cooperative cancellation flag shared between the executor and a running
/// pipeline. Checked between stages and between files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything a stage may touch while running.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub task: &'a str,
    pub root: &'a Path,
    pub fs: &'a dyn FileSystem,
    pub notifier: &'a dyn Notifier,
    pub cancel: &'a CancelToken,
}

/// One step of a pipeline, operating on the whole batch of assets.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, assets: Vec<Asset>, ctx: &StageContext<'_>) -> Result<Vec<Asset>, PipelineError>;
}

/// A per-file transformation; wrap it in [`PerFile`] to get a [`Stage`].
///
/// Returning several assets is allowed (e.g. a minifier that keeps the
/// source next to the minified file); returning none drops the file.
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, asset: Asset, ctx: &StageContext<'_>) -> anyhow::Result<Vec<Asset>>;
}

/// What a per-file stage does when one file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the whole pipeline with the error.
    Halt,
    /// Notify, drop the failing file, keep processing the others.
    Skip,
}

pub struct PerFile<T> {
    inner: T,
    policy: FailurePolicy,
}

impl<T: Transform> PerFile<T> {
    pub fn halt(inner: T) -> Self {
        Self {
            inner,
            policy: FailurePolicy::Halt,
        }
    }

    pub fn skip(inner: T) -> Self {
        Self {
            inner,
            policy: FailurePolicy::Skip,
        }
    }
}

impl<T: Transform> Stage for PerFile<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn run(&self, assets: Vec<Asset>, ctx: &StageContext<'_>) -> Result<Vec<Asset>, PipelineError> {
        let mut out = Vec::with_capacity(assets.len());
        for asset in assets {
            ctx.cancel.check()?;
            let origin = asset.origin.clone();
            match self.inner.apply(asset, ctx) {
                Ok(mut produced) => out.append(&mut produced),
                Err(err) => {
                    let error = PipelineError::file(self.inner.name(), &origin, &err);
                    match self.policy {
                        FailurePolicy::Halt => return Err(error),
                        FailurePolicy::Skip => {
                            warn!(
                                task = %ctx.task,
                                stage = %self.inner.name(),
                                file = %origin,
                                error = %format!("{err:#}"),
                                "file failed; continuing with the rest"
                            );
                            ctx.notifier.failure(&error);
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Ordered list of stages.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipe(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order over `input`.
    pub fn run(&self, input: Vec<Asset>, ctx: &StageContext<'_>) -> Result<Vec<Asset>, PipelineError> {
        let mut assets = input;
        for stage in &self.stages {
            ctx.cancel.check()?;
            debug!(
                task = %ctx.task,
                stage = %stage.name(),
                files = assets.len(),
                "running stage"
            );
            assets = stage.run(assets, ctx)?;
        }
        ctx.cancel.check()?;
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_extension_replaces_only_the_last_one() {
        let mut a = Asset::new("sub/site.min.scss", "src/sub/site.min.scss", Vec::new());
        a.set_extension("css");
        assert_eq!(a.relative, "sub/site.min.css");
        assert_eq!(a.stem(), "site.min");

        let mut b = Asset::new("LICENSE", "LICENSE", Vec::new());
        b.set_extension("txt");
        assert_eq!(b.relative, "LICENSE.txt");
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(matches!(token.check(), Err(PipelineError::Cancelled)));
    }
}
