// src/tasks/mod.rs

//! The built-in asset tasks.
//!
//! Every batch task implements [`AssetTask`]: it resolves its inputs from the
//! [`PathTable`], pushes them through a [`Pipeline`] and writes the result.
//! The long-lived `serve` task lives in [`crate::serve`] and is driven
//! directly by the executor.

pub mod app_annotate;
pub mod copy;
pub mod html;
pub mod images;
pub mod ngdocs;
pub mod scripts;
pub mod sprite;
pub mod styles;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use tracing::{debug, error, info};

use crate::config::{ConfigFile, InputCategory, OutputCategory, PathTable};
use crate::engine::TaskOutcome;
use crate::errors::{AssetpipeError, Result};
use crate::fs::FileSystem;
use crate::notifier::Notifier;
use crate::pipeline::dest::write_all;
use crate::pipeline::source::read_assets;
use crate::pipeline::{Asset, CancelToken, Pipeline, PipelineError, StageContext};
use crate::transform::images::{CompressionService, ImageCache, open_cache};

/// Identifier of a built-in task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskId {
    Sprite,
    Styles,
    Scripts,
    AppDeps,
    AppAnnotate,
    AppNgdocs,
    AppHtmlMinify,
    AppHtmlify,
    Images,
    CopyTask,
    Serve,
}

impl TaskId {
    pub const ALL: [TaskId; 11] = [
        TaskId::Sprite,
        TaskId::Styles,
        TaskId::Scripts,
        TaskId::AppDeps,
        TaskId::AppAnnotate,
        TaskId::AppNgdocs,
        TaskId::AppHtmlMinify,
        TaskId::AppHtmlify,
        TaskId::Images,
        TaskId::CopyTask,
        TaskId::Serve,
    ];

    /// Tasks triggered by the `default` aggregate, in declared order.
    pub const DEFAULT: [TaskId; 10] = [
        TaskId::CopyTask,
        TaskId::Styles,
        TaskId::Scripts,
        TaskId::Sprite,
        TaskId::AppDeps,
        TaskId::AppAnnotate,
        TaskId::AppNgdocs,
        TaskId::AppHtmlMinify,
        TaskId::AppHtmlify,
        TaskId::Images,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskId::Sprite => "sprite",
            TaskId::Styles => "styles",
            TaskId::Scripts => "scripts",
            TaskId::AppDeps => "app-deps",
            TaskId::AppAnnotate => "app-annotate",
            TaskId::AppNgdocs => "app-ngdocs",
            TaskId::AppHtmlMinify => "app-html-minify",
            TaskId::AppHtmlify => "app-htmlify",
            TaskId::Images => "images",
            TaskId::CopyTask => "copyTask",
            TaskId::Serve => "serve",
        }
    }

    /// Long-lived tasks report progress instead of completing.
    pub fn is_long_lived(self) -> bool {
        matches!(self, TaskId::Serve)
    }

    /// Input categories whose changes re-run this task in watch mode.
    pub fn watch_inputs(self) -> &'static [InputCategory] {
        match self {
            TaskId::Sprite => &[InputCategory::Sprite],
            TaskId::Styles => &[InputCategory::Styles],
            TaskId::Scripts => &[InputCategory::Scripts],
            TaskId::AppDeps => &[InputCategory::AppDeps],
            TaskId::AppAnnotate => &[InputCategory::App, InputCategory::HtmlTemplates],
            TaskId::AppNgdocs => &[InputCategory::App],
            TaskId::AppHtmlMinify => &[InputCategory::HtmlTemplates],
            TaskId::AppHtmlify => &[InputCategory::Htmlify],
            TaskId::Images => &[InputCategory::Images],
            TaskId::CopyTask => &[InputCategory::JsLib, InputCategory::Fonts],
            TaskId::Serve => &[],
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskId {
    type Err = AssetpipeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TaskId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| AssetpipeError::UnknownTask(s.to_string()))
    }
}

/// Shared collaborators every task receives.
///
/// Built once per process; tasks only ever read from it (the image cache
/// is the one piece of state that outlives a run, behind its own lock).
pub struct TaskContext {
    pub fs: Arc<dyn FileSystem>,
    pub notifier: Arc<dyn Notifier>,
    pub paths: Arc<PathTable>,
    pub config: Arc<ConfigFile>,
    pub compressor: Arc<dyn CompressionService>,
    pub image_cache: Mutex<Box<dyn ImageCache>>,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl TaskContext {
    pub fn new(
        config: Arc<ConfigFile>,
        paths: Arc<PathTable>,
        fs: Arc<dyn FileSystem>,
        notifier: Arc<dyn Notifier>,
        compressor: Arc<dyn CompressionService>,
    ) -> Self {
        let image_cache = open_cache(config.config.cache_storage_mode, paths.root(), fs.clone());
        Self {
            fs,
            notifier,
            paths,
            config,
            compressor,
            image_cache: Mutex::new(image_cache),
        }
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn stage_context<'a>(&'a self, task: &'a str, cancel: &'a CancelToken) -> StageContext<'a> {
        StageContext {
            task,
            root: self.paths.root(),
            fs: self.fs.as_ref(),
            notifier: self.notifier.as_ref(),
            cancel,
        }
    }

    /// Resolve the input globs of `category` into assets.
    pub fn read_inputs(&self, category: InputCategory) -> std::result::Result<Vec<Asset>, PipelineError> {
        read_assets(self.fs.as_ref(), self.root(), self.paths.inputs(category))
            .with_context(|| format!("reading {} inputs", category.as_str()))
            .map_err(|e| PipelineError::stage("src", format!("{e:#}")))
    }
}

/// A batch task: runs to completion (or cancellation) on a blocking thread.
pub trait AssetTask: Send + Sync {
    fn id(&self) -> TaskId;

    /// Stage names, in order, for `--dry-run`.
    fn stages(&self) -> Vec<String>;

    /// Run once. Success notifications are the task's own business;
    /// failures are reported by [`execute`].
    fn run(&self, ctx: &TaskContext, cancel: &CancelToken) -> std::result::Result<(), PipelineError>;
}

/// Resolve `input`, run `pipeline`, write to `output`.
///
/// An empty input is not an error and writes nothing.
pub fn build(
    ctx: &TaskContext,
    cancel: &CancelToken,
    task: TaskId,
    input: Vec<Asset>,
    pipeline: &Pipeline,
    output: OutputCategory,
) -> std::result::Result<Vec<PathBuf>, PipelineError> {
    if input.is_empty() {
        debug!(task = %task, "no input files; nothing to do");
        return Ok(Vec::new());
    }
    let sctx = ctx.stage_context(task.as_str(), cancel);
    let assets = pipeline.run(input, &sctx)?;
    write_all(&assets, ctx.paths.output(output), &sctx)
}

/// Run a task and translate its result into a scheduler outcome.
///
/// A failure is reported through the notifier; it never propagates further.
pub fn execute(task: &dyn AssetTask, ctx: &TaskContext, cancel: &CancelToken) -> TaskOutcome {
    let id = task.id();
    info!(task = %id, "task started");
    match task.run(ctx, cancel) {
        Ok(()) => {
            info!(task = %id, "task finished");
            TaskOutcome::Success
        }
        Err(PipelineError::Cancelled) => {
            info!(task = %id, "task cancelled");
            TaskOutcome::Cancelled
        }
        Err(err) => {
            error!(task = %id, error = %err, "task failed");
            ctx.notifier.failure(&err);
            TaskOutcome::Failed
        }
    }
}

/// The batch tasks, keyed by id.
pub struct TaskRegistry {
    tasks: HashMap<TaskId, Arc<dyn AssetTask>>,
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.tasks.keys().collect();
        ids.sort();
        f.debug_struct("TaskRegistry").field("tasks", &ids).finish()
    }
}

impl TaskRegistry {
    /// Build every batch task from configuration.
    pub fn builtin(cfg: &ConfigFile, paths: &PathTable) -> Result<Self> {
        let mut registry = Self {
            tasks: HashMap::new(),
        };
        registry.insert(sprite::SpriteTask::new());
        registry.insert(styles::StylesTask::from_config(cfg, paths)?);
        registry.insert(scripts::ScriptsTask::from_config(cfg, paths));
        registry.insert(scripts::AppDepsTask::from_config(cfg, paths));
        registry.insert(app_annotate::AppAnnotateTask::from_config(cfg, paths));
        registry.insert(ngdocs::NgDocsTask::new().map_err(|e| AssetpipeError::Other(e.into()))?);
        registry.insert(html::HtmlMinifyTask::new());
        registry.insert(html::HtmlifyTask::from_config(cfg));
        registry.insert(images::ImagesTask::new());
        registry.insert(copy::CopyTask::new());
        Ok(registry)
    }

    pub fn insert(&mut self, task: impl AssetTask + 'static) {
        self.tasks.insert(task.id(), Arc::new(task));
    }

    pub fn get(&self, id: TaskId) -> Option<Arc<dyn AssetTask>> {
        self.tasks.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for id in TaskId::ALL {
            assert_eq!(id.as_str().parse::<TaskId>().unwrap(), id);
        }
        assert!("copytask".parse::<TaskId>().is_err());
    }

    #[test]
    fn default_covers_every_batch_task() {
        for id in TaskId::ALL {
            assert_eq!(TaskId::DEFAULT.contains(&id), !id.is_long_lived(), "{id}");
        }
    }

    #[test]
    fn app_sources_drive_annotate_and_docs() {
        let watchers: Vec<TaskId> = TaskId::ALL
            .into_iter()
            .filter(|id| id.watch_inputs().contains(&InputCategory::App))
            .collect();
        assert_eq!(watchers, [TaskId::AppAnnotate, TaskId::AppNgdocs]);
    }
}
