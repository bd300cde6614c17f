#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use assetpipe::config::{ConfigFile, PathTable, RawConfigFile, TaskConfig};
use assetpipe::fs::RealFileSystem;
use assetpipe::notifier::Notifier;
use assetpipe::tasks::TaskContext;
use assetpipe::transform::images::CompressionService;
use assetpipe::types::{CacheStorageMode, TriggerWhileRunningBehaviour};

use crate::recorders::{RecordingNotifier, StubCompressor};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    /// Declare that `task` runs after each of `deps`.
    pub fn after(mut self, task: &str, deps: &[&str]) -> Self {
        let entry = self
            .config
            .task
            .entry(task.to_string())
            .or_insert_with(TaskConfig::default);
        entry.after.extend(deps.iter().map(|d| d.to_string()));
        self
    }

    pub fn behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn queue_length(mut self, len: usize) -> Self {
        self.config.config.queue_length = len;
        self
    }

    pub fn memory_cache(mut self) -> Self {
        self.config.config.cache_storage_mode = CacheStorageMode::Memory;
        self
    }

    pub fn app_deps(mut self, globs: &[&str]) -> Self {
        self.config.paths.app_deps = globs.iter().map(|g| g.to_string()).collect();
        self
    }

    /// Arbitrary edits to the raw config.
    pub fn edit(mut self, f: impl FnOnce(&mut RawConfigFile)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A throwaway project directory on disk.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp project"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> &Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write project file");
        self
    }

    pub fn read(&self, rel: &str) -> Vec<u8> {
        fs::read(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn read_string(&self, rel: &str) -> String {
        String::from_utf8(self.read(rel)).expect("utf-8 output")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Every file under `rel`, relative to it, sorted.
    pub fn files_under(&self, rel: &str) -> Vec<String> {
        fn walk(dir: &Path, base: &Path, out: &mut Vec<String>) {
            let Ok(entries) = fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    walk(&path, base, out);
                } else if let Ok(rel) = path.strip_prefix(base) {
                    out.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        let base = self.path(rel);
        let mut out = Vec::new();
        walk(&base, &base, &mut out);
        out.sort();
        out
    }

    /// Task context over this project with recording collaborators.
    pub fn context(&self, cfg: ConfigFile) -> TestContext {
        let notifier = Arc::new(RecordingNotifier::default());
        let compressor = Arc::new(StubCompressor::default());
        self.context_with(cfg, notifier, compressor)
    }

    pub fn context_with(
        &self,
        cfg: ConfigFile,
        notifier: Arc<RecordingNotifier>,
        compressor: Arc<StubCompressor>,
    ) -> TestContext {
        let cfg = Arc::new(cfg);
        let paths = Arc::new(PathTable::from_config(self.root(), &cfg));
        let ctx = TaskContext::new(
            cfg,
            paths,
            Arc::new(RealFileSystem),
            notifier.clone() as Arc<dyn Notifier>,
            compressor.clone() as Arc<dyn CompressionService>,
        );
        TestContext {
            ctx: Arc::new(ctx),
            notifier,
            compressor,
        }
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

/// A task context plus handles to inspect what tasks reported.
pub struct TestContext {
    pub ctx: Arc<TaskContext>,
    pub notifier: Arc<RecordingNotifier>,
    pub compressor: Arc<StubCompressor>,
}
