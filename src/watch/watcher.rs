// src/watch/watcher.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::watch::event_handler::{send_triggers, tasks_for_changes};
use crate::watch::patterns::TaskWatchProfile;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying debouncer alive; dropping it stops file watching.
pub struct WatcherHandle {
    _inner: Debouncer<RecommendedWatcher>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and send `RuntimeEvent::TaskTriggered` for the
/// tasks whose bindings match a changed path.
///
/// Changes are coalesced over `debounce`, so a burst of saves becomes one
/// trigger per task.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profiles: Vec<TaskWatchProfile>,
    debounce: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    let dep_map: HashMap<String, Vec<String>> = profiles
        .iter()
        .map(|p| (p.name().to_string(), p.deps().to_vec()))
        .collect();
    let profiles = Arc::new(profiles);

    // Bridge from the debouncer thread into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();

    let mut debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
        Ok(events) => {
            let paths = events.into_iter().map(|e| e.path).collect();
            if event_tx.send(paths).is_err() {
                debug!("watch consumer gone; dropping events");
            }
        }
        Err(err) => warn!(error = %err, "file watch error"),
    })
    .context("creating file watcher")?;

    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {:?}", root))?;

    info!(?root, debounce_ms = debounce.as_millis() as u64, "file watcher started");

    tokio::spawn(async move {
        while let Some(paths) = event_rx.recv().await {
            debug!(count = paths.len(), "received debounced changes");
            let tasks = tasks_for_changes(&root, paths.iter().map(PathBuf::as_path), &profiles, &dep_map);
            if tasks.is_empty() {
                continue;
            }
            if !send_triggers(tasks, &runtime_tx).await {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: debouncer })
}
