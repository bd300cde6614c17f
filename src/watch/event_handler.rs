// src/watch/event_handler.rs

//! Turning changed paths into task triggers.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::watch::dag_filter::roots;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::TaskWatchProfile;

/// Tasks to trigger for one batch of changed paths.
///
/// For each path, the tasks whose bindings match are collected and only
/// those without a matching ancestor are kept. The union over the batch is
/// returned in name order.
pub fn tasks_for_changes<'p>(
    root: &Path,
    paths: impl IntoIterator<Item = &'p Path>,
    profiles: &[TaskWatchProfile],
    dep_map: &HashMap<String, Vec<String>>,
) -> Vec<String> {
    let mut selected: BTreeSet<String> = BTreeSet::new();

    for path in paths {
        let Some(rel) = relative_str(root, path) else {
            warn!(?path, ?root, "could not relativize changed path");
            continue;
        };

        let matching: Vec<&str> = profiles
            .iter()
            .filter(|p| p.matches(&rel))
            .map(|p| p.name())
            .collect();
        if matching.is_empty() {
            continue;
        }

        let triggered = roots(&matching, dep_map);
        debug!(rel = %rel, ?matching, ?triggered, "watch match");
        selected.extend(triggered.into_iter().map(str::to_string));
    }

    selected.into_iter().collect()
}

/// Send one `TaskTriggered` per task. Returns false once the runtime is gone.
pub async fn send_triggers(tasks: Vec<String>, runtime_tx: &mpsc::Sender<RuntimeEvent>) -> bool {
    for task in tasks {
        debug!(task = %task, "watch -> triggering task");
        if let Err(err) = runtime_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::FileWatch,
            })
            .await
        {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::PathTable;
    use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig};
    use crate::dag::DagGraph;
    use crate::watch::patterns::build_profiles;

    #[test]
    fn batch_is_deduplicated_and_filtered() {
        let mut raw = RawConfigFile::default();
        raw.task.insert(
            "app-ngdocs".to_string(),
            TaskConfig {
                after: vec!["app-annotate".to_string()],
            },
        );
        let cfg = ConfigFile::try_from(raw).unwrap();
        let graph = DagGraph::from_config(&cfg);
        let profiles = build_profiles(&PathTable::from_config("/p", &cfg), &graph);
        let dep_map: HashMap<String, Vec<String>> = profiles
            .iter()
            .map(|p| (p.name().to_string(), p.deps().to_vec()))
            .collect();

        let changed = [
            PathBuf::from("/p/src/app/components/foo/foo.js"),
            PathBuf::from("/p/src/app/app.module.js"),
            PathBuf::from("/p/src/assets/scss/site.scss"),
            PathBuf::from("/p/README.md"),
        ];
        let tasks = tasks_for_changes(Path::new("/p"), changed.iter().map(PathBuf::as_path), &profiles, &dep_map);
        assert_eq!(tasks, ["app-annotate", "styles"]);
    }
}
