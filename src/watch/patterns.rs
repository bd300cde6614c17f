// src/watch/patterns.rs

use std::fmt;

use crate::config::{InputCategory, PathTable};
use crate::dag::DagGraph;
use crate::engine::TaskName;
use crate::pipeline::source::SourceGlob;
use crate::tasks::TaskId;

/// Compiled watch binding for one task.
///
/// Patterns are relative to the project root; the watcher passes
/// `/`-separated relative paths into [`matches`](Self::matches).
#[derive(Clone)]
pub struct TaskWatchProfile {
    name: TaskName,
    /// Direct dependencies (`after = [...]`) of this task.
    deps: Vec<TaskName>,
    categories: Vec<InputCategory>,
    globs: Vec<SourceGlob>,
}

impl fmt::Debug for TaskWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWatchProfile")
            .field("name", &self.name)
            .field("categories", &self.categories)
            .finish_non_exhaustive()
    }
}

impl TaskWatchProfile {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct dependencies for this task.
    pub fn deps(&self) -> &[TaskName] {
        &self.deps
    }

    pub fn categories(&self) -> &[InputCategory] {
        &self.categories
    }

    /// Glob patterns this task listens to, in declared order.
    pub fn patterns(&self) -> Vec<&str> {
        self.globs.iter().map(|g| g.pattern()).collect()
    }

    /// Whether a change to `rel_path` (relative to the project root) should
    /// re-run this task.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.globs.iter().any(|g| g.is_match(rel_path))
    }
}

/// One profile per task that has inputs; long-lived tasks have none.
pub fn build_profiles(paths: &PathTable, graph: &DagGraph) -> Vec<TaskWatchProfile> {
    TaskId::ALL
        .into_iter()
        .filter(|id| !id.watch_inputs().is_empty())
        .map(|id| {
            let categories = id.watch_inputs().to_vec();
            let globs = categories
                .iter()
                .flat_map(|c| paths.inputs(*c).iter())
                .map(|p| SourceGlob::new(p))
                .collect();
            TaskWatchProfile {
                name: id.as_str().to_string(),
                deps: graph.dependencies_of(id.as_str()).to_vec(),
                categories,
                globs,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{ConfigFile, RawConfigFile};

    fn profiles() -> Vec<TaskWatchProfile> {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        let paths = PathTable::from_config(".", &cfg);
        build_profiles(&paths, &DagGraph::from_config(&cfg))
    }

    fn interested(rel: &str) -> Vec<String> {
        profiles()
            .iter()
            .filter(|p| p.matches(rel))
            .map(|p| p.name().to_string())
            .collect()
    }

    #[test]
    fn serve_has_no_binding() {
        assert!(profiles().iter().all(|p| p.name() != "serve"));
        assert_eq!(profiles().len(), TaskId::ALL.len() - 1);
    }

    #[test]
    fn component_changes_reach_the_right_tasks() {
        assert_eq!(
            interested("src/app/components/foo/foo.js"),
            ["app-annotate", "app-ngdocs"]
        );
        assert_eq!(
            interested("src/app/components/foo/foo.html"),
            ["app-annotate", "app-html-minify"]
        );
    }

    #[test]
    fn vendor_and_copy_inputs_are_bound() {
        assert_eq!(interested("bower_components/angular/angular.js"), ["app-deps"]);
        assert_eq!(interested("src/assets/fonts/icons.woff"), ["copyTask"]);
        assert_eq!(interested("src/assets/js/lib/d3.js"), ["copyTask"]);
        assert!(interested("dist/js/app.js").is_empty());
    }
}
