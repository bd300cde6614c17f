// tests/cli_modes.rs

use std::path::{Path, PathBuf};

use assetpipe::dag::DagGraph;
use assetpipe::errors::AssetpipeError;
use assetpipe::tasks::TaskId;
use assetpipe::{Mode, project_root};
use assetpipe_test_utils::builders::ConfigFileBuilder;

#[test]
fn task_argument_selects_the_mode() {
    assert_eq!(Mode::parse("default").unwrap(), Mode::Default);
    assert_eq!(Mode::parse("watch").unwrap(), Mode::Watch);
    assert_eq!(Mode::parse("copyTask").unwrap(), Mode::Single(TaskId::CopyTask));
    assert!(matches!(Mode::parse("build"), Err(AssetpipeError::UnknownTask(name)) if name == "build"));
}

#[test]
fn default_triggers_every_batch_task_once() {
    let graph = DagGraph::from_config(&ConfigFileBuilder::new().build());
    let triggers = Mode::Default.initial_triggers(&graph);

    assert_eq!(triggers.len(), TaskId::DEFAULT.len());
    assert_eq!(triggers.first().map(String::as_str), Some("copyTask"));
    assert!(!triggers.contains(&"serve".to_string()));
    assert!(Mode::Default.exit_when_idle());
}

#[test]
fn single_task_brings_its_declared_dependencies() {
    let cfg = ConfigFileBuilder::new()
        .after("app-ngdocs", &["app-annotate"])
        .after("app-annotate", &["app-html-minify"])
        .build();
    let graph = DagGraph::from_config(&cfg);

    let triggers = Mode::Single(TaskId::AppNgdocs).initial_triggers(&graph);
    assert_eq!(triggers, ["app-html-minify", "app-annotate", "app-ngdocs"]);

    assert_eq!(Mode::Single(TaskId::Styles).initial_triggers(&graph), ["styles"]);
}

#[test]
fn long_running_modes_never_exit_when_idle() {
    assert!(!Mode::Watch.exit_when_idle());
    assert!(!Mode::Single(TaskId::Serve).exit_when_idle());
    assert!(Mode::Single(TaskId::Images).exit_when_idle());

    let graph = DagGraph::from_config(&ConfigFileBuilder::new().build());
    assert_eq!(Mode::Watch.initial_triggers(&graph), ["serve"]);
}

#[test]
fn project_root_is_the_config_directory() {
    assert_eq!(project_root(Path::new("web/Assetpipe.toml")), PathBuf::from("web"));
    assert_eq!(
        project_root(Path::new("Assetpipe.toml")),
        std::env::current_dir().unwrap()
    );
}
