// src/config/validate.rs

use std::str::FromStr;

use lightningcss::targets::Browsers;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetpipeError, Result};
use crate::tasks::TaskId;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetpipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_layout(cfg)?;
    validate_browsers(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(AssetpipeError::Config(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_layout(cfg: &RawConfigFile) -> Result<()> {
    if cfg.dist.root.trim().is_empty() {
        return Err(AssetpipeError::Config(
            "[dist].root must not be empty".to_string(),
        ));
    }
    if cfg.templates.prefix.contains("..") {
        return Err(AssetpipeError::Config(format!(
            "[templates].prefix must not contain '..' (got '{}')",
            cfg.templates.prefix
        )));
    }
    if !cfg.minify.min_suffix.ends_with(".js") {
        return Err(AssetpipeError::Config(format!(
            "[minify].min_suffix must end with '.js' (got '{}')",
            cfg.minify.min_suffix
        )));
    }
    Ok(())
}

fn validate_browsers(cfg: &RawConfigFile) -> Result<()> {
    if cfg.styles.browsers.is_empty() {
        return Ok(());
    }
    Browsers::from_browserslist(cfg.styles.browsers.iter()).map_err(|e| {
        AssetpipeError::Config(format!("[styles].browsers is not a valid query: {e}"))
    })?;
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if TaskId::from_str(name).is_err() {
            return Err(AssetpipeError::Config(format!(
                "unknown task '{}' in [task.{}]",
                name, name
            )));
        }
        for dep in task.after.iter() {
            if TaskId::from_str(dep).is_err() {
                return Err(AssetpipeError::Config(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(AssetpipeError::Config(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in TaskId::ALL {
        graph.add_node(id.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    toposort(&graph, None)
        .map(|_| ())
        .map_err(|cycle| AssetpipeError::DependencyCycle(cycle.node_id().to_string()))
}
