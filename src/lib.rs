// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod notifier;
pub mod pipeline;
pub mod serve;
pub mod tasks;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_or_default;
use crate::config::model::ConfigFile;
use crate::config::{InputCategory, OutputCategory, PathTable};
use crate::dag::{DagGraph, Scheduler};
use crate::engine::{
    CoreRuntime, RunSummary, Runtime, RuntimeEvent, RuntimeOptions, TaskName, TriggerReason,
};
use crate::exec::{PipelineBackend, TaskEnv};
use crate::fs::RealFileSystem;
use crate::notifier::ConsoleNotifier;
use crate::tasks::{TaskContext, TaskId, TaskRegistry};
use crate::transform::images::{CompressionService, TinifyService, UnconfiguredService};

/// The aggregate that builds everything once.
pub const DEFAULT_TASK: &str = "default";
/// The aggregate that serves `dist` and rebuilds on change.
pub const WATCH_TASK: &str = "watch";

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Every batch task once.
    Default,
    /// Dev server plus file watching.
    Watch,
    /// One task and everything it is declared to run after.
    Single(TaskId),
}

impl Mode {
    pub fn parse(task: &str) -> errors::Result<Self> {
        match task {
            DEFAULT_TASK => Ok(Mode::Default),
            WATCH_TASK => Ok(Mode::Watch),
            other => other.parse::<TaskId>().map(Mode::Single),
        }
    }

    /// Tasks to trigger at startup, dependencies first.
    pub fn initial_triggers(&self, graph: &DagGraph) -> Vec<TaskName> {
        let names: Vec<TaskName> = match self {
            Mode::Default => TaskId::DEFAULT.iter().map(|id| id.as_str().to_string()).collect(),
            Mode::Watch => vec![TaskId::Serve.as_str().to_string()],
            Mode::Single(id) => {
                let mut names: Vec<TaskName> = graph.ancestors_of(id.as_str()).into_iter().collect();
                names.push(id.as_str().to_string());
                names
            }
        };
        graph.topo_order(&names)
    }

    /// Long-running modes never exit on their own.
    pub fn exit_when_idle(&self) -> bool {
        match self {
            Mode::Default => true,
            Mode::Watch => false,
            Mode::Single(id) => !id.is_long_lived(),
        }
    }
}

/// Result of a finished invocation.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub fail_on_error: bool,
}

impl RunReport {
    /// Process exit code: non-zero only when failures were asked to count.
    pub fn exit_code(&self) -> u8 {
        if self.fail_on_error && self.summary.has_failures() {
            1
        } else {
            0
        }
    }
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the path table
/// - task registry and shared task context
/// - scheduler / queue / runtime
/// - executor
/// - (watch mode) file watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<RunReport> {
    let config_path = args.config.clone();
    let cfg = Arc::new(load_or_default(&config_path)?);
    let mode = Mode::parse(&args.task)?;

    let root = project_root(&config_path);
    let paths = Arc::new(PathTable::from_config(&root, &cfg));
    let registry = TaskRegistry::builtin(&cfg, &paths)?;
    let graph = DagGraph::from_config(&cfg);

    if args.dry_run {
        print_dry_run(&cfg, &paths, &graph, &registry);
        return Ok(RunReport {
            summary: RunSummary::default(),
            fail_on_error: false,
        });
    }

    let ctx = Arc::new(TaskContext::new(
        cfg.clone(),
        paths.clone(),
        Arc::new(RealFileSystem),
        Arc::new(ConsoleNotifier::from_config(&cfg.notify)),
        compressor(&cfg),
    ));
    let env = Arc::new(TaskEnv { registry, ctx });

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = PipelineBackend::new(env, rt_tx.clone());

    let _watcher_handle = if mode == Mode::Watch {
        let profiles = crate::watch::build_profiles(&paths, &graph);
        Some(crate::watch::spawn_watcher(
            root.clone(),
            profiles,
            Duration::from_millis(cfg.config.debounce_ms),
            rt_tx.clone(),
        )?)
    } else {
        None
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let initial = mode.initial_triggers(&graph);
    info!(?mode, tasks = ?initial, "initial triggers");
    for task in initial {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::Manual,
            })
            .await?;
    }

    let options = RuntimeOptions {
        exit_when_idle: mode.exit_when_idle(),
    };
    let core = CoreRuntime::new(
        Scheduler::from_config(&cfg),
        cfg.config.triggered_while_running_behaviour,
        cfg.config.queue_length,
        options,
    );

    let summary = Runtime::new(core, rt_rx, executor).run().await?;
    info!(
        runs = summary.runs,
        failed = ?summary.failed,
        cancelled = summary.cancelled,
        "runtime finished"
    );

    Ok(RunReport {
        summary,
        fail_on_error: args.fail_on_error || cfg.config.fail_on_error,
    })
}

/// Project root: the directory holding the config file.
///
/// - If the config path has a non-empty parent (e.g. "web/Assetpipe.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetpipe.toml" (parent = ""),
///   we fall back to the current working directory.
pub fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// The image compressor, or a stand-in that reports the missing key when
/// the images task actually needs it.
fn compressor(cfg: &ConfigFile) -> Arc<dyn CompressionService> {
    match TinifyService::from_env(&cfg.images) {
        Ok(service) => Arc::new(service),
        Err(err) => {
            warn!(error = %err, "image compression unavailable");
            Arc::new(UnconfiguredService::new(cfg.images.api_key_env.clone()))
        }
    }
}

/// Print the path table, task graph, stages and watch bindings.
fn print_dry_run(cfg: &ConfigFile, paths: &PathTable, graph: &DagGraph, registry: &TaskRegistry) {
    println!("assetpipe dry-run");
    println!("  root = {}", paths.root().display());
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        cfg.config.triggered_while_running_behaviour
    );
    println!("  config.queue_length = {}", cfg.config.queue_length);
    println!("  config.debounce_ms = {}", cfg.config.debounce_ms);
    println!();

    println!("inputs:");
    for category in InputCategory::ALL {
        println!("  {:<15} {:?}", category.as_str(), paths.inputs(category));
    }
    println!("outputs:");
    for category in OutputCategory::ALL {
        println!("  {:<15} {}", category.as_str(), paths.output(category).display());
    }
    println!();

    println!("tasks ({}):", TaskId::ALL.len());
    for id in TaskId::ALL {
        println!("  - {id}");
        let after = graph.dependencies_of(id.as_str());
        if !after.is_empty() {
            println!("      after: {after:?}");
        }
        if let Some(task) = registry.get(id) {
            println!("      stages: {}", task.stages().join(" -> "));
        }
        if id.is_long_lived() {
            println!("      long_lived: true");
            println!("      listen: {}:{}", cfg.serve.host, cfg.serve.port);
        }
        let watch: Vec<&str> = id
            .watch_inputs()
            .iter()
            .flat_map(|c| paths.inputs(*c).iter().map(String::as_str))
            .collect();
        if !watch.is_empty() {
            println!("      watch: {watch:?}");
        }
    }

    debug!("dry-run complete (no execution)");
}

