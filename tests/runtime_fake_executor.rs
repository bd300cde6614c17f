// tests/runtime_fake_executor.rs

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use assetpipe::config::ConfigFile;
use assetpipe::dag::Scheduler;
use assetpipe::engine::{
    CoreRuntime, RunSummary, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use assetpipe_test_utils::builders::ConfigFileBuilder;
use assetpipe_test_utils::fake_executor::{ExecutorLog, FakeExecutor};
use assetpipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn trigger(task: &str, reason: TriggerReason) -> RuntimeEvent {
    RuntimeEvent::TaskTriggered {
        task: task.to_string(),
        reason,
    }
}

/// Seed `events`, then drive a runtime over `cfg` with the executor built by
/// `make` until it exits.
async fn drive(
    cfg: &ConfigFile,
    exit_when_idle: bool,
    events: Vec<RuntimeEvent>,
    make: impl FnOnce(mpsc::Sender<RuntimeEvent>, Arc<Mutex<ExecutorLog>>) -> FakeExecutor,
) -> Result<(RunSummary, ExecutorLog), Box<dyn Error>> {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let log = Arc::new(Mutex::new(ExecutorLog::default()));
    let executor = make(rt_tx.clone(), log.clone());

    for event in events {
        rt_tx.send(event).await?;
    }

    let core = CoreRuntime::new(
        Scheduler::from_config(cfg),
        cfg.config.triggered_while_running_behaviour,
        cfg.config.queue_length,
        RuntimeOptions { exit_when_idle },
    );
    let summary = with_timeout(Runtime::new(core, rt_rx, executor).run()).await?;
    let log = log.lock().unwrap().clone();
    Ok((summary, log))
}

#[tokio::test]
async fn dependents_run_after_their_dependency() -> TestResult {
    let cfg = ConfigFileBuilder::new().after("app-ngdocs", &["app-annotate"]).build();

    let (summary, log) = drive(
        &cfg,
        true,
        vec![trigger("app-annotate", TriggerReason::Manual)],
        FakeExecutor::new,
    )
    .await?;

    assert_eq!(log.executed, ["app-annotate", "app-ngdocs"]);
    assert_eq!(summary.runs, 1);
    assert!(!summary.has_failures());
    Ok(())
}

#[tokio::test]
async fn failure_skips_dependents_and_is_reported() -> TestResult {
    let cfg = ConfigFileBuilder::new().after("app-ngdocs", &["app-annotate"]).build();

    let (summary, log) = drive(
        &cfg,
        true,
        vec![
            trigger("app-annotate", TriggerReason::Manual),
            trigger("styles", TriggerReason::Manual),
        ],
        |tx, log| FakeExecutor::new(tx, log).with_outcome("app-annotate", TaskOutcome::Failed),
    )
    .await?;

    assert!(!log.executed.contains(&"app-ngdocs".to_string()));
    assert!(log.executed.contains(&"styles".to_string()));
    assert_eq!(summary.failed, ["app-annotate"]);
    Ok(())
}

#[tokio::test]
async fn retrigger_while_running_cancels_and_reruns() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .behaviour(TriggerWhileRunningBehaviour::Cancel)
        .build();

    let (summary, log) = drive(
        &cfg,
        true,
        vec![
            trigger("styles", TriggerReason::Manual),
            trigger("styles", TriggerReason::FileWatch),
        ],
        |tx, log| FakeExecutor::new(tx, log).hold("styles"),
    )
    .await?;

    assert_eq!(log.cancelled, ["styles"]);
    assert_eq!(log.executed, ["styles", "styles"]);
    assert_eq!(summary.cancelled, 1);
    assert_eq!(summary.runs, 2);
    assert!(!summary.has_failures());
    Ok(())
}

#[tokio::test]
async fn queue_mode_coalesces_bursts_into_one_rerun() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .behaviour(TriggerWhileRunningBehaviour::Queue)
        .queue_length(1)
        .build();

    let (summary, log) = drive(
        &cfg,
        true,
        vec![
            trigger("scripts", TriggerReason::Manual),
            trigger("scripts", TriggerReason::FileWatch),
            trigger("scripts", TriggerReason::FileWatch),
            trigger("scripts", TriggerReason::FileWatch),
        ],
        FakeExecutor::new,
    )
    .await?;

    assert_eq!(log.executed, ["scripts", "scripts"]);
    assert!(log.cancelled.is_empty());
    assert_eq!(summary.runs, 2);
    Ok(())
}

#[tokio::test]
async fn file_change_joins_the_run_started_by_the_server() -> TestResult {
    let cfg = ConfigFileBuilder::new().build();

    let (summary, log) = drive(
        &cfg,
        false,
        vec![
            trigger("serve", TriggerReason::Manual),
            trigger("styles", TriggerReason::FileWatch),
            RuntimeEvent::ShutdownRequested,
        ],
        FakeExecutor::new,
    )
    .await?;

    assert_eq!(log.executed, ["serve", "styles"]);
    assert_eq!(summary.runs, 1);
    Ok(())
}

#[tokio::test]
async fn shutdown_stops_tasks_in_flight() -> TestResult {
    let cfg = ConfigFileBuilder::new().build();

    let (_summary, log) = drive(
        &cfg,
        false,
        vec![
            trigger("images", TriggerReason::Manual),
            RuntimeEvent::ShutdownRequested,
        ],
        |tx, log| FakeExecutor::new(tx, log).hold("images"),
    )
    .await?;

    assert_eq!(log.executed, ["images"]);
    assert_eq!(log.cancelled, ["images"]);
    Ok(())
}
