// tests/scheduler_property.rs

use std::collections::HashSet;

use proptest::prelude::*;

use assetpipe::config::ConfigFile;
use assetpipe::dag::{Scheduler, TaskRunState};
use assetpipe::engine::TaskOutcome;
use assetpipe::tasks::TaskId;
use assetpipe_test_utils::builders::ConfigFileBuilder;

fn name(i: usize) -> &'static str {
    TaskId::ALL[i].as_str()
}

// Acyclic by construction: task i may only run after tasks 0..i.
fn dag_config_strategy() -> impl Strategy<Value = ConfigFile> {
    let n = TaskId::ALL.len();
    proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..3), n).prop_map(
        move |raw_deps| {
            let mut builder = ConfigFileBuilder::new();
            for (i, potential) in raw_deps.into_iter().enumerate() {
                if i == 0 {
                    continue;
                }
                let deps: HashSet<usize> = potential.into_iter().map(|d| d % i).collect();
                let deps: Vec<&str> = deps.into_iter().map(name).collect();
                if !deps.is_empty() {
                    builder = builder.after(name(i), &deps);
                }
            }
            builder.build()
        },
    )
}

proptest! {
    #[test]
    fn every_run_terminates_and_runs_each_task_at_most_once(
        cfg in dag_config_strategy(),
        triggers in proptest::collection::vec(0..TaskId::ALL.len(), 1..6),
        failing in proptest::collection::vec(0..TaskId::ALL.len(), 0..4),
        cancelled in proptest::collection::vec(0..TaskId::ALL.len(), 0..2),
    ) {
        let mut scheduler = Scheduler::from_config(&cfg);
        let failing: HashSet<&str> = failing.into_iter().map(name).collect();
        let cancelled: HashSet<&str> = cancelled.into_iter().map(name).collect();

        let mut executing: Vec<String> = Vec::new();
        let mut started: HashSet<String> = HashSet::new();

        for t in &triggers {
            for st in scheduler.handle_trigger(name(*t)) {
                prop_assert!(started.insert(st.name.clone()), "{} dispatched twice", st.name);
                executing.push(st.name);
            }
        }

        let mut steps = 0;
        while !executing.is_empty() {
            let task = executing.remove(0);
            steps += 1;
            prop_assert!(steps < 1000, "scheduler did not settle");

            let outcome = if cancelled.contains(task.as_str()) {
                TaskOutcome::Cancelled
            } else if failing.contains(task.as_str()) {
                TaskOutcome::Failed
            } else {
                TaskOutcome::Success
            };

            let scheduled = if TaskId::ALL.iter().any(|id| id.as_str() == task && id.is_long_lived()) {
                scheduler.handle_progress(&task)
            } else {
                scheduler.handle_completion(&task, outcome)
            };
            for st in scheduled {
                prop_assert!(started.insert(st.name.clone()), "{} dispatched twice", st.name);
                executing.push(st.name);
            }
        }

        // Nothing left running, so nothing may be left waiting either.
        for t in scheduler.tasks_in_current_run() {
            prop_assert_ne!(scheduler.run_state_of(&t), Some(TaskRunState::Pending), "{} stuck", t);
            prop_assert_ne!(scheduler.run_state_of(&t), Some(TaskRunState::Running), "{} lost", t);
        }
        prop_assert!(scheduler.is_idle());
    }
}
