// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::engine::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Re-triggers that have to wait for the active run to settle.
///
/// Each batch becomes one future run. A trigger joins the newest batch
/// unless that batch already names the task, in which case it opens a new
/// one: a stylesheet saved twice while `styles` compiles gets two more
/// builds, not one. At most `queue_length` batches are kept; beyond that
/// the two oldest are merged, so a change is never forgotten, only folded
/// into an earlier rebuild.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_batches: usize,
    batches: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// `queue_length` below 1 is treated as 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, queue_length: usize) -> Self {
        Self {
            behaviour,
            max_batches: queue_length.max(1),
            batches: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// In `cancel` mode the running instance is stopped at its next
    /// checkpoint; in `queue` mode it is left to finish.
    pub fn cancels_running(&self) -> bool {
        self.behaviour == TriggerWhileRunningBehaviour::Cancel
    }

    pub fn record_trigger(&mut self, task: &str) {
        match self.batches.back_mut() {
            Some(newest) if !newest.contains(task) => {
                newest.insert(task.to_string());
            }
            _ => self.batches.push_back(BTreeSet::from([task.to_string()])),
        }

        if self.batches.len() > self.max_batches {
            if let Some(oldest) = self.batches.pop_front() {
                if let Some(next) = self.batches.front_mut() {
                    next.extend(oldest);
                }
            }
        }
        debug!(task = %task, batches = self.batches.len(), behaviour = ?self.behaviour, "trigger queued");
    }

    /// Take the oldest batch for the next run.
    pub fn next_batch(&mut self) -> Vec<TaskName> {
        self.batches
            .pop_front()
            .map(|batch| batch.into_iter().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_tasks_share_a_batch() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 3);
        q.record_trigger("styles");
        q.record_trigger("scripts");
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_batch(), ["scripts", "styles"]);
        assert!(q.is_empty());
    }

    #[test]
    fn repeated_task_opens_a_new_batch_up_to_the_limit() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 2);
        q.record_trigger("styles");
        q.record_trigger("styles");
        q.record_trigger("images");
        q.record_trigger("styles");

        assert_eq!(q.len(), 2);
        assert_eq!(q.next_batch(), ["images", "styles"]);
        assert_eq!(q.next_batch(), ["styles"]);
    }

    #[test]
    fn length_one_coalesces_everything() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 0);
        for task in ["copyTask", "copyTask", "sprite"] {
            q.record_trigger(task);
        }
        assert_eq!(q.next_batch(), ["copyTask", "sprite"]);
        assert!(q.next_batch().is_empty());
    }
}
