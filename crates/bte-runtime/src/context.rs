use crate::rng::{self, SplitMix64};
use crate::{Blackboard, NodeId, StatusChange, TaskStatus};

/// Everything a task can touch during one step.
pub struct StepContext<'a> {
    pub step: u64,
    pub seed: u64,
    pub blackboard: &'a mut Blackboard,
    statuses: &'a mut Vec<TaskStatus>,
    changes: &'a mut Vec<StatusChange>,
}

impl<'a> StepContext<'a> {
    pub fn new(
        step: u64,
        seed: u64,
        blackboard: &'a mut Blackboard,
        statuses: &'a mut Vec<TaskStatus>,
        changes: &'a mut Vec<StatusChange>,
    ) -> Self {
        Self {
            step,
            seed,
            blackboard,
            statuses,
            changes,
        }
    }

    /// RNG stream for `node` at the current step.
    pub fn rng_for(&self, node: NodeId) -> SplitMix64 {
        SplitMix64::new(rng::derive_seed(self.seed, self.step, node.0 as u64))
    }

    pub fn status_of(&self, node: NodeId) -> TaskStatus {
        self.statuses.get(node.0).copied().unwrap_or_default()
    }

    /// Record the status `node` ended this tick with. Repeated reports of the same status are
    /// not transitions and are dropped.
    pub fn report(&mut self, node: NodeId, current: TaskStatus) {
        if self.statuses.len() <= node.0 {
            self.statuses.resize(node.0 + 1, TaskStatus::Fresh);
        }
        let previous = self.statuses[node.0];
        if previous == current {
            return;
        }
        self.statuses[node.0] = current;
        self.changes.push(StatusChange {
            step: self.step,
            node,
            previous,
            current,
        });
    }
}
