use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::{
    Blackboard, NodeId, NullTraceSink, StatusChange, StepContext, StepError, Task, TaskStatus,
    TraceSink,
};

/// Outcome of one [`BehaviorTree::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: u64,
    pub status: TaskStatus,
    pub changes: Vec<StatusChange>,
}

/// A runnable tree plus the state that survives between steps.
///
/// A step that errors or panics faults the tree; further steps answer [`StepError::Faulted`]
/// until [`BehaviorTree::restart`] is called.
pub struct BehaviorTree {
    root: Box<dyn Task>,
    blackboard: Blackboard,
    statuses: Vec<TaskStatus>,
    sink: Box<dyn TraceSink>,
    seed: u64,
    steps: u64,
    last: TaskStatus,
    faulted: bool,
}

impl BehaviorTree {
    pub fn new(root: Box<dyn Task>) -> Self {
        Self {
            root,
            blackboard: Blackboard::new(),
            statuses: Vec::new(),
            sink: Box::new(NullTraceSink),
            seed: 0,
            steps: 0,
            last: TaskStatus::Fresh,
            faulted: false,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_blackboard(mut self, blackboard: Blackboard) -> Self {
        self.blackboard = blackboard;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Tick the root once.
    pub fn step(&mut self) -> Result<StepReport, StepError> {
        if self.faulted {
            return Err(StepError::Faulted);
        }

        self.steps += 1;
        let step = self.steps;
        let mut changes = Vec::new();
        let outcome = {
            let mut ctx = StepContext::new(
                step,
                self.seed,
                &mut self.blackboard,
                &mut self.statuses,
                &mut changes,
            );
            let root = &mut self.root;
            panic::catch_unwind(AssertUnwindSafe(|| root.tick(&mut ctx)))
        };

        for change in &changes {
            self.sink.record(change);
        }

        let status = match outcome {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                self.faulted = true;
                return Err(err);
            }
            Err(payload) => {
                self.faulted = true;
                return Err(StepError::Panicked {
                    step,
                    message: panic_message(payload.as_ref()),
                });
            }
        };

        self.last = status;
        if status != TaskStatus::Running {
            self.root.reset();
        }

        Ok(StepReport {
            step,
            status,
            changes,
        })
    }

    /// Put every node back to `Fresh` and clear a fault. The blackboard is kept.
    pub fn restart(&mut self) -> Vec<StatusChange> {
        self.root.reset();
        let mut changes = Vec::new();
        for (index, status) in self.statuses.iter_mut().enumerate() {
            if *status != TaskStatus::Fresh {
                changes.push(StatusChange {
                    step: 0,
                    node: NodeId(index),
                    previous: *status,
                    current: TaskStatus::Fresh,
                });
                *status = TaskStatus::Fresh;
            }
        }
        for change in &changes {
            self.sink.record(change);
        }
        self.steps = 0;
        self.last = TaskStatus::Fresh;
        self.faulted = false;
        changes
    }

    pub fn status_of(&self, node: NodeId) -> TaskStatus {
        self.statuses.get(node.0).copied().unwrap_or_default()
    }

    pub fn last_status(&self) -> TaskStatus {
        self.last
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
