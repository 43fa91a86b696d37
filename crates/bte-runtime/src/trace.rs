#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{NodeId, TaskStatus};

/// One status transition of one node, produced while stepping.
///
/// Plain data so it can be recorded during a step and rendered later by tooling (the editor
/// highlights nodes by their last status).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatusChange {
    pub step: u64,
    pub node: NodeId,
    pub previous: TaskStatus,
    pub current: TaskStatus,
}

pub trait TraceSink {
    fn record(&mut self, change: &StatusChange);
}

#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn record(&mut self, _change: &StatusChange) {}
}

/// In-memory trace of every transition, in the order they happened.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub changes: Vec<StatusChange>,
}

impl TraceLog {
    pub fn push(&mut self, change: StatusChange) {
        self.changes.push(change);
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Transitions of a single node.
    pub fn for_node(&self, node: NodeId) -> impl Iterator<Item = &StatusChange> {
        self.changes.iter().filter(move |c| c.node == node)
    }
}

impl TraceSink for TraceLog {
    fn record(&mut self, change: &StatusChange) {
        self.push(*change);
    }
}
