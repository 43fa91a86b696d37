use std::collections::BTreeSet;

use tracing::debug;

use crate::tree::TaskTree;
use crate::{EditCommand, EditError, TaskId};

/// Linear undo/redo history.
///
/// `entries[..cursor]` are applied, `entries[cursor..]` are undone and can be redone. Pushing
/// drops the undone suffix. When `max_history` is set the oldest entries are evicted.
///
/// Detached subtrees stay allocated while some entry can still reattach them; entries that are
/// dropped release the subtrees only they referenced.
#[derive(Debug, Clone, Default)]
pub struct HistoryStack {
    entries: Vec<EditCommand>,
    cursor: usize,
    max_history: Option<usize>,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_history(max_history: Option<usize>) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn max_history(&self) -> Option<usize> {
        self.max_history
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn entries(&self) -> &[EditCommand] {
        &self.entries
    }

    /// Apply `command` and record it. A command that fails to apply is not recorded.
    pub(crate) fn push(&mut self, command: EditCommand, tree: &mut TaskTree) -> Result<(), EditError> {
        command.apply(tree)?;
        debug!(kind = ?command.kind(), target = %command.target(), "applied edit");

        let mut dropped = self.entries.split_off(self.cursor);
        self.entries.push(command);
        if let Some(max) = self.max_history {
            let excess = self.entries.len().saturating_sub(max);
            dropped.extend(self.entries.drain(..excess));
        }
        self.cursor = self.entries.len();
        self.release(dropped, tree);
        Ok(())
    }

    /// Invert the newest applied entry. `Ok(false)` when there is nothing to undo.
    pub(crate) fn undo(&mut self, tree: &mut TaskTree) -> Result<bool, EditError> {
        if self.cursor == 0 {
            return Ok(false);
        }
        self.entries[self.cursor - 1].invert(tree)?;
        self.cursor -= 1;
        Ok(true)
    }

    /// Re-apply the oldest undone entry. `Ok(false)` when there is nothing to redo.
    pub(crate) fn redo(&mut self, tree: &mut TaskTree) -> Result<bool, EditError> {
        if self.cursor == self.entries.len() {
            return Ok(false);
        }
        self.entries[self.cursor].apply(tree)?;
        self.cursor += 1;
        Ok(true)
    }

    fn release(&self, dropped: Vec<EditCommand>, tree: &mut TaskTree) {
        if dropped.is_empty() {
            return;
        }
        let kept: BTreeSet<TaskId> = self
            .entries
            .iter()
            .flat_map(EditCommand::references)
            .collect();
        let candidates: BTreeSet<TaskId> =
            dropped.iter().flat_map(EditCommand::references).collect();

        let mut freed = 0;
        for id in candidates {
            if tree.get(id).is_none() || tree.parent(id).is_some() || id == TaskTree::ROOT {
                continue;
            }
            if tree.subtree(id).iter().any(|t| kept.contains(t)) {
                continue;
            }
            freed += tree.release(id);
        }
        if freed > 0 {
            debug!(freed, "released detached tasks");
        }
    }
}
