use crate::tree::TaskTree;
use crate::{AttrValue, EditError, ParentLink, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Add,
    Remove,
    Move,
    SetAttribute,
    SetComment,
    SetGuard,
    ClearGuard,
}

/// One undoable edit. Each variant carries what it needs to be applied again after an undo
/// and to be inverted exactly, node ids included.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    /// Attach the detached `task` under `parent` at `index`.
    Add {
        parent: TaskId,
        task: TaskId,
        index: usize,
    },
    /// Detach the subtree at `task`, which sits under `parent` at `index`.
    Remove {
        parent: TaskId,
        task: TaskId,
        index: usize,
    },
    /// `to` is the position after `task` has been taken out of `from`.
    Move {
        task: TaskId,
        from: (TaskId, usize),
        to: (TaskId, usize),
    },
    SetAttribute {
        task: TaskId,
        name: String,
        previous: Option<AttrValue>,
        value: Option<AttrValue>,
    },
    SetComment {
        task: TaskId,
        previous: Option<String>,
        comment: Option<String>,
    },
    /// Install the detached `guard` on `task`, displacing `previous`.
    SetGuard {
        task: TaskId,
        guard: TaskId,
        previous: Option<TaskId>,
    },
    ClearGuard {
        task: TaskId,
        guard: TaskId,
    },
}

impl EditCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            EditCommand::Add { .. } => CommandKind::Add,
            EditCommand::Remove { .. } => CommandKind::Remove,
            EditCommand::Move { .. } => CommandKind::Move,
            EditCommand::SetAttribute { .. } => CommandKind::SetAttribute,
            EditCommand::SetComment { .. } => CommandKind::SetComment,
            EditCommand::SetGuard { .. } => CommandKind::SetGuard,
            EditCommand::ClearGuard { .. } => CommandKind::ClearGuard,
        }
    }

    /// The task the edit is about.
    pub fn target(&self) -> TaskId {
        match self {
            EditCommand::Add { task, .. }
            | EditCommand::Remove { task, .. }
            | EditCommand::Move { task, .. }
            | EditCommand::SetAttribute { task, .. }
            | EditCommand::SetComment { task, .. }
            | EditCommand::SetGuard { task, .. }
            | EditCommand::ClearGuard { task, .. } => *task,
        }
    }

    /// Every task id the command touches.
    pub fn references(&self) -> Vec<TaskId> {
        match self {
            EditCommand::Add { parent, task, .. } | EditCommand::Remove { parent, task, .. } => {
                vec![*parent, *task]
            }
            EditCommand::Move { task, from, to } => vec![*task, from.0, to.0],
            EditCommand::SetAttribute { task, .. } | EditCommand::SetComment { task, .. } => {
                vec![*task]
            }
            EditCommand::SetGuard {
                task,
                guard,
                previous,
            } => {
                let mut ids = vec![*task, *guard];
                ids.extend(*previous);
                ids
            }
            EditCommand::ClearGuard { task, guard } => vec![*task, *guard],
        }
    }

    pub(crate) fn apply(&self, tree: &mut TaskTree) -> Result<(), EditError> {
        match self {
            EditCommand::Add {
                parent,
                task,
                index,
            } => tree.insert_child(*parent, *task, *index),
            EditCommand::Remove { parent, task, .. } => {
                if !tree.has(*parent, *task) {
                    return Err(EditError::NotAChild {
                        parent: *parent,
                        task: *task,
                    });
                }
                tree.detach(*task).map(|_| ())
            }
            EditCommand::Move { task, from, to } => relocate(tree, *task, *from, *to),
            EditCommand::SetAttribute {
                task, name, value, ..
            } => tree.put_attribute(*task, name, value.clone()).map(|_| ()),
            EditCommand::SetComment { task, comment, .. } => {
                tree.put_comment(*task, comment.clone()).map(|_| ())
            }
            EditCommand::SetGuard {
                task,
                guard,
                previous,
            } => {
                if let Some(previous) = previous {
                    expect_guard(tree, *task, *previous)?;
                    tree.detach(*previous)?;
                }
                tree.attach_guard(*task, *guard)
            }
            EditCommand::ClearGuard { task, guard } => {
                expect_guard(tree, *task, *guard)?;
                tree.detach(*guard).map(|_| ())
            }
        }
    }

    pub(crate) fn invert(&self, tree: &mut TaskTree) -> Result<(), EditError> {
        match self {
            EditCommand::Add { parent, task, .. } => {
                if !tree.has(*parent, *task) {
                    return Err(EditError::NotAChild {
                        parent: *parent,
                        task: *task,
                    });
                }
                tree.detach(*task).map(|_| ())
            }
            EditCommand::Remove {
                parent,
                task,
                index,
            } => tree.insert_child(*parent, *task, *index),
            EditCommand::Move { task, from, to } => relocate(tree, *task, *to, *from),
            EditCommand::SetAttribute {
                task,
                name,
                previous,
                ..
            } => tree.put_attribute(*task, name, previous.clone()).map(|_| ()),
            EditCommand::SetComment { task, previous, .. } => {
                tree.put_comment(*task, previous.clone()).map(|_| ())
            }
            EditCommand::SetGuard {
                task,
                guard,
                previous,
            } => {
                expect_guard(tree, *task, *guard)?;
                tree.detach(*guard)?;
                match previous {
                    Some(previous) => tree.attach_guard(*task, *previous),
                    None => Ok(()),
                }
            }
            EditCommand::ClearGuard { task, guard } => tree.attach_guard(*task, *guard),
        }
    }
}

fn relocate(
    tree: &mut TaskTree,
    task: TaskId,
    from: (TaskId, usize),
    to: (TaskId, usize),
) -> Result<(), EditError> {
    if tree.index_in_parent(task) != Some(from) {
        return Err(EditError::NotAChild {
            parent: from.0,
            task,
        });
    }
    tree.detach(task)?;
    if let Err(err) = tree.insert_child(to.0, task, to.1) {
        // Refused: restore the original position.
        tree.insert_child(from.0, task, from.1)?;
        return Err(err);
    }
    Ok(())
}

fn expect_guard(tree: &TaskTree, task: TaskId, guard: TaskId) -> Result<(), EditError> {
    if tree.parent(guard) == Some(ParentLink::Guard(task)) {
        Ok(())
    } else {
        Err(EditError::NoGuard(task))
    }
}
