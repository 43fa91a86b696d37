//! Arena of task nodes with a synthetic root slot.
//!
//! The slot at [`TaskTree::ROOT`] is not a task of the document; it holds the document's root
//! task as its only child. Removing the root task leaves the slot empty and the tree invalid,
//! which is how the editor represents a document whose root was deleted.
//!
//! Readers get `&TaskTree`. Mutation is crate-private and goes through [`crate::EditCommand`].

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::{AttrValue, EditError, ParentLink, TaskCategory, TaskId, TaskModel, TaskSpec};

#[derive(Debug, Clone)]
pub struct TaskTree {
    nodes: Vec<Option<TaskModel>>,
}

impl Default for TaskTree {
    fn default() -> Self {
        Self::new()
    }
}

fn root_slot_spec() -> TaskSpec {
    TaskSpec::new("root", TaskCategory::Decorator, |mut args| args.single_child())
}

impl TaskTree {
    pub const ROOT: TaskId = TaskId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![Some(TaskModel::new(Rc::new(root_slot_spec())))],
        }
    }

    /// The document's root task, if the root slot is filled.
    pub fn root_task(&self) -> Option<TaskId> {
        self.get(Self::ROOT)
            .and_then(|slot| slot.children.first().copied())
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskModel> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub fn task(&self, id: TaskId) -> Result<&TaskModel, EditError> {
        self.get(id).ok_or(EditError::UnknownTask(id))
    }

    fn task_mut(&mut self, id: TaskId) -> Result<&mut TaskModel, EditError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(EditError::UnknownTask(id))
    }

    /// Allocated tasks, attached or not, excluding the root slot.
    pub fn allocated(&self) -> usize {
        self.nodes.iter().skip(1).filter(|n| n.is_some()).count()
    }

    pub fn child_count(&self, id: TaskId) -> Result<usize, EditError> {
        Ok(self.task(id)?.children.len())
    }

    pub fn child(&self, id: TaskId, index: usize) -> Result<TaskId, EditError> {
        let children = &self.task(id)?.children;
        children
            .get(index)
            .copied()
            .ok_or(EditError::IndexOutOfRange {
                index,
                len: children.len(),
            })
    }

    pub fn parent(&self, id: TaskId) -> Option<ParentLink> {
        self.get(id).and_then(|t| t.parent)
    }

    /// Position of `id` among its parent's children. `None` for guards and detached tasks.
    pub fn index_in_parent(&self, id: TaskId) -> Option<(TaskId, usize)> {
        match self.parent(id)? {
            ParentLink::Child(parent) => {
                let index = self.get(parent)?.children.iter().position(|c| *c == id)?;
                Some((parent, index))
            }
            ParentLink::Guard(_) => None,
        }
    }

    /// `task` is a direct child of `parent`.
    pub fn has(&self, parent: TaskId, task: TaskId) -> bool {
        self.parent(task) == Some(ParentLink::Child(parent))
    }

    /// `task` is `ancestor` or lives below it, through children or guards.
    pub fn contains(&self, ancestor: TaskId, task: TaskId) -> bool {
        let mut current = Some(task);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id).map(ParentLink::owner);
        }
        false
    }

    /// Reachable from the root slot.
    pub fn is_attached(&self, id: TaskId) -> bool {
        self.get(id).is_some() && self.contains(Self::ROOT, id)
    }

    /// `parent` has a free child slot.
    pub fn can_add(&self, parent: TaskId) -> bool {
        self.get(parent)
            .map_or(false, |p| p.spec.accepts_child(p.children.len()))
    }

    /// Type-check a value for an attribute of `id`, returning it coerced to the declared type.
    pub fn check_attribute(
        &self,
        id: TaskId,
        name: &str,
        value: AttrValue,
    ) -> Result<AttrValue, EditError> {
        let task = self.task(id)?;
        match task.spec.attribute(name) {
            Some(spec) => spec.ty.coerce(name, value),
            None if task.spec.open_attributes => Ok(value),
            None => Err(EditError::UnknownAttribute {
                kind: task.kind().to_string(),
                name: name.to_string(),
            }),
        }
    }

    pub fn attribute(&self, id: TaskId, name: &str) -> Result<Option<&AttrValue>, EditError> {
        let task = self.task(id)?;
        if task.spec.attribute(name).is_none() && !task.spec.open_attributes {
            return Err(EditError::UnknownAttribute {
                kind: task.kind().to_string(),
                name: name.to_string(),
            });
        }
        Ok(task.attributes.get(name))
    }

    /// Attached tasks in pre-order: a task, then its guard subtree, then its children.
    pub fn attached(&self) -> Vec<TaskId> {
        let mut out = Vec::new();
        if let Some(root) = self.root_task() {
            self.collect(root, &mut out);
        }
        out
    }

    /// `id` and everything below it, in the same order as [`TaskTree::attached`].
    pub fn subtree(&self, id: TaskId) -> Vec<TaskId> {
        let mut out = Vec::new();
        if self.get(id).is_some() {
            self.collect(id, &mut out);
        }
        out
    }

    fn collect(&self, id: TaskId, out: &mut Vec<TaskId>) {
        let Some(task) = self.get(id) else {
            return;
        };
        out.push(id);
        if let Some(guard) = task.guard {
            self.collect(guard, out);
        }
        for child in &task.children {
            self.collect(*child, out);
        }
    }

    pub fn path_of(&self, id: TaskId) -> Option<TaskPath> {
        let mut steps = Vec::new();
        let mut current = id;
        while current != Self::ROOT {
            match self.parent(current)? {
                ParentLink::Child(parent) => {
                    let index = self.get(parent)?.children.iter().position(|c| *c == current)?;
                    steps.push(PathStep::Child(index));
                    current = parent;
                }
                ParentLink::Guard(owner) => {
                    steps.push(PathStep::Guard);
                    current = owner;
                }
            }
        }
        steps.reverse();
        Some(TaskPath(steps))
    }

    pub fn find_by_path(&self, path: &TaskPath) -> Option<TaskId> {
        let mut current = Self::ROOT;
        for step in &path.0 {
            let task = self.get(current)?;
            current = match step {
                PathStep::Child(index) => *task.children.get(*index)?,
                PathStep::Guard => task.guard?,
            };
        }
        Some(current)
    }

    pub fn snapshot(&self) -> Option<TreeSnapshot> {
        self.snapshot_of(self.root_task()?)
    }

    pub fn snapshot_of(&self, id: TaskId) -> Option<TreeSnapshot> {
        let task = self.get(id)?;
        let guard = match task.guard {
            Some(guard) => Some(Box::new(self.snapshot_of(guard)?)),
            None => None,
        };
        let children = task
            .children
            .iter()
            .map(|c| self.snapshot_of(*c))
            .collect::<Option<Vec<_>>>()?;
        Some(TreeSnapshot {
            kind: task.kind().to_string(),
            attributes: task.attributes.clone(),
            comment: task.comment.clone(),
            guard,
            children,
        })
    }

    /// Everything that keeps the attached tree from being stepped.
    pub fn problems(&self) -> Vec<Problem> {
        let mut problems = Vec::new();
        match self.root_task() {
            Some(root) => self.check(root, &mut problems),
            None => problems.push(Problem::EmptyRoot),
        }
        problems
    }

    pub fn is_valid(&self) -> bool {
        self.problems().is_empty()
    }

    fn check(&self, id: TaskId, problems: &mut Vec<Problem>) {
        let Some(task) = self.get(id) else {
            return;
        };
        let spec = &task.spec;
        let found = task.children.len();
        if found < spec.min_children {
            problems.push(Problem::TooFewChildren {
                task: id,
                kind: spec.name.clone(),
                min: spec.min_children,
                found,
            });
        }
        if let Some(max) = spec.max_children.filter(|max| found > *max) {
            problems.push(Problem::TooManyChildren {
                task: id,
                kind: spec.name.clone(),
                max,
                found,
            });
        }
        for attr in spec.attributes.iter().filter(|a| a.required) {
            if !task.attributes.contains_key(&attr.name) {
                problems.push(Problem::MissingAttribute {
                    task: id,
                    kind: spec.name.clone(),
                    name: attr.name.clone(),
                });
            }
        }
        if let Some(guard) = task.guard {
            self.check(guard, problems);
        }
        for child in &task.children {
            self.check(*child, problems);
        }
    }

    pub(crate) fn create(&mut self, spec: Rc<TaskSpec>) -> TaskId {
        let id = TaskId(self.nodes.len() as u32);
        self.nodes.push(Some(TaskModel::new(spec)));
        id
    }

    pub(crate) fn insert_child(
        &mut self,
        parent: TaskId,
        task: TaskId,
        index: usize,
    ) -> Result<(), EditError> {
        if task == Self::ROOT {
            return Err(EditError::RootSlot);
        }
        if self.task(task)?.parent.is_some() {
            return Err(EditError::AlreadyAttached(task));
        }
        let owner = self.task(parent)?;
        if self.contains(task, parent) {
            return Err(EditError::Cycle { parent, task });
        }
        let len = owner.children.len();
        if index > len {
            return Err(EditError::IndexOutOfRange { index, len });
        }
        if !owner.spec.accepts_child(len) {
            return Err(EditError::NoChildSlots {
                parent,
                kind: owner.kind().to_string(),
                max: owner.spec.max_children.unwrap_or(len),
            });
        }

        self.task_mut(parent)?.children.insert(index, task);
        self.task_mut(task)?.parent = Some(ParentLink::Child(parent));
        Ok(())
    }

    /// Unlink `task` from its owner, returning where it was.
    pub(crate) fn detach(&mut self, task: TaskId) -> Result<(ParentLink, usize), EditError> {
        let link = self.task(task)?.parent.ok_or(EditError::NotAttached(task))?;
        let index = match link {
            ParentLink::Child(parent) => {
                let owner = self.task_mut(parent)?;
                let index = owner
                    .children
                    .iter()
                    .position(|c| *c == task)
                    .ok_or(EditError::NotAChild { parent, task })?;
                owner.children.remove(index);
                index
            }
            ParentLink::Guard(owner) => {
                self.task_mut(owner)?.guard = None;
                0
            }
        };
        self.task_mut(task)?.parent = None;
        Ok((link, index))
    }

    pub(crate) fn attach_guard(&mut self, owner: TaskId, guard: TaskId) -> Result<(), EditError> {
        if owner == Self::ROOT || guard == Self::ROOT {
            return Err(EditError::RootSlot);
        }
        if self.task(guard)?.parent.is_some() {
            return Err(EditError::AlreadyAttached(guard));
        }
        if self.contains(guard, owner) {
            return Err(EditError::Cycle {
                parent: owner,
                task: guard,
            });
        }
        let task = self.task_mut(owner)?;
        if task.guard.is_some() {
            return Err(EditError::AlreadyAttached(guard));
        }
        task.guard = Some(guard);
        self.task_mut(guard)?.parent = Some(ParentLink::Guard(owner));
        Ok(())
    }

    /// Set or clear a raw attribute value, returning the previous one. Callers type-check with
    /// [`TaskTree::check_attribute`] first.
    pub(crate) fn put_attribute(
        &mut self,
        id: TaskId,
        name: &str,
        value: Option<AttrValue>,
    ) -> Result<Option<AttrValue>, EditError> {
        let task = self.task_mut(id)?;
        Ok(match value {
            Some(value) => task.attributes.insert(name.to_string(), value),
            None => task.attributes.remove(name),
        })
    }

    pub(crate) fn put_comment(
        &mut self,
        id: TaskId,
        comment: Option<String>,
    ) -> Result<Option<String>, EditError> {
        let task = self.task_mut(id)?;
        Ok(std::mem::replace(&mut task.comment, comment))
    }

    /// Free a detached task and everything below it. Attached tasks are left alone.
    pub(crate) fn release(&mut self, id: TaskId) -> usize {
        if id == Self::ROOT || self.parent(id).is_some() {
            return 0;
        }
        let doomed = self.subtree(id);
        for id in &doomed {
            if let Some(slot) = self.nodes.get_mut(id.index()) {
                *slot = None;
            }
        }
        doomed.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathStep {
    Child(usize),
    Guard,
}

/// Location of a task relative to the root slot. The root task is `0`, its guard `0/g`, its
/// second child `0/1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TaskPath(pub Vec<PathStep>);

impl TaskPath {
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for TaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match step {
                PathStep::Child(index) => write!(f, "{index}")?,
                PathStep::Guard => f.write_str("g")?,
            }
        }
        Ok(())
    }
}

/// Owned structural copy of a subtree, compared by value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeSnapshot {
    pub kind: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttrValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<Box<TreeSnapshot>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeSnapshot>,
}

/// Why a tree cannot be stepped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    EmptyRoot,
    TooFewChildren {
        task: TaskId,
        kind: String,
        min: usize,
        found: usize,
    },
    TooManyChildren {
        task: TaskId,
        kind: String,
        max: usize,
        found: usize,
    },
    MissingAttribute {
        task: TaskId,
        kind: String,
        name: String,
    },
}

impl Problem {
    pub fn task(&self) -> Option<TaskId> {
        match self {
            Problem::EmptyRoot => None,
            Problem::TooFewChildren { task, .. }
            | Problem::TooManyChildren { task, .. }
            | Problem::MissingAttribute { task, .. } => Some(*task),
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::EmptyRoot => f.write_str("tree has no root task"),
            Problem::TooFewChildren {
                task,
                kind,
                min,
                found,
            } => write!(f, "`{kind}` {task} needs at least {min} children, has {found}"),
            Problem::TooManyChildren {
                task,
                kind,
                max,
                found,
            } => write!(f, "`{kind}` {task} takes at most {max} children, has {found}"),
            Problem::MissingAttribute { task, kind, name } => {
                write!(f, "`{kind}` {task} is missing required attribute `{name}`")
            }
        }
    }
}
