use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::{AttrValue, TaskCategory, TaskSpec};

/// Stable handle of a task node. Ids are never reused within one tree, so history entries can
/// keep referring to detached nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub(crate) u32);

impl TaskId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// How a task hangs off its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentLink {
    Child(TaskId),
    /// The task is the guard of the given task.
    Guard(TaskId),
}

impl ParentLink {
    pub fn owner(self) -> TaskId {
        match self {
            ParentLink::Child(id) | ParentLink::Guard(id) => id,
        }
    }
}

/// One authored node: its kind, attribute values, comment, guard and children.
#[derive(Debug, Clone)]
pub struct TaskModel {
    pub(crate) spec: Rc<TaskSpec>,
    pub(crate) parent: Option<ParentLink>,
    pub(crate) children: Vec<TaskId>,
    pub(crate) guard: Option<TaskId>,
    pub(crate) attributes: BTreeMap<String, AttrValue>,
    pub(crate) comment: Option<String>,
}

impl TaskModel {
    pub(crate) fn new(spec: Rc<TaskSpec>) -> Self {
        let attributes = spec
            .attributes
            .iter()
            .filter_map(|a| a.default.clone().map(|v| (a.name.clone(), v)))
            .collect();
        Self {
            spec,
            parent: None,
            children: Vec::new(),
            guard: None,
            attributes,
            comment: None,
        }
    }

    pub fn kind(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn category(&self) -> TaskCategory {
        self.spec.category
    }

    pub fn parent(&self) -> Option<ParentLink> {
        self.parent
    }

    pub fn children(&self) -> &[TaskId] {
        &self.children
    }

    pub fn guard(&self) -> Option<TaskId> {
        self.guard
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttrValue> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// Trim every line of a user comment and drop the empty ones. `None` when nothing is left.
pub fn normalize_comment(text: &str) -> Option<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
