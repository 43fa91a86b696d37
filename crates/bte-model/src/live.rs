//! Runtime tree instantiated from the document, with the mapping between runtime node ids and
//! document task ids.

use bte_runtime::{BehaviorTree, NodeId, Observed, StatusChange, StepError, StepReport, Task};

use crate::registry::BuildArgs;
use crate::tree::TaskTree;
use crate::{TaskId, TaskStatus};

pub struct LiveTree {
    runtime: BehaviorTree,
    /// Indexed by `NodeId`.
    tasks: Vec<TaskId>,
}

impl LiveTree {
    /// Instantiate every attached task through its kind's factory. Node ids follow
    /// [`TaskTree::attached`] order.
    pub fn build(tree: &TaskTree, seed: u64) -> Result<Self, StepError> {
        let root = tree.root_task().ok_or_else(|| StepError::Build {
            kind: "root".to_string(),
            message: "tree has no root task".to_string(),
        })?;
        let mut tasks = Vec::new();
        let runtime_root = build_node(tree, root, &mut tasks)?;
        Ok(Self {
            runtime: BehaviorTree::new(runtime_root).with_seed(seed),
            tasks,
        })
    }

    pub fn step(&mut self) -> Result<StepReport, StepError> {
        self.runtime.step()
    }

    pub fn restart(&mut self) -> Vec<StatusChange> {
        self.runtime.restart()
    }

    pub fn task_of(&self, node: NodeId) -> Option<TaskId> {
        self.tasks.get(node.0).copied()
    }

    pub fn node_of(&self, task: TaskId) -> Option<NodeId> {
        self.tasks.iter().position(|t| *t == task).map(NodeId)
    }

    pub fn status_of(&self, task: TaskId) -> TaskStatus {
        self.node_of(task)
            .map(|node| self.runtime.status_of(node))
            .unwrap_or_default()
    }

    pub fn steps(&self) -> u64 {
        self.runtime.steps()
    }

    pub fn runtime(&self) -> &BehaviorTree {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut BehaviorTree {
        &mut self.runtime
    }
}

fn build_node(
    tree: &TaskTree,
    id: TaskId,
    tasks: &mut Vec<TaskId>,
) -> Result<Box<dyn Task>, StepError> {
    let task = tree.task(id).map_err(|e| StepError::Build {
        kind: "?".to_string(),
        message: e.to_string(),
    })?;
    let node = NodeId(tasks.len());
    tasks.push(id);

    let guard = match task.guard() {
        Some(guard) => Some(build_node(tree, guard, tasks)?),
        None => None,
    };
    let children = task
        .children()
        .iter()
        .map(|child| build_node(tree, *child, tasks))
        .collect::<Result<Vec<_>, _>>()?;

    let inner = (task.spec().factory)(BuildArgs {
        node,
        kind: task.kind(),
        attributes: task.attributes(),
        children,
    })?;
    let observed = Observed::new(node, inner);
    Ok(Box::new(match guard {
        Some(guard) => observed.with_guard(guard),
        None => observed,
    }))
}
