#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{StepContext, StepError, TaskStatus};

/// Index of a node inside one runtime tree. Assigned by whoever builds the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(pub usize);

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A runtime behavior-tree task.
///
/// `tick` must answer `Running`, `Success` or `Failure`; the other statuses are bookkeeping
/// states owned by [`Observed`].
pub trait Task: 'static {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError>;

    /// Abandon a running task. Defaults to a plain reset.
    fn cancel(&mut self, _ctx: &mut StepContext<'_>) {
        self.reset();
    }

    fn reset(&mut self);
}

/// Shell around every built node: evaluates the optional guard, reports status transitions
/// under the node id and rejects bookkeeping statuses coming out of `tick`.
pub struct Observed {
    node: NodeId,
    guard: Option<Box<dyn Task>>,
    inner: Box<dyn Task>,
}

impl Observed {
    pub fn new(node: NodeId, inner: Box<dyn Task>) -> Self {
        Self {
            node,
            guard: None,
            inner,
        }
    }

    pub fn with_guard(mut self, guard: Box<dyn Task>) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    fn abandon(&mut self, ctx: &mut StepContext<'_>) {
        if ctx.status_of(self.node) == TaskStatus::Running {
            self.inner.cancel(ctx);
        } else {
            self.inner.reset();
        }
    }
}

impl Task for Observed {
    fn tick(&mut self, ctx: &mut StepContext<'_>) -> Result<TaskStatus, StepError> {
        if let Some(guard) = self.guard.as_mut() {
            let verdict = guard.tick(ctx)?;
            guard.reset();
            match verdict {
                TaskStatus::Success => {}
                TaskStatus::Running => {
                    return Err(StepError::GuardRunning { node: self.node.0 });
                }
                _ => {
                    self.abandon(ctx);
                    ctx.report(self.node, TaskStatus::Failure);
                    return Ok(TaskStatus::Failure);
                }
            }
        }

        let status = self.inner.tick(ctx)?;
        match status {
            TaskStatus::Running | TaskStatus::Success | TaskStatus::Failure => {
                ctx.report(self.node, status);
                Ok(status)
            }
            other => Err(StepError::task(
                self.node.to_string(),
                format!("tick answered `{other}`"),
            )),
        }
    }

    fn cancel(&mut self, ctx: &mut StepContext<'_>) {
        let was_running = ctx.status_of(self.node) == TaskStatus::Running;
        self.abandon(ctx);
        if was_running {
            ctx.report(self.node, TaskStatus::Cancelled);
        }
    }

    fn reset(&mut self) {
        self.inner.reset();
        if let Some(guard) = self.guard.as_mut() {
            guard.reset();
        }
    }
}
