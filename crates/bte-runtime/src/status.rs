#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Status of a runtime task as last reported by a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TaskStatus {
    /// Never ticked since the tree was built or restarted.
    #[default]
    Fresh,
    Running,
    Success,
    Failure,
    /// Interrupted while running (parallel completion, guard failure, restart).
    Cancelled,
}

impl TaskStatus {
    pub fn is_done(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failure)
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Fresh => "fresh",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Failure => "failure",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}
