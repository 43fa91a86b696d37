use thiserror::Error;

/// Errors raised while stepping a runtime tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("task `{task}` failed: {message}")]
    Task { task: String, message: String },

    #[error("guard of node {node} is still running; guards must finish within one step")]
    GuardRunning { node: usize },

    #[error("blackboard entry `{key}` holds a value of another type")]
    BlackboardType { key: &'static str },

    #[error("task panicked during step {step}: {message}")]
    Panicked { step: u64, message: String },

    #[error("tree faulted on an earlier step; restart it before stepping again")]
    Faulted,

    #[error("cannot instantiate task `{kind}`: {message}")]
    Build { kind: String, message: String },
}

impl StepError {
    pub fn task(task: impl Into<String>, message: impl Into<String>) -> Self {
        StepError::Task {
            task: task.into(),
            message: message.into(),
        }
    }
}
