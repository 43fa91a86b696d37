use std::path::PathBuf;

use bte_runtime::StepError;
use thiserror::Error;

use crate::TaskId;

/// Structural and attribute errors, reported synchronously to the caller of an edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("no tree has been created or loaded")]
    NotInitialized,

    #[error("task {0} does not exist")]
    UnknownTask(TaskId),

    #[error("task {0} is not part of the tree")]
    NotAttached(TaskId),

    #[error("task {0} already has a parent")]
    AlreadyAttached(TaskId),

    #[error("adding {task} under {parent} would create a cycle")]
    Cycle { parent: TaskId, task: TaskId },

    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("`{kind}` task {parent} accepts no more than {max} children")]
    NoChildSlots {
        parent: TaskId,
        kind: String,
        max: usize,
    },

    #[error("task {task} is not a child of {parent}")]
    NotAChild { parent: TaskId, task: TaskId },

    #[error("task {0} is a guard; only children can be moved")]
    NotMovable(TaskId),

    #[error("the root slot cannot be removed, moved or guarded")]
    RootSlot,

    #[error("unknown task kind `{0}`")]
    UnknownKind(String),

    #[error("`{kind}` has no attribute `{name}`")]
    UnknownAttribute { kind: String, name: String },

    #[error("attribute `{name}` expects {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("task {0} has no guard")]
    NoGuard(TaskId),
}

/// Errors reading or writing the text format.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: inconsistent indentation")]
    BadIndent { line: usize },

    #[error("line {line}: unknown task `{kind}`")]
    UnknownKind { line: usize, kind: String },

    #[error("line {line}: `{kind}` has no attribute `{name}`")]
    UnknownAttribute {
        line: usize,
        kind: String,
        name: String,
    },

    #[error("line {line}: bad value for `{name}`: {message}")]
    BadValue {
        line: usize,
        name: String,
        message: String,
    },

    #[error("missing `root` section")]
    MissingRoot,

    #[error("line {line}: second `root` section")]
    DuplicateRoot { line: usize },

    #[error("line {line}: unknown subtree `{name}`")]
    UnknownSubtree { line: usize, name: String },

    #[error("line {line}: subtree `{name}` defined twice")]
    DuplicateSubtree { line: usize, name: String },

    #[error("cannot write {task}: {message}")]
    Unrepresentable { task: String, message: String },

    #[error("{} is not a file", path.display())]
    NotAFile { path: PathBuf },

    #[error("refusing to overwrite {}", path.display())]
    Exists { path: PathBuf },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FormatError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FormatError::Io {
            path: path.into(),
            source,
        }
    }

    /// Line the error points at, when it comes from parsing.
    pub fn line(&self) -> Option<usize> {
        match self {
            FormatError::Syntax { line, .. }
            | FormatError::BadIndent { line }
            | FormatError::UnknownKind { line, .. }
            | FormatError::UnknownAttribute { line, .. }
            | FormatError::BadValue { line, .. }
            | FormatError::DuplicateRoot { line }
            | FormatError::UnknownSubtree { line, .. }
            | FormatError::DuplicateSubtree { line, .. } => Some(*line),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config from {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Everything the model API can fail with.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("tree has {problems} validation problem(s) and cannot be stepped")]
    InvalidTree { problems: usize },
}
