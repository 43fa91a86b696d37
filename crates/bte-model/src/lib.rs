//! Document model of the behavior tree editor.
//!
//! A [`BehaviorTreeModel`] owns one authored tree of [`TaskModel`] nodes. Every structural or
//! attribute edit goes through the model, is recorded as an [`EditCommand`] on the
//! [`HistoryStack`] and is broadcast to registered [`ModelListener`]s. The same document can be
//! saved to and loaded from the line based tree format in [`format`], validated against the
//! [`TaskRegistry`], and single-stepped through a `bte-runtime` tree built from it.

#![forbid(unsafe_code)]

pub mod attr;
pub mod backup;
pub mod command;
pub mod config;
pub mod error;
pub mod format;
pub mod history;
pub mod listener;
pub mod live;
pub mod model;
pub mod registry;
pub mod step;
pub mod task;
pub mod tree;

pub use attr::{AttrType, AttrValue, AttributeSpec};
pub use backup::Backups;
pub use command::{CommandKind, EditCommand};
pub use config::{BackupConfig, EditorConfig, OverwritePolicy, SaveConfig, StepConfig};
pub use error::{ConfigError, EditError, FormatError, ModelError};
pub use history::HistoryStack;
pub use listener::{ListenerId, ModelListener};
pub use live::LiveTree;
pub use model::BehaviorTreeModel;
pub use registry::{BuildArgs, TaskCategory, TaskFactory, TaskRegistry, TaskSpec};
pub use step::StepStrategy;
pub use task::{ParentLink, TaskId, TaskModel};
pub use tree::{PathStep, Problem, TaskPath, TaskTree, TreeSnapshot};

pub use bte_runtime::{StepError, TaskStatus};
