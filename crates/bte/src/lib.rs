//! Umbrella crate that re-exports the `bte-*` building blocks.
//!
//! `runtime` is the steppable behavior tree; `model` is the editable document on top of it
//! (task tree, undo/redo, text format, live stepping and change listeners).

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub use bte_runtime as runtime;

#[cfg(feature = "model")]
#[cfg_attr(docsrs, doc(cfg(feature = "model")))]
pub use bte_model as model;

/// The types most hosts need.
#[cfg(feature = "model")]
#[cfg_attr(docsrs, doc(cfg(feature = "model")))]
pub mod prelude {
    pub use bte_model::{
        BehaviorTreeModel, EditorConfig, ModelError, ModelListener, TaskId, TaskRegistry,
        TaskSpec, TaskStatus,
    };
}
