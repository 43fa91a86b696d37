//! Line based tree format.
//!
//! ```text
//! # Alias definitions
//! import bark:"dog.Bark"
//!
//! subtree name:"guard0"
//!   sequence
//!     isHungry
//!     isAwake
//!
//! root
//!   selector
//!     # comment of the next task
//!     ($guard0) bark times:3
//!     (isHungry threshold:0.5) eat
//!     wait ticks:2
//! ```
//!
//! Indentation gives nesting. A task line is an optional guard chain, where each `(...)` guards
//! the next one and the last guards the task, followed by the task kind and its `name:value`
//! attributes. `($name)` refers to a `subtree` section. Runs of `#` lines directly above a task
//! become its comment.

mod parser;
mod writer;

pub use parser::parse;
pub use writer::write;
