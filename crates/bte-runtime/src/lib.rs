//! Steppable behavior tree runtime.
//!
//! The editor model builds a [`BehaviorTree`] out of its document and single-steps it for live
//! debugging. Every node is wrapped in an [`Observed`] shell so status transitions can be mapped
//! back to the document node that produced them.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod blackboard;
pub mod context;
pub mod error;
pub mod nodes;
pub mod rng;
pub mod status;
pub mod task;
pub mod trace;
pub mod tree;

pub use blackboard::{BbKey, Blackboard};
pub use context::StepContext;
pub use error::StepError;
pub use nodes::{
    AlwaysFail, AlwaysSucceed, Condition, Fail, Invert, Leaf, Parallel, ParallelPolicy,
    RandomSelector, RandomSequence, Repeat, Selector, Sequence, Succeed, UntilFail, UntilSuccess,
    Wait,
};
pub use rng::{DeterministicRng, SplitMix64};
pub use status::TaskStatus;
pub use task::{NodeId, Observed, Task};
pub use trace::{NullTraceSink, StatusChange, TraceLog, TraceSink};
pub use tree::{BehaviorTree, StepReport};
