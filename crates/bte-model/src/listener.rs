use std::path::Path;

use crate::{BehaviorTreeModel, FormatError, StepError, TaskId, TaskStatus};

/// Handle returned by [`BehaviorTreeModel::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Observer of a [`BehaviorTreeModel`], typically the editor view.
///
/// Callbacks run synchronously in mutation order and only get the model by shared reference,
/// so they cannot edit it.
pub trait ModelListener {
    /// A tree was created or loaded.
    fn on_init(&mut self, _model: &BehaviorTreeModel) {}

    /// An edit, undo or redo was committed.
    fn on_change(&mut self, _model: &BehaviorTreeModel) {}

    /// The document was cleared.
    fn on_reset(&mut self, _model: &BehaviorTreeModel) {}

    fn on_save(&mut self, _model: &BehaviorTreeModel, _path: &Path) {}

    fn on_load(&mut self, _model: &BehaviorTreeModel, _path: &Path) {}

    /// Loading failed; the previous tree is still in place.
    fn on_load_error(&mut self, _model: &BehaviorTreeModel, _error: &FormatError, _path: &Path) {}

    /// A step failed; auto-step has been switched off.
    fn on_step_error(&mut self, _model: &BehaviorTreeModel, _error: &StepError) {}

    fn on_status_changed(
        &mut self,
        _model: &BehaviorTreeModel,
        _task: TaskId,
        _previous: TaskStatus,
        _current: TaskStatus,
    ) {
    }
}
