#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use bte_model::{
    AttrType, AttributeSpec, BehaviorTreeModel, FormatError, ModelListener, StepError, TaskId,
    TaskRegistry, TaskSpec, TaskStatus,
};
use bte_runtime::{Leaf, StepContext, Succeed, Task};

/// Built-ins plus a few host leaves.
pub fn registry() -> TaskRegistry {
    let mut registry = TaskRegistry::builtin();
    registry.register(
        TaskSpec::leaf("bark", |_args| Ok(Box::new(Succeed) as Box<dyn Task>))
            .with_path("dog.Bark")
            .with_attribute(AttributeSpec::new("times", AttrType::Int).with_default(1i64))
            .with_attribute(AttributeSpec::new("loud", AttrType::Bool)),
    );
    registry.register(
        TaskSpec::leaf("eat", |_args| Ok(Box::new(Succeed) as Box<dyn Task>))
            .with_attribute(AttributeSpec::new("food", AttrType::String).required()),
    );
    registry.register(
        TaskSpec::leaf("isHungry", |_args| Ok(Box::new(Succeed) as Box<dyn Task>))
            .with_attribute(AttributeSpec::new("threshold", AttrType::Float).with_default(0.5)),
    );
    registry.register(TaskSpec::leaf("explode", |_args| {
        Ok(Box::new(Leaf::new(
            |_ctx: &mut StepContext<'_>| -> Result<TaskStatus, StepError> { panic!("boom") },
        )) as Box<dyn Task>)
    }));
    registry.register(TaskSpec::leaf("broken", |_args| {
        Ok(Box::new(Leaf::new(|_ctx: &mut StepContext<'_>| {
            Err(StepError::task("broken", "sensor offline"))
        })) as Box<dyn Task>)
    }));
    registry
}

pub fn model() -> BehaviorTreeModel {
    BehaviorTreeModel::new(registry())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Init,
    Change,
    Reset,
    Save(PathBuf),
    Load(PathBuf),
    LoadError(String),
    StepError(String),
    Status(TaskId, TaskStatus, TaskStatus),
}

#[derive(Default, Clone)]
pub struct Recorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl Recorder {
    pub fn attach(model: &mut BehaviorTreeModel) -> Self {
        let recorder = Self::default();
        model.add_listener(Box::new(recorder.clone()));
        recorder
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| matches(e)).count()
    }

    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl ModelListener for Recorder {
    fn on_init(&mut self, model: &BehaviorTreeModel) {
        assert!(model.is_initialized());
        self.push(Event::Init);
    }

    fn on_change(&mut self, _model: &BehaviorTreeModel) {
        self.push(Event::Change);
    }

    fn on_reset(&mut self, _model: &BehaviorTreeModel) {
        self.push(Event::Reset);
    }

    fn on_save(&mut self, _model: &BehaviorTreeModel, path: &Path) {
        self.push(Event::Save(path.to_path_buf()));
    }

    fn on_load(&mut self, _model: &BehaviorTreeModel, path: &Path) {
        self.push(Event::Load(path.to_path_buf()));
    }

    fn on_load_error(&mut self, _model: &BehaviorTreeModel, error: &FormatError, _path: &Path) {
        self.push(Event::LoadError(error.to_string()));
    }

    fn on_step_error(&mut self, model: &BehaviorTreeModel, error: &StepError) {
        assert!(!model.is_auto_step());
        self.push(Event::StepError(error.to_string()));
    }

    fn on_status_changed(
        &mut self,
        _model: &BehaviorTreeModel,
        task: TaskId,
        previous: TaskStatus,
        current: TaskStatus,
    ) {
        self.push(Event::Status(task, previous, current));
    }
}
