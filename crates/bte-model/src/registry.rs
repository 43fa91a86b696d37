//! Task kinds known to the editor.
//!
//! Kinds are described by data (`TaskSpec`): child count bounds, attribute schema and a factory
//! that instantiates the runtime task. Hosts add their own leaves with [`TaskRegistry::register`].

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use bte_runtime::{
    AlwaysFail, AlwaysSucceed, Fail, Invert, NodeId, Parallel, ParallelPolicy, RandomSelector,
    RandomSequence, Repeat, Selector, Sequence, StepError, Succeed, Task, UntilFail, UntilSuccess,
    Wait,
};

use crate::{AttrType, AttrValue, AttributeSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskCategory {
    Composite,
    Decorator,
    Leaf,
}

impl TaskCategory {
    /// Default `(min, max)` child counts; `None` is unbounded.
    pub fn default_children(self) -> (usize, Option<usize>) {
        match self {
            TaskCategory::Composite => (1, None),
            TaskCategory::Decorator => (1, Some(1)),
            TaskCategory::Leaf => (0, Some(0)),
        }
    }

    fn default_tag(self) -> &'static str {
        match self {
            TaskCategory::Composite => "branch",
            TaskCategory::Decorator => "decorator",
            TaskCategory::Leaf => "leaf",
        }
    }
}

/// Input of a [`TaskFactory`]: the document node being instantiated with its already built
/// children.
pub struct BuildArgs<'a> {
    pub node: NodeId,
    pub kind: &'a str,
    pub attributes: &'a BTreeMap<String, AttrValue>,
    pub children: Vec<Box<dyn Task>>,
}

impl BuildArgs<'_> {
    pub fn int(&self, name: &str) -> Option<i64> {
        self.attributes.get(name).and_then(AttrValue::as_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(AttrValue::as_float)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.attributes.get(name).and_then(AttrValue::as_bool)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(AttrValue::as_str)
    }

    pub fn error(&self, message: impl Into<String>) -> StepError {
        StepError::Build {
            kind: self.kind.to_string(),
            message: message.into(),
        }
    }

    /// The only child of a decorator.
    pub fn single_child(&mut self) -> Result<Box<dyn Task>, StepError> {
        if self.children.len() != 1 {
            return Err(self.error(format!(
                "expected exactly one child, found {}",
                self.children.len()
            )));
        }
        self.children
            .pop()
            .ok_or_else(|| self.error("missing child"))
    }
}

pub type TaskFactory = Rc<dyn Fn(BuildArgs<'_>) -> Result<Box<dyn Task>, StepError>>;

/// Description of one task kind.
#[derive(Clone)]
pub struct TaskSpec {
    /// Name used in the text format and the palette.
    pub name: String,
    /// Fully qualified path written as an `import` line, for kinds that are not built in.
    pub path: Option<String>,
    pub category: TaskCategory,
    /// Palette group.
    pub tag: String,
    pub min_children: usize,
    pub max_children: Option<usize>,
    pub attributes: Vec<AttributeSpec>,
    /// Accept attributes missing from the schema with whatever type they are given.
    pub open_attributes: bool,
    pub comment: Option<String>,
    pub factory: TaskFactory,
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("category", &self.category)
            .field("tag", &self.tag)
            .field("min_children", &self.min_children)
            .field("max_children", &self.max_children)
            .field("attributes", &self.attributes)
            .field("open_attributes", &self.open_attributes)
            .finish_non_exhaustive()
    }
}

impl TaskSpec {
    pub fn new<F>(name: impl Into<String>, category: TaskCategory, factory: F) -> Self
    where
        F: Fn(BuildArgs<'_>) -> Result<Box<dyn Task>, StepError> + 'static,
    {
        let (min_children, max_children) = category.default_children();
        Self {
            name: name.into(),
            path: None,
            category,
            tag: category.default_tag().to_string(),
            min_children,
            max_children,
            attributes: Vec::new(),
            open_attributes: false,
            comment: None,
            factory: Rc::new(factory),
        }
    }

    pub fn leaf<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(BuildArgs<'_>) -> Result<Box<dyn Task>, StepError> + 'static,
    {
        Self::new(name, TaskCategory::Leaf, factory)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_children(mut self, min: usize, max: Option<usize>) -> Self {
        self.min_children = min;
        self.max_children = max;
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_open_attributes(mut self) -> Self {
        self.open_attributes = true;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// True while `count` children leave room for another one.
    pub fn accepts_child(&self, count: usize) -> bool {
        self.max_children.map_or(true, |max| count < max)
    }
}

/// Set of task kinds, looked up by name or by import path.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    specs: BTreeMap<String, Rc<TaskSpec>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in composites, decorators and leaves.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for spec in builtin_specs() {
            registry.register(spec);
        }
        registry
    }

    /// Add a kind, replacing (and returning) any kind with the same name.
    pub fn register(&mut self, spec: TaskSpec) -> Option<Rc<TaskSpec>> {
        self.specs.insert(spec.name.clone(), Rc::new(spec))
    }

    pub fn get(&self, name: &str) -> Option<&Rc<TaskSpec>> {
        self.specs.get(name)
    }

    pub fn by_path(&self, path: &str) -> Option<&Rc<TaskSpec>> {
        self.specs
            .values()
            .find(|spec| spec.path.as_deref() == Some(path))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<TaskSpec>> {
        self.specs.values()
    }

    /// Kinds grouped by tag, as the editor drawer shows them.
    pub fn palette(&self) -> BTreeMap<&str, Vec<&TaskSpec>> {
        let mut groups: BTreeMap<&str, Vec<&TaskSpec>> = BTreeMap::new();
        for spec in self.specs.values() {
            groups.entry(spec.tag.as_str()).or_default().push(spec);
        }
        groups
    }
}

fn composite<F>(name: &str, build: F) -> TaskSpec
where
    F: Fn(NodeId, Vec<Box<dyn Task>>) -> Box<dyn Task> + 'static,
{
    TaskSpec::new(name, TaskCategory::Composite, move |args: BuildArgs<'_>| {
        Ok(build(args.node, args.children))
    })
}

fn decorator<F>(name: &str, build: F) -> TaskSpec
where
    F: Fn(Box<dyn Task>) -> Box<dyn Task> + 'static,
{
    TaskSpec::new(name, TaskCategory::Decorator, move |mut args: BuildArgs<'_>| {
        Ok(build(args.single_child()?))
    })
}

fn builtin_specs() -> Vec<TaskSpec> {
    vec![
        composite("sequence", |_, children| Box::new(Sequence::new(children)))
            .with_comment("Runs children in order until one fails"),
        composite("selector", |_, children| Box::new(Selector::new(children)))
            .with_comment("Runs children in order until one succeeds"),
        composite("randomSequence", |node, children| {
            Box::new(RandomSequence::new(node, children))
        }),
        composite("randomSelector", |node, children| {
            Box::new(RandomSelector::new(node, children))
        }),
        TaskSpec::new("parallel", TaskCategory::Composite, |args: BuildArgs<'_>| {
            let policy = match args.string("policy").unwrap_or("sequence") {
                "sequence" => ParallelPolicy::Sequence,
                "selector" => ParallelPolicy::Selector,
                other => return Err(args.error(format!("unknown policy `{other}`"))),
            };
            Ok(Box::new(Parallel::new(policy, args.children)) as Box<dyn Task>)
        })
        .with_attribute(
            AttributeSpec::new("policy", AttrType::enumeration(["sequence", "selector"]))
                .with_default("sequence"),
        )
        .with_comment("Runs all children every step"),
        decorator("invert", |child| Box::new(Invert::new(child))),
        decorator("alwaysSucceed", |child| Box::new(AlwaysSucceed::new(child))),
        decorator("alwaysFail", |child| Box::new(AlwaysFail::new(child))),
        decorator("untilSuccess", |child| Box::new(UntilSuccess::new(child))),
        decorator("untilFail", |child| Box::new(UntilFail::new(child))),
        TaskSpec::new("repeat", TaskCategory::Decorator, |mut args: BuildArgs<'_>| {
            let times = match args.int("times").unwrap_or(-1) {
                -1 => None,
                n if n >= 0 => Some(n as u64),
                n => return Err(args.error(format!("times must be -1 or positive, got {n}"))),
            };
            Ok(Box::new(Repeat::new(args.single_child()?, times)) as Box<dyn Task>)
        })
        .with_attribute(
            AttributeSpec::new("times", AttrType::Int)
                .with_default(-1i64)
                .with_comment("-1 repeats forever"),
        ),
        TaskSpec::leaf("success", |_args: BuildArgs<'_>| {
            Ok(Box::new(Succeed) as Box<dyn Task>)
        }),
        TaskSpec::leaf("failure", |_args: BuildArgs<'_>| {
            Ok(Box::new(Fail) as Box<dyn Task>)
        }),
        TaskSpec::leaf("wait", |args: BuildArgs<'_>| {
            let ticks = args.int("ticks").unwrap_or(1);
            if ticks < 0 {
                return Err(args.error(format!("ticks must not be negative, got {ticks}")));
            }
            Ok(Box::new(Wait::new(ticks as u64)) as Box<dyn Task>)
        })
        .with_attribute(AttributeSpec::new("ticks", AttrType::Int).with_default(1i64))
        .with_comment("Runs for the given number of steps, then succeeds"),
    ]
}
