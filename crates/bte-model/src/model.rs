use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::format;
use crate::listener::{ListenerId, ModelListener};
use crate::live::LiveTree;
use crate::step::{StepClock, StepStrategy};
use crate::task::normalize_comment;
use crate::tree::{Problem, TaskTree, TreeSnapshot};
use crate::{
    AttrValue, Backups, EditCommand, EditError, EditorConfig, FormatError, HistoryStack,
    ModelError, OverwritePolicy, ParentLink, StepError, TaskId, TaskRegistry, TaskSpec,
    TaskStatus,
};

const UNTITLED: &str = "untitled";

/// One open behavior tree document.
///
/// Starts empty; [`create`](Self::create) or a successful load initializes it. Every edit is
/// validated first and fails fast with an [`EditError`]; committed edits are recorded for
/// undo and announced through [`ModelListener::on_change`]. Load and step failures are both
/// returned and announced, since a timer or file dialog may have triggered them.
pub struct BehaviorTreeModel {
    registry: TaskRegistry,
    config: EditorConfig,
    tree: TaskTree,
    history: HistoryStack,
    initialized: bool,
    valid: bool,
    dirty: bool,
    name: String,
    path: Option<PathBuf>,
    live: Option<LiveTree>,
    auto_step: bool,
    clock: StepClock,
    backups: Option<Backups>,
    listeners: Vec<(ListenerId, Box<dyn ModelListener>)>,
    next_listener: u64,
}

impl BehaviorTreeModel {
    pub fn new(registry: TaskRegistry) -> Self {
        Self::with_config(registry, EditorConfig::default())
    }

    pub fn with_config(registry: TaskRegistry, config: EditorConfig) -> Self {
        Self {
            registry,
            tree: TaskTree::new(),
            history: HistoryStack::with_max_history(config.max_history),
            initialized: false,
            valid: false,
            dirty: false,
            name: UNTITLED.to_string(),
            path: None,
            live: None,
            auto_step: false,
            clock: StepClock::new(config.step.strategy()),
            backups: Backups::from_config(&config.backup),
            listeners: Vec::new(),
            next_listener: 0,
            config,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Make a new kind available to later edits and loads.
    pub fn register(&mut self, spec: TaskSpec) {
        self.registry.register(spec);
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tree(&self) -> &TaskTree {
        &self.tree
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn snapshot(&self) -> Option<TreeSnapshot> {
        self.tree.snapshot()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Initialized and free of validation problems, so it can be stepped.
    pub fn is_valid(&self) -> bool {
        self.initialized && self.valid
    }

    pub fn problems(&self) -> Vec<Problem> {
        self.tree.problems()
    }

    /// Edited since the last save or load.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn backups(&self) -> Option<&Backups> {
        self.backups.as_ref()
    }

    pub fn set_backups(&mut self, backups: Option<Backups>) {
        self.backups = backups;
    }

    pub fn add_listener(&mut self, listener: Box<dyn ModelListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> Option<Box<dyn ModelListener>> {
        let index = self.listeners.iter().position(|(l, _)| *l == id)?;
        Some(self.listeners.remove(index).1)
    }

    fn notify<F>(&mut self, mut event: F)
    where
        F: FnMut(&mut dyn ModelListener, &BehaviorTreeModel),
    {
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in listeners.iter_mut() {
            event(listener.as_mut(), self);
        }
        self.listeners = listeners;
    }

    /// Start a new document whose root task is `kind`.
    pub fn create(&mut self, kind: &str) -> Result<TaskId, ModelError> {
        let spec = self.spec(kind)?;
        let mut tree = TaskTree::new();
        let root = tree.create(spec);
        tree.insert_child(TaskTree::ROOT, root, 0)?;
        self.install(tree, UNTITLED.to_string(), None);
        info!(kind, "created tree");
        self.notify(|l, m| l.on_init(m));
        Ok(root)
    }

    /// Drop the document and its history.
    pub fn reset(&mut self) {
        self.tree = TaskTree::new();
        self.history = HistoryStack::with_max_history(self.config.max_history);
        self.initialized = false;
        self.valid = false;
        self.dirty = false;
        self.name = UNTITLED.to_string();
        self.path = None;
        self.live = None;
        self.auto_step = false;
        self.clock.reset();
        debug!("reset model");
        self.notify(|l, m| l.on_reset(m));
    }

    fn install(&mut self, tree: TaskTree, name: String, path: Option<PathBuf>) {
        self.history = HistoryStack::with_max_history(self.config.max_history);
        self.valid = tree.is_valid();
        self.tree = tree;
        self.initialized = true;
        self.dirty = false;
        self.name = name;
        self.path = path;
        self.live = None;
        self.auto_step = false;
        self.clock.reset();
    }

    /// Replace the document with the tree in `path`. On failure the current document is kept
    /// and listeners get exactly one `on_load_error`.
    pub fn load_tree(&mut self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let parsed = fs::read_to_string(path)
            .map_err(|e| FormatError::io(path, e))
            .and_then(|text| format::parse(&text, &self.registry));
        self.finish_load(parsed, path, Some(path.to_path_buf()))
    }

    /// Like [`load_tree`](Self::load_tree) for text that did not come from a file. `name`
    /// stands in for the path in notifications.
    pub fn load_str(&mut self, name: &str, text: &str) -> Result<(), ModelError> {
        let parsed = format::parse(text, &self.registry);
        self.finish_load(parsed, Path::new(name), None)
    }

    fn finish_load(
        &mut self,
        parsed: Result<TaskTree, FormatError>,
        source: &Path,
        file: Option<PathBuf>,
    ) -> Result<(), ModelError> {
        match parsed {
            Ok(tree) => {
                self.install(tree, document_name(source), file);
                info!(
                    source = %source.display(),
                    tasks = self.tree.attached().len(),
                    valid = self.valid,
                    "loaded tree"
                );
                self.notify(|l, m| l.on_init(m));
                self.notify(|l, m| l.on_load(m, source));
                Ok(())
            }
            Err(err) => {
                warn!(source = %source.display(), error = %err, "failed to load tree");
                self.notify(|l, m| l.on_load_error(m, &err, source));
                Err(err.into())
            }
        }
    }

    /// The document in the text format.
    pub fn to_text(&self) -> Result<String, ModelError> {
        self.require_initialized()?;
        Ok(format::write(&self.tree)?)
    }

    /// Write the document to `path`. An existing file is handled per the configured
    /// [`OverwritePolicy`]. The tree itself is not touched.
    pub fn save_tree(&mut self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let text = self.to_text()?;

        let existing = match fs::metadata(path) {
            Ok(meta) if meta.is_file() => Some(meta),
            Ok(_) => {
                return Err(FormatError::NotAFile {
                    path: path.to_path_buf(),
                }
                .into())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(FormatError::io(path, e).into()),
        };
        let exists = existing.is_some();
        let policy = self.config.save.overwrite;
        if exists && policy == OverwritePolicy::Refuse {
            return Err(FormatError::Exists {
                path: path.to_path_buf(),
            }
            .into());
        }

        let staged = stage(path, &text, existing.as_ref())?;
        let previous = (exists && policy == OverwritePolicy::Backup).then(|| backup_path(path));
        if let Some(previous) = &previous {
            fs::rename(path, previous).map_err(|e| FormatError::io(previous, e))?;
            debug!(previous = %previous.display(), "kept previous version");
        }
        if let Err(e) = staged.persist(path) {
            if let Some(previous) = &previous {
                if let Err(restore) = fs::rename(previous, path) {
                    warn!(
                        previous = %previous.display(),
                        error = %restore,
                        "failed to restore previous version"
                    );
                }
            }
            return Err(FormatError::io(path, e.error).into());
        }

        self.dirty = false;
        self.name = document_name(path);
        self.path = Some(path.to_path_buf());
        info!(path = %path.display(), "saved tree");
        self.notify(|l, m| l.on_save(m, path));
        Ok(())
    }

    fn require_initialized(&self) -> Result<(), EditError> {
        if self.initialized {
            Ok(())
        } else {
            Err(EditError::NotInitialized)
        }
    }

    fn require_attached(&self, id: TaskId) -> Result<(), EditError> {
        self.require_initialized()?;
        self.tree.task(id)?;
        if self.tree.is_attached(id) {
            Ok(())
        } else {
            Err(EditError::NotAttached(id))
        }
    }

    /// Parent and index of an attached child.
    fn position(&self, task: TaskId) -> Result<(TaskId, usize), EditError> {
        if task == TaskTree::ROOT {
            return Err(EditError::RootSlot);
        }
        self.require_attached(task)?;
        self.tree
            .index_in_parent(task)
            .ok_or(EditError::NotMovable(task))
    }

    fn spec(&self, kind: &str) -> Result<Rc<TaskSpec>, EditError> {
        self.registry
            .get(kind)
            .or_else(|| self.registry.by_path(kind))
            .cloned()
            .ok_or_else(|| EditError::UnknownKind(kind.to_string()))
    }

    fn commit(&mut self, command: EditCommand) -> Result<(), EditError> {
        self.history.push(command, &mut self.tree)?;
        self.changed();
        Ok(())
    }

    fn changed(&mut self) {
        self.valid = self.tree.is_valid();
        self.dirty = true;
        self.live = None;
        if self.valid {
            self.write_backup();
        }
        self.notify(|l, m| l.on_change(m));
    }

    fn write_backup(&self) {
        let Some(backups) = &self.backups else {
            return;
        };
        let written = format::write(&self.tree).and_then(|text| backups.write(&self.name, &text));
        if let Err(err) = written {
            warn!(error = %err, "backup failed");
        }
    }

    /// `parent` is attached and has a free child slot.
    pub fn can_add(&self, parent: TaskId) -> bool {
        self.require_attached(parent).is_ok() && self.tree.can_add(parent)
    }

    /// `task` could be dropped as a child of `parent`.
    pub fn can_move(&self, task: TaskId, parent: TaskId) -> bool {
        self.position(task).is_ok()
            && self.require_attached(parent).is_ok()
            && !self.tree.contains(task, parent)
            && (self.tree.has(parent, task) || self.tree.can_add(parent))
    }

    /// Append a new `kind` task to `parent`.
    pub fn add(&mut self, kind: &str, parent: TaskId) -> Result<TaskId, ModelError> {
        self.require_attached(parent)?;
        let index = self.tree.child_count(parent)?;
        self.add_at(kind, parent, index)
    }

    pub fn add_at(&mut self, kind: &str, parent: TaskId, index: usize) -> Result<TaskId, ModelError> {
        self.require_attached(parent)?;
        let spec = self.spec(kind)?;
        let task = self.tree.create(spec);
        match self.commit(EditCommand::Add {
            parent,
            task,
            index,
        }) {
            Ok(()) => Ok(task),
            Err(err) => {
                self.tree.release(task);
                Err(err.into())
            }
        }
    }

    pub fn add_before(&mut self, kind: &str, sibling: TaskId) -> Result<TaskId, ModelError> {
        let (parent, index) = self.position(sibling)?;
        self.add_at(kind, parent, index)
    }

    pub fn add_after(&mut self, kind: &str, sibling: TaskId) -> Result<TaskId, ModelError> {
        let (parent, index) = self.position(sibling)?;
        self.add_at(kind, parent, index + 1)
    }

    /// Detach `task` with its subtree. Removing a guard clears it from its owner.
    pub fn remove(&mut self, task: TaskId) -> Result<(), ModelError> {
        if task == TaskTree::ROOT {
            return Err(EditError::RootSlot.into());
        }
        self.require_attached(task)?;
        let command = match self.tree.parent(task) {
            Some(ParentLink::Child(parent)) => {
                let (_, index) = self.position(task)?;
                EditCommand::Remove {
                    parent,
                    task,
                    index,
                }
            }
            Some(ParentLink::Guard(owner)) => EditCommand::ClearGuard { task: owner, guard: task },
            None => return Err(EditError::NotAttached(task).into()),
        };
        Ok(self.commit(command)?)
    }

    /// Move `task` under `parent` so it ends up at `index`.
    pub fn move_to(&mut self, task: TaskId, parent: TaskId, index: usize) -> Result<(), ModelError> {
        let from = self.position(task)?;
        self.require_attached(parent)?;
        if self.tree.contains(task, parent) {
            return Err(EditError::Cycle { parent, task }.into());
        }
        let len = self.tree.child_count(parent)? - usize::from(from.0 == parent);
        if index > len {
            return Err(EditError::IndexOutOfRange { index, len }.into());
        }
        if from == (parent, index) {
            return Ok(());
        }
        Ok(self.commit(EditCommand::Move {
            task,
            from,
            to: (parent, index),
        })?)
    }

    pub fn move_before(&mut self, task: TaskId, sibling: TaskId) -> Result<(), ModelError> {
        let (parent, index) = self.position(sibling)?;
        let (from_parent, from_index) = self.position(task)?;
        if task == sibling {
            return Ok(());
        }
        let shift = usize::from(from_parent == parent && from_index < index);
        self.move_to(task, parent, index - shift)
    }

    pub fn move_after(&mut self, task: TaskId, sibling: TaskId) -> Result<(), ModelError> {
        let (parent, index) = self.position(sibling)?;
        let (from_parent, from_index) = self.position(task)?;
        if task == sibling {
            return Ok(());
        }
        let shift = usize::from(from_parent == parent && from_index < index);
        self.move_to(task, parent, index + 1 - shift)
    }

    /// Set an attribute, coercing it to the declared type. Setting the current value is not an
    /// edit.
    pub fn set_attribute(
        &mut self,
        task: TaskId,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> Result<(), ModelError> {
        self.require_attached(task)?;
        let value = self.tree.check_attribute(task, name, value.into())?;
        let previous = self.tree.attribute(task, name)?.cloned();
        if previous.as_ref() == Some(&value) {
            return Ok(());
        }
        Ok(self.commit(EditCommand::SetAttribute {
            task,
            name: name.to_string(),
            previous,
            value: Some(value),
        })?)
    }

    pub fn unset_attribute(&mut self, task: TaskId, name: &str) -> Result<(), ModelError> {
        self.require_attached(task)?;
        let Some(previous) = self.tree.attribute(task, name)?.cloned() else {
            return Ok(());
        };
        Ok(self.commit(EditCommand::SetAttribute {
            task,
            name: name.to_string(),
            previous: Some(previous),
            value: None,
        })?)
    }

    /// Set the user comment; lines are trimmed and blank ones dropped.
    pub fn set_comment(&mut self, task: TaskId, comment: Option<&str>) -> Result<(), ModelError> {
        self.require_attached(task)?;
        let comment = comment.and_then(normalize_comment);
        let previous = self.tree.task(task)?.comment().map(str::to_string);
        if previous == comment {
            return Ok(());
        }
        Ok(self.commit(EditCommand::SetComment {
            task,
            previous,
            comment,
        })?)
    }

    /// Guard `task` with a new `kind` task, replacing any existing guard.
    pub fn set_guard(&mut self, task: TaskId, kind: &str) -> Result<TaskId, ModelError> {
        if task == TaskTree::ROOT {
            return Err(EditError::RootSlot.into());
        }
        self.require_attached(task)?;
        let spec = self.spec(kind)?;
        let previous = self.tree.task(task)?.guard();
        let guard = self.tree.create(spec);
        match self.commit(EditCommand::SetGuard {
            task,
            guard,
            previous,
        }) {
            Ok(()) => Ok(guard),
            Err(err) => {
                self.tree.release(guard);
                Err(err.into())
            }
        }
    }

    pub fn clear_guard(&mut self, task: TaskId) -> Result<(), ModelError> {
        self.require_attached(task)?;
        let guard = self.tree.task(task)?.guard().ok_or(EditError::NoGuard(task))?;
        Ok(self.commit(EditCommand::ClearGuard { task, guard })?)
    }

    /// `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, ModelError> {
        if !self.history.undo(&mut self.tree)? {
            return Ok(false);
        }
        self.changed();
        Ok(true)
    }

    /// `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool, ModelError> {
        if !self.history.redo(&mut self.tree)? {
            return Ok(false);
        }
        self.changed();
        Ok(true)
    }

    pub fn is_auto_step(&self) -> bool {
        self.auto_step
    }

    pub fn set_auto_step(&mut self, enabled: bool) {
        self.auto_step = enabled;
        self.clock.reset();
    }

    pub fn step_strategy(&self) -> StepStrategy {
        self.clock.strategy()
    }

    pub fn set_step_strategy(&mut self, strategy: StepStrategy) {
        self.clock = StepClock::new(strategy);
    }

    /// Steps taken by the current runtime tree.
    pub fn steps(&self) -> u64 {
        self.live.as_ref().map_or(0, LiveTree::steps)
    }

    /// Status of `task` in the runtime tree; `Fresh` when nothing is running.
    pub fn status_of(&self, task: TaskId) -> TaskStatus {
        self.live
            .as_ref()
            .map(|live| live.status_of(task))
            .unwrap_or_default()
    }

    pub fn live(&self) -> Option<&LiveTree> {
        self.live.as_ref()
    }

    /// Host timer hook. Steps the tree when auto-step is on and the strategy says a step is
    /// due; step failures only reach listeners.
    pub fn update(&mut self, dt_seconds: f32) -> Option<TaskStatus> {
        if !self.auto_step || !self.is_valid() {
            return None;
        }
        if !self.clock.advance(dt_seconds) {
            return None;
        }
        self.step_once().ok()
    }

    /// Step once regardless of auto-step.
    pub fn force_step_behavior_tree(&mut self) -> Result<TaskStatus, ModelError> {
        self.step_once()
    }

    /// Put every runtime node back to `Fresh`, building the runtime tree if needed.
    pub fn restart_behavior_tree(&mut self) -> Result<(), ModelError> {
        self.clock.reset();
        if self.live.is_none() {
            return self.ensure_live();
        }
        let Some(live) = self.live.as_mut() else {
            return Ok(());
        };
        let changes: Vec<_> = live
            .restart()
            .iter()
            .filter_map(|c| live.task_of(c.node).map(|t| (t, c.previous, c.current)))
            .collect();
        info!("restarted tree");
        self.publish_statuses(&changes);
        Ok(())
    }

    fn ensure_live(&mut self) -> Result<(), ModelError> {
        self.require_initialized()?;
        if !self.valid {
            return Err(ModelError::InvalidTree {
                problems: self.tree.problems().len(),
            });
        }
        if self.live.is_none() {
            match LiveTree::build(&self.tree, self.config.step.seed) {
                Ok(live) => {
                    debug!(nodes = self.tree.attached().len(), "built runtime tree");
                    self.live = Some(live);
                }
                Err(err) => return Err(self.step_failed(err)),
            }
        }
        Ok(())
    }

    fn step_once(&mut self) -> Result<TaskStatus, ModelError> {
        self.ensure_live()?;
        let Some(live) = self.live.as_mut() else {
            return Err(EditError::NotInitialized.into());
        };
        match live.step() {
            Ok(report) => {
                let changes: Vec<_> = report
                    .changes
                    .iter()
                    .filter_map(|c| live.task_of(c.node).map(|t| (t, c.previous, c.current)))
                    .collect();
                debug!(step = report.step, status = %report.status, "stepped tree");
                self.publish_statuses(&changes);
                Ok(report.status)
            }
            Err(err) => Err(self.step_failed(err)),
        }
    }

    fn step_failed(&mut self, err: StepError) -> ModelError {
        self.auto_step = false;
        self.live = None;
        warn!(error = %err, "step failed, auto-step disabled");
        self.notify(|l, m| l.on_step_error(m, &err));
        ModelError::Step(err)
    }

    fn publish_statuses(&mut self, changes: &[(TaskId, TaskStatus, TaskStatus)]) {
        if changes.is_empty() {
            return;
        }
        self.notify(|l, m| {
            for &(task, previous, current) in changes {
                l.on_status_changed(m, task, previous, current);
            }
        });
    }
}

fn document_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(UNTITLED)
        .to_string()
}

/// `<file>.bak` next to `path`.
/// Write `text` to a temporary file beside `path` so a failed write never touches `path`.
/// The file being replaced lends its permissions.
fn stage(
    path: &Path,
    text: &str,
    existing: Option<&fs::Metadata>,
) -> Result<NamedTempFile, FormatError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(|e| FormatError::io(dir, e))?;
    file.write_all(text.as_bytes())
        .map_err(|e| FormatError::io(file.path(), e))?;
    if let Some(meta) = existing {
        fs::set_permissions(file.path(), meta.permissions())
            .map_err(|e| FormatError::io(file.path(), e))?;
    }
    Ok(file)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}
