//! bte - behavior tree files from the command line.
//!
//! - `bte check` - validate trees
//! - `bte fmt` - rewrite trees in canonical form
//! - `bte outline` - show the task hierarchy
//! - `bte step` - run a tree for a number of steps
//! - `bte kinds` - list the available task kinds
//! - `bte init` - write a default project config

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use bte_model::{
    BehaviorTreeModel, EditorConfig, ModelListener, ParentLink, StepError, TaskId,
    TaskRegistry, TaskSpec, TaskStatus,
};
use bte_runtime::{Leaf, StepContext, Task};

#[derive(Parser)]
#[command(name = "bte")]
#[command(about = "Behavior tree editor tools", version)]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Register a leaf kind the built-ins lack, as `name` or `name=status`
    #[arg(long = "stub", global = true, value_name = "KIND[=STATUS]")]
    stubs: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate tree files
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print a tree in canonical form
    Fmt {
        file: PathBuf,

        /// Rewrite the file instead of printing
        #[arg(long)]
        write: bool,
    },

    /// Show the task hierarchy
    Outline {
        file: PathBuf,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Step a tree
    Step {
        file: PathBuf,

        /// Number of steps
        #[arg(long, default_value = "1")]
        steps: u64,

        /// Seed for the random composites
        #[arg(long)]
        seed: Option<u64>,

        /// Write every status change to this JSON file
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// List the available task kinds
    Kinds,

    /// Initialize a new project
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let project_root = match cli.project {
        Some(root) => root,
        None => std::env::current_dir().context("cannot determine the current directory")?,
    };

    let mut config = EditorConfig::load_from_project(&project_root)?;
    config.resolve_paths(&project_root);

    let mut registry = TaskRegistry::builtin();
    for stub in &cli.stubs {
        registry.register(stub_spec(stub)?);
    }

    match cli.command {
        Commands::Check { files } => check(&files, &registry, &config),
        Commands::Fmt { file, write } => format_file(&file, registry, config, write),
        Commands::Outline { file, json } => outline(&file, registry, config, json),
        Commands::Step {
            file,
            steps,
            seed,
            trace,
        } => {
            if let Some(seed) = seed {
                config.step.seed = seed;
            }
            step(&file, registry, config, steps, trace.as_deref())
        }
        Commands::Kinds => {
            list_kinds(&registry);
            Ok(())
        }
        Commands::Init => init_project(&project_root),
    }
}

/// `name` or `name=status`; the stub answers `status` on every tick.
fn stub_spec(arg: &str) -> Result<TaskSpec> {
    let (name, status) = match arg.split_once('=') {
        Some((name, status)) => (name, parse_status(status)?),
        None => (arg, TaskStatus::Success),
    };
    if name.is_empty() {
        bail!("stub `{arg}` has no kind name");
    }
    Ok(TaskSpec::leaf(name, move |_args| {
        Ok(Box::new(Leaf::new(move |_ctx: &mut StepContext<'_>| Ok(status))) as Box<dyn Task>)
    })
    .with_open_attributes()
    .with_tag("stub"))
}

fn parse_status(text: &str) -> Result<TaskStatus> {
    Ok(match text {
        "success" => TaskStatus::Success,
        "failure" => TaskStatus::Failure,
        "running" => TaskStatus::Running,
        other => bail!("stub status must be success, failure or running, got `{other}`"),
    })
}

fn open(path: &Path, registry: TaskRegistry, config: EditorConfig) -> Result<BehaviorTreeModel> {
    let mut model = BehaviorTreeModel::with_config(registry, config);
    model
        .load_tree(path)
        .with_context(|| format!("cannot load {}", path.display()))?;
    Ok(model)
}

fn check(files: &[PathBuf], registry: &TaskRegistry, config: &EditorConfig) -> Result<()> {
    let mut failed = 0;
    for file in files {
        let model = match open(file, registry.clone(), config.clone()) {
            Ok(model) => model,
            Err(err) => {
                println!("{}: {err:#}", file.display());
                failed += 1;
                continue;
            }
        };
        let problems = model.problems();
        if problems.is_empty() {
            println!("{}: ok ({} tasks)", file.display(), model.tree().attached().len());
            continue;
        }
        failed += 1;
        for problem in problems {
            let at = problem
                .task()
                .and_then(|task| model.tree().path_of(task))
                .map(|path| format!(" at {path}"))
                .unwrap_or_default();
            println!("{}{at}: {problem}", file.display());
        }
    }
    if failed > 0 {
        bail!("{failed} of {} trees failed the check", files.len());
    }
    Ok(())
}

fn format_file(
    file: &Path,
    registry: TaskRegistry,
    config: EditorConfig,
    write: bool,
) -> Result<()> {
    let mut model = open(file, registry, config)?;
    if write {
        model.save_tree(file)?;
        tracing::info!(file = %file.display(), "formatted");
    } else {
        print!("{}", model.to_text()?);
    }
    Ok(())
}

fn outline(file: &Path, registry: TaskRegistry, config: EditorConfig, json: bool) -> Result<()> {
    let model = open(file, registry, config)?;
    if json {
        let snapshot = model.snapshot().context("tree has no root task")?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let tree = model.tree();
    for id in tree.attached() {
        let Some(path) = tree.path_of(id) else {
            continue;
        };
        let task = tree.task(id)?;
        let indent = "  ".repeat(path.depth().saturating_sub(1));
        let marker = match task.parent() {
            Some(ParentLink::Guard(_)) => "? ",
            _ => "",
        };
        let attributes: String = task
            .attributes()
            .iter()
            .map(|(name, value)| format!(" {name}={}", render(value)))
            .collect();
        println!("{:<12} {indent}{marker}{}{attributes}", path.to_string(), task.kind());
    }
    Ok(())
}

fn render(value: &bte_model::AttrValue) -> String {
    match value {
        bte_model::AttrValue::String(s) => format!("{s:?}"),
        bte_model::AttrValue::Float(f) => format!("{f:?}"),
        bte_model::AttrValue::Int(i) => i.to_string(),
        bte_model::AttrValue::Bool(b) => b.to_string(),
    }
}

/// One status change, addressed by task path.
#[derive(Debug, Clone, Serialize)]
struct TraceEntry {
    step: u64,
    task: String,
    kind: String,
    previous: TaskStatus,
    current: TaskStatus,
}

#[derive(Default, Clone)]
struct TraceRecorder {
    entries: Rc<RefCell<Vec<TraceEntry>>>,
    errors: Rc<RefCell<Vec<String>>>,
}

impl ModelListener for TraceRecorder {
    fn on_status_changed(
        &mut self,
        model: &BehaviorTreeModel,
        task: TaskId,
        previous: TaskStatus,
        current: TaskStatus,
    ) {
        let tree = model.tree();
        let path = tree
            .path_of(task)
            .map(|p| p.to_string())
            .unwrap_or_else(|| task.to_string());
        let kind = tree
            .get(task)
            .map(|t| t.kind().to_string())
            .unwrap_or_default();
        tracing::debug!(step = model.steps(), task = %path, %previous, %current, "status");
        self.entries.borrow_mut().push(TraceEntry {
            step: model.steps(),
            task: path,
            kind,
            previous,
            current,
        });
    }

    fn on_step_error(&mut self, _model: &BehaviorTreeModel, error: &StepError) {
        self.errors.borrow_mut().push(error.to_string());
    }
}

#[derive(Serialize)]
struct Trace<'a> {
    file: String,
    seed: u64,
    steps: u64,
    changes: &'a [TraceEntry],
}

fn step(
    file: &Path,
    registry: TaskRegistry,
    config: EditorConfig,
    steps: u64,
    trace: Option<&Path>,
) -> Result<()> {
    let seed = config.step.seed;
    let mut model = open(file, registry, config)?;
    if !model.is_valid() {
        for problem in model.problems() {
            println!("{}: {problem}", file.display());
        }
        bail!("{} cannot be stepped", file.display());
    }

    let recorder = TraceRecorder::default();
    model.add_listener(Box::new(recorder.clone()));

    let mut taken = 0;
    let mut outcome = Ok(());
    for _ in 0..steps {
        match model.force_step_behavior_tree() {
            Ok(status) => {
                taken += 1;
                println!("step {taken}: {status}");
            }
            Err(err) => {
                outcome = Err(err).context(format!("step {} failed", taken + 1));
                break;
            }
        }
    }

    if let Some(trace) = trace {
        let entries = recorder.entries.borrow();
        let document = Trace {
            file: file.display().to_string(),
            seed,
            steps: taken,
            changes: &entries,
        };
        let json = serde_json::to_string_pretty(&document)?;
        std::fs::write(trace, json)
            .with_context(|| format!("cannot write trace to {}", trace.display()))?;
        tracing::info!(trace = %trace.display(), changes = entries.len(), "wrote trace");
    }
    outcome
}

fn list_kinds(registry: &TaskRegistry) {
    for (tag, specs) in registry.palette() {
        println!("{tag}:");
        for spec in specs {
            let children = match spec.max_children {
                Some(max) if max == spec.min_children => format!("{max}"),
                Some(max) => format!("{}..{max}", spec.min_children),
                None => format!("{}..", spec.min_children),
            };
            let attributes: Vec<String> = spec
                .attributes
                .iter()
                .map(|a| {
                    let required = if a.required { "!" } else { "" };
                    format!("{}{required}: {}", a.name, a.ty.describe())
                })
                .collect();
            print!("  {:<16} children {children:<4}", spec.name);
            if !attributes.is_empty() {
                print!(" {}", attributes.join(", "));
            }
            if let Some(comment) = &spec.comment {
                print!("  # {comment}");
            }
            println!();
        }
    }
}

fn init_project(project_root: &Path) -> Result<()> {
    let bte_dir = project_root.join(".bte");
    std::fs::create_dir_all(&bte_dir)?;

    let config_path = bte_dir.join("config.yaml");
    if config_path.exists() {
        println!("{} already exists", config_path.display());
        return Ok(());
    }

    let default_config = r#"# Behavior tree editor configuration

# Undo entries kept per document; unbounded when absent
# max_history: 200

save:
  # refuse | backup | overwrite
  overwrite: backup

backup:
  enabled: false
  dir: .bte/backups
  max_backups: 20

step:
  # Seconds between auto steps; every update when 0
  interval_seconds: 0.0
  seed: 0
"#;
    std::fs::write(&config_path, default_config)?;

    println!("Initialized bte project at {}", project_root.display());
    println!();
    println!("Created:");
    println!("  .bte/config.yaml - editor configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stubs_default_to_success() {
        let spec = stub_spec("bark").unwrap();
        assert_eq!(spec.name, "bark");
        assert!(spec.open_attributes);
        assert_eq!(spec.tag, "stub");
    }

    #[test]
    fn stub_status_is_validated() {
        assert!(stub_spec("bark=running").is_ok());
        assert!(stub_spec("bark=maybe").is_err());
        assert!(stub_spec("=success").is_err());
    }

    #[test]
    fn stubbed_trees_step() {
        let mut registry = TaskRegistry::builtin();
        registry.register(stub_spec("isHungry=failure").unwrap());
        registry.register(stub_spec("bark").unwrap());

        let mut model = BehaviorTreeModel::new(registry);
        model
            .load_str("dog", "root\n  selector\n    isHungry level:3\n    bark\n")
            .unwrap();
        assert!(model.is_valid());
        assert_eq!(model.force_step_behavior_tree().unwrap(), TaskStatus::Success);
    }

    #[test]
    fn default_config_parses() {
        let dir = std::env::temp_dir().join(format!("bte-init-{}", std::process::id()));
        init_project(&dir).unwrap();
        let config = EditorConfig::load_from_project(&dir).unwrap();
        assert_eq!(config.backup.max_backups, 20);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
