use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::tree::TaskTree;
use crate::{AttrValue, FormatError, TaskId, TaskModel};

const INDENT: &str = "  ";

/// Render the attached tree. Guards that have children or a comment become `subtree` sections
/// named `guardN`, innermost first; the others are written inline.
pub fn write(tree: &TaskTree) -> Result<String, FormatError> {
    let root = tree.root_task().ok_or(FormatError::MissingRoot)?;
    let mut writer = Writer {
        tree,
        names: BTreeMap::new(),
        order: Vec::new(),
        out: String::new(),
    };
    writer.collect(root);

    let imports: BTreeMap<&str, &str> = tree
        .attached()
        .into_iter()
        .filter_map(|id| tree.get(id))
        .filter_map(|task| {
            let spec = task.spec();
            spec.path.as_deref().map(|path| (spec.name.as_str(), path))
        })
        .collect();
    if !imports.is_empty() {
        writer.out.push_str("# Alias definitions\n");
        for (alias, path) in imports {
            let unrepresentable = |message| FormatError::Unrepresentable {
                task: format!("import `{alias}`"),
                message,
            };
            bare(alias).map_err(unrepresentable)?;
            let path = quoted(path).map_err(unrepresentable)?;
            let _ = writeln!(writer.out, "import {alias}:{path}");
        }
        writer.out.push('\n');
    }

    for index in 0..writer.order.len() {
        let id = writer.order[index];
        let name = writer.names.get(&id).cloned().unwrap_or_default();
        let _ = writeln!(writer.out, "subtree name:\"{name}\"");
        writer.task(id, 1)?;
        writer.out.push('\n');
    }

    writer.out.push_str("root\n");
    writer.task(root, 1)?;
    Ok(writer.out)
}

struct Writer<'a> {
    tree: &'a TaskTree,
    names: BTreeMap<TaskId, String>,
    /// Named guards in definition order.
    order: Vec<TaskId>,
    out: String,
}

impl Writer<'_> {
    fn collect(&mut self, id: TaskId) {
        let tree = self.tree;
        let Some(task) = tree.get(id) else {
            return;
        };
        if let Some(guard) = task.guard() {
            self.collect(guard);
            if !self.inline(guard) {
                let name = format!("guard{}", self.order.len());
                self.names.insert(guard, name);
                self.order.push(guard);
            }
        }
        for child in task.children() {
            self.collect(*child);
        }
    }

    fn inline(&self, id: TaskId) -> bool {
        self.tree
            .get(id)
            .map_or(true, |t| t.children().is_empty() && t.comment().is_none())
    }

    fn task(&mut self, id: TaskId, depth: usize) -> Result<(), FormatError> {
        let tree = self.tree;
        let Some(task) = tree.get(id) else {
            return Ok(());
        };
        let indent = INDENT.repeat(depth);

        if let Some(comment) = task.comment() {
            for line in comment.lines() {
                let _ = writeln!(self.out, "{indent}# {line}");
            }
        }

        let mut chain = Vec::new();
        let mut next = task.guard();
        while let Some(guard) = next {
            chain.push(guard);
            if self.names.contains_key(&guard) {
                break;
            }
            next = tree.get(guard).and_then(TaskModel::guard);
        }

        let mut line = indent;
        for guard in chain.into_iter().rev() {
            match self.names.get(&guard) {
                Some(name) => {
                    let _ = write!(line, "(${name}) ");
                }
                None => {
                    let head = self.head(guard)?;
                    let _ = write!(line, "({head}) ");
                }
            }
        }
        line.push_str(&self.head(id)?);
        self.out.push_str(&line);
        self.out.push('\n');

        for child in task.children() {
            self.task(*child, depth + 1)?;
        }
        Ok(())
    }

    /// Kind and attributes: schema order first, then undeclared ones by name.
    fn head(&self, id: TaskId) -> Result<String, FormatError> {
        let Some(task) = self.tree.get(id) else {
            return Ok(String::new());
        };
        let mut head = bare(task.kind())
            .map_err(|message| FormatError::Unrepresentable {
                task: self.describe(id),
                message: format!("kind {message}"),
            })?
            .to_string();
        let spec = task.spec();
        let declared = spec
            .attributes
            .iter()
            .filter_map(|a| task.attribute(&a.name).map(|v| (a.name.as_str(), v)));
        let undeclared = task
            .attributes()
            .iter()
            .filter(|(name, _)| spec.attribute(name).is_none())
            .map(|(name, value)| (name.as_str(), value));

        for (name, value) in declared.chain(undeclared) {
            let value = bare(name)
                .and_then(|_| render(value))
                .map_err(|message| FormatError::Unrepresentable {
                    task: self.describe(id),
                    message: format!("attribute `{name}`: {message}"),
                })?;
            let _ = write!(head, " {name}:{value}");
        }
        Ok(head)
    }

    fn describe(&self, id: TaskId) -> String {
        match self.tree.path_of(id) {
            Some(path) => format!("task at {path}"),
            None => format!("task {id}"),
        }
    }
}

/// Kind, alias and attribute names are written unquoted and must read back as one word.
fn bare(name: &str) -> Result<&str, String> {
    let word = !name.is_empty()
        && !name.starts_with('$')
        && !name.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '(' | ')' | ':' | '"' | '#')
        });
    if word {
        Ok(name)
    } else {
        Err(format!("{name:?} is not a bare word"))
    }
}

fn render(value: &AttrValue) -> Result<String, String> {
    match value {
        AttrValue::Bool(b) => Ok(b.to_string()),
        AttrValue::Int(i) => Ok(i.to_string()),
        AttrValue::Float(f) if f.is_finite() => Ok(format!("{f:?}")),
        AttrValue::Float(f) => Err(format!("{f} has no literal")),
        AttrValue::String(s) => quoted(s),
    }
}

fn quoted(s: &str) -> Result<String, String> {
    if s.chars().any(|c| c == '"' || c.is_control()) {
        return Err(format!("{s:?} contains a quote or control character"));
    }
    Ok(format!("\"{s}\""))
}
