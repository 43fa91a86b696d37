use std::collections::BTreeMap;
use std::rc::Rc;

use crate::registry::TaskRegistry;
use crate::tree::TaskTree;
use crate::{AttrValue, EditError, FormatError, TaskId, TaskSpec};

/// Parse a tree, resolving kinds against `registry`. The result may still have validation
/// problems (missing children, missing required attributes); it is structurally sound.
pub fn parse(text: &str, registry: &TaskRegistry) -> Result<TaskTree, FormatError> {
    let document = Document::read(text)?;
    let root = document.root.ok_or(FormatError::MissingRoot)?;

    let mut builder = Builder {
        registry,
        imports: document.imports,
        subtrees: document.subtrees,
        tree: TaskTree::new(),
        active: Vec::new(),
    };
    let id = builder.instantiate(&root)?;
    builder
        .tree
        .insert_child(TaskTree::ROOT, id, 0)
        .map_err(|e| syntax(root.head.line, e))?;
    Ok(builder.tree)
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Word(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Literal {
    fn into_value(self) -> AttrValue {
        match self {
            Literal::Str(s) | Literal::Word(s) => AttrValue::String(s),
            Literal::Bool(b) => AttrValue::Bool(b),
            Literal::Int(i) => AttrValue::Int(i),
            Literal::Float(f) => AttrValue::Float(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Word(String),
    Attr(String, Literal),
}

#[derive(Debug, Clone)]
enum TaskRef {
    Kind {
        name: String,
        attrs: Vec<(String, Literal)>,
    },
    Subtree(String),
}

#[derive(Debug, Clone)]
struct Head {
    line: usize,
    indent: usize,
    guards: Vec<TaskRef>,
    task: TaskRef,
    comment: Option<String>,
}

#[derive(Debug, Clone)]
struct Node {
    head: Head,
    children: Vec<Node>,
}

#[derive(Debug)]
enum Section {
    Preamble,
    Subtree { name: String, line: usize },
    Root { line: usize },
}

#[derive(Debug, Default)]
struct Document {
    imports: BTreeMap<String, String>,
    subtrees: BTreeMap<String, Rc<Node>>,
    root: Option<Node>,
}

/// Nodes of the section being read; the bottom entry is the section's root task.
#[derive(Default)]
struct Stack {
    open: Vec<Node>,
    done: Option<Node>,
}

impl Stack {
    fn pop(&mut self) {
        if let Some(node) = self.open.pop() {
            match self.open.last_mut() {
                Some(parent) => parent.children.push(node),
                None => self.done = Some(node),
            }
        }
    }

    fn finish(&mut self) -> Option<Node> {
        while !self.open.is_empty() {
            self.pop();
        }
        self.done.take()
    }

    fn push(&mut self, head: Head) -> Result<(), FormatError> {
        let mut dedented_to = None;
        while let Some(top) = self.open.last() {
            if top.head.indent < head.indent {
                break;
            }
            dedented_to = Some(top.head.indent);
            self.pop();
        }
        if dedented_to.is_some_and(|indent| indent != head.indent) {
            return Err(FormatError::BadIndent { line: head.line });
        }
        if self.open.is_empty() && self.done.is_some() {
            return Err(FormatError::Syntax {
                line: head.line,
                message: "a tree has exactly one root task".to_string(),
            });
        }
        self.open.push(Node {
            head,
            children: Vec::new(),
        });
        Ok(())
    }
}

impl Document {
    fn read(text: &str) -> Result<Self, FormatError> {
        let mut document = Document::default();
        let mut section = Section::Preamble;
        let mut stack = Stack::default();
        let mut pending: Vec<String> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let content = raw.trim_end();
            let body = content.trim_start_matches(' ');
            let indent = content.len() - body.len();

            if body.is_empty() {
                pending.clear();
                continue;
            }
            if body.starts_with('\t') {
                return Err(FormatError::BadIndent { line });
            }
            if let Some(comment) = body.strip_prefix('#') {
                let comment = comment.trim();
                if !comment.is_empty() {
                    pending.push(comment.to_string());
                }
                continue;
            }

            let tokens = tokenize(body, line)?;
            if indent == 0 {
                if let Some(Token::Word(word)) = tokens.first() {
                    let keyword = word.clone();
                    if matches!(keyword.as_str(), "import" | "subtree" | "root") {
                        pending.clear();
                        document.close(section, &mut stack)?;
                        section = document.header(&keyword, &tokens[1..], line)?;
                        continue;
                    }
                }
            }

            if matches!(section, Section::Preamble) {
                return Err(FormatError::Syntax {
                    line,
                    message: "task outside of a `root` or `subtree` section".to_string(),
                });
            }
            let comment = if pending.is_empty() {
                None
            } else {
                Some(pending.join("\n"))
            };
            pending.clear();
            stack.push(task_line(&tokens, line, indent, comment)?)?;
        }

        document.close(section, &mut stack)?;
        Ok(document)
    }

    fn header(&mut self, keyword: &str, args: &[Token], line: usize) -> Result<Section, FormatError> {
        match keyword {
            "import" => {
                if args.is_empty() {
                    return Err(syntax_msg(line, "`import` needs alias:\"path\" pairs"));
                }
                for token in args {
                    match token {
                        Token::Attr(alias, Literal::Str(path)) => {
                            self.imports.insert(alias.clone(), path.clone());
                        }
                        _ => return Err(syntax_msg(line, "`import` needs alias:\"path\" pairs")),
                    }
                }
                Ok(Section::Preamble)
            }
            "subtree" => match args {
                [Token::Attr(key, Literal::Str(name))] if key == "name" => {
                    if self.subtrees.contains_key(name) {
                        return Err(FormatError::DuplicateSubtree {
                            line,
                            name: name.clone(),
                        });
                    }
                    Ok(Section::Subtree {
                        name: name.clone(),
                        line,
                    })
                }
                _ => Err(syntax_msg(line, "expected `subtree name:\"...\"`")),
            },
            _ => {
                if !args.is_empty() {
                    return Err(syntax_msg(line, "`root` takes no arguments"));
                }
                if self.root.is_some() {
                    return Err(FormatError::DuplicateRoot { line });
                }
                Ok(Section::Root { line })
            }
        }
    }

    fn close(&mut self, section: Section, stack: &mut Stack) -> Result<(), FormatError> {
        let node = stack.finish();
        match section {
            Section::Preamble => Ok(()),
            Section::Subtree { name, line } => {
                let node = node.ok_or_else(|| {
                    syntax_msg(line, format!("subtree `{name}` has no task"))
                })?;
                self.subtrees.insert(name, Rc::new(node));
                Ok(())
            }
            Section::Root { line } => match node {
                Some(node) => {
                    if self.root.is_some() {
                        return Err(FormatError::DuplicateRoot { line });
                    }
                    self.root = Some(node);
                    Ok(())
                }
                None => Err(FormatError::MissingRoot),
            },
        }
    }
}

fn syntax(line: usize, err: EditError) -> FormatError {
    FormatError::Syntax {
        line,
        message: err.to_string(),
    }
}

fn syntax_msg(line: usize, message: impl Into<String>) -> FormatError {
    FormatError::Syntax {
        line,
        message: message.into(),
    }
}

fn tokenize(text: &str, line: usize) -> Result<Vec<Token>, FormatError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '#' => break,
            _ => {
                let start = i;
                while i < chars.len() && !is_delimiter(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if word.is_empty() {
                    return Err(syntax_msg(line, format!("unexpected `{c}`")));
                }
                if chars.get(i) != Some(&':') {
                    tokens.push(Token::Word(word));
                    continue;
                }
                i += 1;
                let literal = if chars.get(i) == Some(&'"') {
                    let start = i + 1;
                    let end = chars[start..]
                        .iter()
                        .position(|c| *c == '"')
                        .map(|offset| start + offset)
                        .ok_or_else(|| FormatError::BadValue {
                            line,
                            name: word.clone(),
                            message: "unterminated string".to_string(),
                        })?;
                    i = end + 1;
                    Literal::Str(chars[start..end].iter().collect())
                } else {
                    let start = i;
                    while i < chars.len() && !chars[i].is_whitespace() && !matches!(chars[i], '(' | ')') {
                        i += 1;
                    }
                    let raw: String = chars[start..i].iter().collect();
                    literal(&word, &raw, line)?
                };
                tokens.push(Token::Attr(word, literal));
            }
        }
    }
    Ok(tokens)
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | ':')
}

fn literal(name: &str, raw: &str, line: usize) -> Result<Literal, FormatError> {
    let bad = |message: String| FormatError::BadValue {
        line,
        name: name.to_string(),
        message,
    };
    match raw {
        "" => Err(bad("missing value".to_string())),
        "true" => Ok(Literal::Bool(true)),
        "false" => Ok(Literal::Bool(false)),
        _ if raw.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.')) => {
            if let Ok(i) = raw.parse::<i64>() {
                return Ok(Literal::Int(i));
            }
            match raw.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Literal::Float(f)),
                _ => Err(bad(format!("`{raw}` is not a number"))),
            }
        }
        _ => Ok(Literal::Word(raw.to_string())),
    }
}

fn task_line(
    tokens: &[Token],
    line: usize,
    indent: usize,
    comment: Option<String>,
) -> Result<Head, FormatError> {
    let mut rest = tokens;
    let mut guards = Vec::new();
    while let Some((Token::Open, after)) = rest.split_first() {
        let close = after
            .iter()
            .position(|t| *t == Token::Close)
            .ok_or_else(|| syntax_msg(line, "unclosed guard"))?;
        guards.push(task_ref(&after[..close], line)?);
        rest = &after[close + 1..];
    }
    Ok(Head {
        line,
        indent,
        guards,
        task: task_ref(rest, line)?,
        comment,
    })
}

fn task_ref(tokens: &[Token], line: usize) -> Result<TaskRef, FormatError> {
    let Some((Token::Word(name), rest)) = tokens.split_first() else {
        return Err(syntax_msg(line, "expected a task name"));
    };
    if let Some(subtree) = name.strip_prefix('$') {
        if !rest.is_empty() {
            return Err(syntax_msg(line, "a subtree reference takes no attributes"));
        }
        return Ok(TaskRef::Subtree(subtree.to_string()));
    }

    let mut attrs: Vec<(String, Literal)> = Vec::new();
    for token in rest {
        match token {
            Token::Attr(key, value) => {
                if attrs.iter().any(|(k, _)| k == key) {
                    return Err(syntax_msg(line, format!("attribute `{key}` given twice")));
                }
                attrs.push((key.clone(), value.clone()));
            }
            Token::Open | Token::Close => {
                return Err(syntax_msg(line, "guards must come before the task name"));
            }
            Token::Word(word) => {
                return Err(syntax_msg(line, format!("unexpected `{word}`")));
            }
        }
    }
    Ok(TaskRef::Kind {
        name: name.clone(),
        attrs,
    })
}

struct Builder<'a> {
    registry: &'a TaskRegistry,
    imports: BTreeMap<String, String>,
    subtrees: BTreeMap<String, Rc<Node>>,
    tree: TaskTree,
    /// Subtrees being expanded, to catch self references.
    active: Vec<String>,
}

impl Builder<'_> {
    fn instantiate(&mut self, node: &Node) -> Result<TaskId, FormatError> {
        let head = &node.head;
        let id = self.task_ref(&head.task, head.line)?;
        if let Some(comment) = &head.comment {
            self.tree
                .put_comment(id, Some(comment.clone()))
                .map_err(|e| syntax(head.line, e))?;
        }

        for child in &node.children {
            let child_id = self.instantiate(child)?;
            let index = self.tree.child_count(id).map_err(|e| syntax(child.head.line, e))?;
            self.tree
                .insert_child(id, child_id, index)
                .map_err(|e| syntax(child.head.line, e))?;
        }

        let mut previous: Option<TaskId> = None;
        for guard in &head.guards {
            let guard_id = self.task_ref(guard, head.line)?;
            if let Some(previous) = previous {
                self.tree
                    .attach_guard(guard_id, previous)
                    .map_err(|_| syntax_msg(head.line, "a guarded subtree already has a guard"))?;
            }
            previous = Some(guard_id);
        }
        if let Some(guard) = previous {
            self.tree
                .attach_guard(id, guard)
                .map_err(|_| syntax_msg(head.line, "a guarded subtree already has a guard"))?;
        }
        Ok(id)
    }

    fn task_ref(&mut self, task: &TaskRef, line: usize) -> Result<TaskId, FormatError> {
        match task {
            TaskRef::Kind { name, attrs } => {
                let spec = self.resolve(name, line)?;
                let kind = spec.name.clone();
                let id = self.tree.create(spec);
                for (attr, literal) in attrs {
                    let value = self
                        .tree
                        .check_attribute(id, attr, literal.clone().into_value())
                        .map_err(|e| match e {
                            EditError::UnknownAttribute { .. } => FormatError::UnknownAttribute {
                                line,
                                kind: kind.clone(),
                                name: attr.clone(),
                            },
                            other => FormatError::BadValue {
                                line,
                                name: attr.clone(),
                                message: other.to_string(),
                            },
                        })?;
                    self.tree
                        .put_attribute(id, attr, Some(value))
                        .map_err(|e| syntax(line, e))?;
                }
                Ok(id)
            }
            TaskRef::Subtree(name) => {
                if self.active.iter().any(|n| n == name) {
                    return Err(syntax_msg(line, format!("subtree `{name}` refers to itself")));
                }
                let node = self
                    .subtrees
                    .get(name)
                    .cloned()
                    .ok_or_else(|| FormatError::UnknownSubtree {
                        line,
                        name: name.clone(),
                    })?;
                self.active.push(name.clone());
                let id = self.instantiate(&node);
                self.active.pop();
                id
            }
        }
    }

    fn resolve(&self, name: &str, line: usize) -> Result<Rc<TaskSpec>, FormatError> {
        let found = match self.imports.get(name) {
            Some(path) => self
                .registry
                .by_path(path)
                .or_else(|| self.registry.get(path)),
            None => self
                .registry
                .get(name)
                .or_else(|| self.registry.by_path(name)),
        };
        found.cloned().ok_or_else(|| FormatError::UnknownKind {
            line,
            kind: self.imports.get(name).cloned().unwrap_or_else(|| name.to_string()),
        })
    }
}
