mod common;

use bte_model::format::{parse, write};
use bte_model::{AttrValue, BehaviorTreeModel, FormatError, TaskId, TreeSnapshot};
use proptest::prelude::*;

const KINDS: [&str; 8] = [
    "sequence", "selector", "parallel", "invert", "wait", "isHungry", "eat", "bark",
];

#[derive(Debug, Clone)]
enum Op {
    Add { kind: usize, parent: usize },
    Remove { task: usize },
    Move { task: usize, parent: usize, index: usize },
    Ticks { task: usize, ticks: i64 },
    Set { task: usize, name: &'static str, value: AttrValue },
    Comment { task: usize, on: bool },
    Guard { task: usize, kind: usize },
    ClearGuard { task: usize },
}

/// Attribute writes for the host leaves and `parallel`. Some strings hold a quote or a control
/// character, which the text format cannot carry.
fn attr_strategy() -> impl Strategy<Value = (&'static str, AttrValue)> {
    let food = prop_oneof![
        4 => "[ -~]{0,10}",
        1 => "[a-z\"\t\n]{1,4}",
    ];
    let threshold = prop_oneof![-1.0e6..1.0e6f64, prop::num::f64::NORMAL];
    prop_oneof![
        food.prop_map(|s| ("food", AttrValue::String(s))),
        threshold.prop_map(|f| ("threshold", AttrValue::Float(f))),
        any::<bool>().prop_map(|b| ("loud", AttrValue::Bool(b))),
        prop::sample::select(vec!["sequence", "selector"])
            .prop_map(|p| ("policy", AttrValue::from(p))),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..KINDS.len(), 0..16usize).prop_map(|(kind, parent)| Op::Add { kind, parent }),
        1 => (0..16usize).prop_map(|task| Op::Remove { task }),
        2 => (0..16usize, 0..16usize, 0..4usize)
            .prop_map(|(task, parent, index)| Op::Move { task, parent, index }),
        1 => (0..16usize, 0..10i64).prop_map(|(task, ticks)| Op::Ticks { task, ticks }),
        3 => (0..16usize, attr_strategy())
            .prop_map(|(task, (name, value))| Op::Set { task, name, value }),
        1 => (0..16usize, any::<bool>()).prop_map(|(task, on)| Op::Comment { task, on }),
        1 => (0..16usize, 0..KINDS.len()).prop_map(|(task, kind)| Op::Guard { task, kind }),
        1 => (0..16usize).prop_map(|task| Op::ClearGuard { task }),
    ]
}

fn pick(model: &BehaviorTreeModel, index: usize) -> Option<TaskId> {
    let attached = model.tree().attached();
    if attached.is_empty() {
        None
    } else {
        Some(attached[index % attached.len()])
    }
}

/// Apply `op`, ignoring rejected edits.
fn apply(model: &mut BehaviorTreeModel, op: &Op) {
    let _ = match op {
        Op::Add { kind, parent } => match pick(model, *parent) {
            Some(parent) => model.add(KINDS[*kind], parent).map(drop),
            None => return,
        },
        Op::Remove { task } => match pick(model, *task) {
            Some(task) => model.remove(task),
            None => return,
        },
        Op::Move {
            task,
            parent,
            index,
        } => match (pick(model, *task), pick(model, *parent)) {
            (Some(task), Some(parent)) => model.move_to(task, parent, *index),
            _ => return,
        },
        Op::Ticks { task, ticks } => match pick(model, *task) {
            Some(task) => model.set_attribute(task, "ticks", *ticks),
            None => return,
        },
        Op::Set { task, name, value } => match pick(model, *task) {
            Some(task) => model.set_attribute(task, name, value.clone()),
            None => return,
        },
        Op::Comment { task, on } => match pick(model, *task) {
            Some(task) => model.set_comment(task, on.then_some("note")),
            None => return,
        },
        Op::Guard { task, kind } => match pick(model, *task) {
            Some(task) => model.set_guard(task, KINDS[*kind]).map(drop),
            None => return,
        },
        Op::ClearGuard { task } => match pick(model, *task) {
            Some(task) => model.clear_guard(task),
            None => return,
        },
    };
}

/// Whether every attached string attribute fits between plain quotes.
fn writable(model: &BehaviorTreeModel) -> bool {
    let tree = model.tree();
    tree.attached()
        .into_iter()
        .filter_map(|id| tree.get(id))
        .flat_map(|task| task.attributes().values())
        .all(|value| match value {
            AttrValue::String(s) => !s.chars().any(|c| c == '"' || c.is_control()),
            _ => true,
        })
}

type State = (Option<TreeSnapshot>, Vec<TaskId>);

fn state(model: &BehaviorTreeModel) -> State {
    (model.snapshot(), model.tree().attached())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn undo_and_redo_walk_through_every_state(ops in prop::collection::vec(op_strategy(), 1..24)) {
        let mut model = common::model();
        model.create("selector").unwrap();
        let mut states = vec![state(&model)];

        for op in &ops {
            let before = model.history().cursor();
            apply(&mut model, op);
            if model.history().cursor() != before {
                states.push(state(&model));
            }
        }
        prop_assert_eq!(model.history().len(), states.len() - 1);

        for expected in states.iter().rev().skip(1) {
            prop_assert!(model.undo().unwrap());
            prop_assert_eq!(&state(&model), expected);
        }
        prop_assert!(!model.undo().unwrap());

        for expected in states.iter().skip(1) {
            prop_assert!(model.redo().unwrap());
            prop_assert_eq!(&state(&model), expected);
        }
        prop_assert!(!model.redo().unwrap());
    }

    #[test]
    fn written_text_parses_to_the_same_tree(ops in prop::collection::vec(op_strategy(), 1..24)) {
        let mut model = common::model();
        model.create("selector").unwrap();
        for op in &ops {
            apply(&mut model, op);
        }
        prop_assume!(model.tree().root_task().is_some());

        let text = match write(model.tree()) {
            Ok(text) => text,
            Err(err) => {
                prop_assert!(!writable(&model), "unexpected {}", err);
                prop_assert!(matches!(err, FormatError::Unrepresentable { .. }), "{}", err);
                return Ok(());
            }
        };
        prop_assert!(writable(&model));
        let reparsed = parse(&text, model.registry()).unwrap();
        prop_assert_eq!(reparsed.snapshot(), model.snapshot());
        prop_assert_eq!(reparsed.is_valid(), model.tree().is_valid());
    }
}
