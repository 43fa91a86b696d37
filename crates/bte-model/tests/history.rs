mod common;

use bte_model::{BehaviorTreeModel, EditorConfig};

fn model_with_history(max_history: usize) -> BehaviorTreeModel {
    let config = EditorConfig {
        max_history: Some(max_history),
        ..EditorConfig::default()
    };
    BehaviorTreeModel::with_config(common::registry(), config)
}

#[test]
fn undo_and_redo_an_add() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    let wait = model.add("wait", root).unwrap();

    assert!(model.undo().unwrap());
    assert_eq!(model.tree().child_count(root).unwrap(), 0);
    assert!(!model.tree().is_attached(wait));

    assert!(model.redo().unwrap());
    assert_eq!(model.tree().child(root, 0).unwrap(), wait);
}

#[test]
fn empty_history_is_a_no_op() {
    let mut model = common::model();
    model.create("selector").unwrap();
    assert!(!model.undo().unwrap());
    assert!(!model.redo().unwrap());
}

#[test]
fn a_new_edit_discards_the_redo_branch() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    model.add("wait", root).unwrap();
    model.add("success", root).unwrap();

    model.undo().unwrap();
    assert!(model.history().can_redo());

    model.add("failure", root).unwrap();
    assert!(!model.history().can_redo());
    assert!(!model.redo().unwrap());
    assert_eq!(model.history().len(), 2);

    let kinds: Vec<_> = model
        .tree()
        .task(root)
        .unwrap()
        .children()
        .iter()
        .map(|c| model.tree().task(*c).unwrap().kind().to_string())
        .collect();
    assert_eq!(kinds, ["wait", "failure"]);
}

#[test]
fn oldest_entries_are_evicted() {
    let mut model = model_with_history(2);
    let root = model.create("selector").unwrap();
    for _ in 0..3 {
        model.add("wait", root).unwrap();
    }
    assert_eq!(model.history().len(), 2);

    assert!(model.undo().unwrap());
    assert!(model.undo().unwrap());
    assert!(!model.undo().unwrap());
    assert_eq!(model.tree().child_count(root).unwrap(), 1);
}

#[test]
fn undone_adds_are_released_once_unreachable() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    model.add("wait", root).unwrap();
    model.undo().unwrap();
    // Still referenced by the redo entry.
    assert_eq!(model.tree().allocated(), 2);

    model.add("success", root).unwrap();
    assert_eq!(model.tree().allocated(), 2);
}

#[test]
fn removed_subtrees_live_as_long_as_their_entry() {
    let mut model = model_with_history(1);
    let root = model.create("selector").unwrap();
    let wait = model.add("wait", root).unwrap();
    model.set_guard(wait, "isHungry").unwrap();

    model.remove(wait).unwrap();
    assert_eq!(model.tree().allocated(), 3);

    model.add("success", root).unwrap();
    assert_eq!(model.tree().allocated(), 2);
    assert!(model.tree().get(wait).is_none());
}

#[test]
fn moves_undo_to_the_original_position() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    let a = model.add("wait", root).unwrap();
    let b = model.add("success", root).unwrap();
    let c = model.add("failure", root).unwrap();

    model.move_after(a, c).unwrap();
    assert_eq!(model.tree().task(root).unwrap().children(), &[b, c, a]);

    model.undo().unwrap();
    assert_eq!(model.tree().task(root).unwrap().children(), &[a, b, c]);

    model.redo().unwrap();
    assert_eq!(model.tree().task(root).unwrap().children(), &[b, c, a]);

    model.move_before(a, b).unwrap();
    assert_eq!(model.tree().task(root).unwrap().children(), &[a, b, c]);
}

#[test]
fn moving_to_the_same_place_records_nothing() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    let a = model.add("wait", root).unwrap();
    let b = model.add("success", root).unwrap();
    let before = model.history().len();

    model.move_before(a, b).unwrap();
    model.move_to(b, root, 1).unwrap();
    assert_eq!(model.history().len(), before);
}

#[test]
fn attribute_and_comment_edits_round_trip() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    let wait = model.add("wait", root).unwrap();

    model.set_attribute(wait, "ticks", 4i64).unwrap();
    model.set_comment(wait, Some("slow")).unwrap();
    model.unset_attribute(wait, "ticks").unwrap();
    assert_eq!(model.tree().attribute(wait, "ticks").unwrap(), None);

    model.undo().unwrap();
    assert_eq!(
        model.tree().attribute(wait, "ticks").unwrap().and_then(|v| v.as_int()),
        Some(4)
    );
    model.undo().unwrap();
    assert_eq!(model.tree().task(wait).unwrap().comment(), None);
    model.undo().unwrap();
    assert_eq!(
        model.tree().attribute(wait, "ticks").unwrap().and_then(|v| v.as_int()),
        Some(1)
    );
}

#[test]
fn setting_the_same_value_records_nothing() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    let wait = model.add("wait", root).unwrap();
    let before = model.history().len();

    model.set_attribute(wait, "ticks", 1i64).unwrap();
    model.set_comment(wait, None).unwrap();
    assert_eq!(model.history().len(), before);
}

#[test]
fn replacing_a_guard_undoes_to_the_old_one() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    let wait = model.add("wait", root).unwrap();
    let first = model.set_guard(wait, "isHungry").unwrap();
    let second = model.set_guard(wait, "success").unwrap();

    assert_eq!(model.tree().task(wait).unwrap().guard(), Some(second));
    assert!(!model.tree().is_attached(first));

    model.undo().unwrap();
    assert_eq!(model.tree().task(wait).unwrap().guard(), Some(first));
    assert!(!model.tree().is_attached(second));
}

#[test]
fn undo_and_redo_mark_the_document_dirty() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    assert!(!model.is_dirty());
    model.add("wait", root).unwrap();
    assert!(model.is_dirty());
    model.undo().unwrap();
    assert!(model.is_dirty());
}
