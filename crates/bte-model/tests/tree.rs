mod common;

use bte_model::{EditError, ModelError, ParentLink, PathStep, Problem, TaskPath, TaskTree};

#[test]
fn children_keep_insertion_order_and_parent_links() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    let a = model.add("wait", root).unwrap();
    let c = model.add("success", root).unwrap();
    let b = model.add_before("failure", c).unwrap();

    let tree = model.tree();
    assert_eq!(tree.child_count(root).unwrap(), 3);
    assert_eq!(tree.task(root).unwrap().children(), &[a, b, c]);
    assert_eq!(tree.parent(b), Some(ParentLink::Child(root)));
    assert_eq!(tree.parent(root), Some(ParentLink::Child(TaskTree::ROOT)));
    assert!(tree.has(root, b));
    assert!(tree.contains(TaskTree::ROOT, b));
    assert_eq!(
        tree.child(root, 3),
        Err(EditError::IndexOutOfRange { index: 3, len: 3 })
    );
}

#[test]
fn removing_a_task_detaches_its_whole_subtree() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    let branch = model.add("sequence", root).unwrap();
    let leaf = model.add("wait", branch).unwrap();
    let guard = model.set_guard(leaf, "isHungry").unwrap();

    model.remove(branch).unwrap();

    let attached = model.tree().attached();
    assert_eq!(attached, vec![root]);
    for gone in [branch, leaf, guard] {
        assert!(!model.tree().is_attached(gone));
    }
    assert!(matches!(
        model.set_attribute(leaf, "ticks", 3i64),
        Err(ModelError::Edit(EditError::NotAttached(_)))
    ));
}

#[test]
fn adding_under_a_descendant_is_a_cycle() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    let branch = model.add("sequence", root).unwrap();
    let inner = model.add("sequence", branch).unwrap();

    let err = model.move_to(branch, inner, 0).unwrap_err();
    assert!(matches!(
        err,
        ModelError::Edit(EditError::Cycle { parent, task }) if parent == inner && task == branch
    ));
    assert!(!model.can_move(branch, inner));
    assert!(model.can_move(inner, root));
}

#[test]
fn decorators_take_a_single_child() {
    let mut model = common::model();
    let root = model.create("invert").unwrap();
    model.add("wait", root).unwrap();

    assert!(!model.can_add(root));
    assert!(matches!(
        model.add("success", root),
        Err(ModelError::Edit(EditError::NoChildSlots { max: 1, .. }))
    ));
    assert!(matches!(
        model.add("success", model.tree().child(root, 0).unwrap()),
        Err(ModelError::Edit(EditError::NoChildSlots { max: 0, .. }))
    ));
    // The failed add left nothing allocated behind.
    assert_eq!(model.tree().allocated(), 2);
}

#[test]
fn add_at_rejects_index_past_the_end() {
    let mut model = common::model();
    let root = model.create("sequence").unwrap();
    assert!(matches!(
        model.add_at("wait", root, 1),
        Err(ModelError::Edit(EditError::IndexOutOfRange { index: 1, len: 0 }))
    ));
}

#[test]
fn validation_reports_child_counts_and_required_attributes() {
    let mut model = common::model();
    let root = model.create("sequence").unwrap();
    assert!(!model.is_valid());
    assert_eq!(
        model.problems(),
        vec![Problem::TooFewChildren {
            task: root,
            kind: "sequence".to_string(),
            min: 1,
            found: 0,
        }]
    );

    let eat = model.add("eat", root).unwrap();
    assert_eq!(
        model.problems(),
        vec![Problem::MissingAttribute {
            task: eat,
            kind: "eat".to_string(),
            name: "food".to_string(),
        }]
    );

    model.set_attribute(eat, "food", "bone").unwrap();
    assert!(model.is_valid());

    model.remove(root).unwrap();
    assert_eq!(model.problems(), vec![Problem::EmptyRoot]);
    assert!(model.is_initialized());
    assert!(!model.is_valid());
}

#[test]
fn attributes_are_type_checked_and_coerced() {
    let mut model = common::model();
    let root = model.create("sequence").unwrap();
    let hungry = model.add("isHungry", root).unwrap();
    let par = model.add("parallel", root).unwrap();

    model.set_attribute(hungry, "threshold", 1i64).unwrap();
    assert_eq!(
        model.tree().attribute(hungry, "threshold").unwrap().and_then(|v| v.as_float()),
        Some(1.0)
    );

    assert!(matches!(
        model.set_attribute(hungry, "threshold", "high"),
        Err(ModelError::Edit(EditError::TypeMismatch { .. }))
    ));
    assert!(matches!(
        model.set_attribute(hungry, "speed", 2i64),
        Err(ModelError::Edit(EditError::UnknownAttribute { .. }))
    ));
    assert!(matches!(
        model.set_attribute(par, "policy", "random"),
        Err(ModelError::Edit(EditError::TypeMismatch { .. }))
    ));
    model.set_attribute(par, "policy", "selector").unwrap();
}

#[test]
fn paths_address_children_and_guards() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    model.add("success", root).unwrap();
    let wait = model.add("wait", root).unwrap();
    let guard = model.set_guard(wait, "isHungry").unwrap();

    let path = model.tree().path_of(guard).unwrap();
    assert_eq!(
        path,
        TaskPath(vec![PathStep::Child(0), PathStep::Child(1), PathStep::Guard])
    );
    assert_eq!(path.to_string(), "0/1/g");
    assert_eq!(model.tree().find_by_path(&path), Some(guard));
    assert_eq!(model.tree().parent(guard), Some(ParentLink::Guard(wait)));
}

#[test]
fn removing_a_guard_clears_it() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    let wait = model.add("wait", root).unwrap();
    let guard = model.set_guard(wait, "isHungry").unwrap();

    model.remove(guard).unwrap();
    assert_eq!(model.tree().task(wait).unwrap().guard(), None);
    assert!(matches!(
        model.clear_guard(wait),
        Err(ModelError::Edit(EditError::NoGuard(_)))
    ));

    model.undo().unwrap();
    assert_eq!(model.tree().task(wait).unwrap().guard(), Some(guard));
}

#[test]
fn comments_are_normalized() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();

    model
        .set_comment(root, Some("  first line \n\n   second  "))
        .unwrap();
    assert_eq!(
        model.tree().task(root).unwrap().comment(),
        Some("first line\nsecond")
    );

    model.set_comment(root, Some("   ")).unwrap();
    assert_eq!(model.tree().task(root).unwrap().comment(), None);
}

#[test]
fn root_slot_cannot_be_edited() {
    let mut model = common::model();
    model.create("selector").unwrap();

    assert!(matches!(
        model.remove(TaskTree::ROOT),
        Err(ModelError::Edit(EditError::RootSlot))
    ));
    assert!(matches!(
        model.set_guard(TaskTree::ROOT, "success"),
        Err(ModelError::Edit(EditError::RootSlot))
    ));
}

#[test]
fn edits_need_an_initialized_model() {
    let mut model = common::model();
    assert!(matches!(
        model.add("wait", TaskTree::ROOT),
        Err(ModelError::Edit(EditError::NotInitialized))
    ));
    assert!(!model.is_valid());
    assert!(!model.is_initialized());
}

#[test]
fn snapshots_serialize_without_empty_fields() {
    let mut model = common::model();
    let root = model.create("selector").unwrap();
    let wait = model.add("wait", root).unwrap();
    model.set_guard(wait, "success").unwrap();

    let json = serde_json::to_value(model.snapshot().unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "kind": "selector",
            "children": [{
                "kind": "wait",
                "attributes": { "ticks": 1 },
                "guard": { "kind": "success" }
            }]
        })
    );
}
