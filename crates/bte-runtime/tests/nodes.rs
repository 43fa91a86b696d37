use std::cell::RefCell;
use std::rc::Rc;

use bte_runtime::{
    BehaviorTree, Fail, Invert, Leaf, NodeId, Observed, Parallel, ParallelPolicy, RandomSequence,
    Repeat, Selector, Sequence, Succeed, Task, TaskStatus, UntilSuccess, Wait,
};

fn node(id: usize, task: impl Task) -> Box<dyn Task> {
    Box::new(Observed::new(NodeId(id), Box::new(task)))
}

fn counting(counter: &Rc<RefCell<u32>>, status: TaskStatus) -> impl Task {
    let counter = Rc::clone(counter);
    Leaf::new(move |_ctx: &mut bte_runtime::StepContext<'_>| {
        *counter.borrow_mut() += 1;
        Ok(status)
    })
}

#[test]
fn sequence_resumes_running_child_without_reticking_earlier_ones() {
    let first = Rc::new(RefCell::new(0));
    let root = node(
        0,
        Sequence::new(vec![
            node(1, counting(&first, TaskStatus::Success)),
            node(2, Wait::new(1)),
            node(3, Succeed),
        ]),
    );
    let mut tree = BehaviorTree::new(root);

    assert_eq!(tree.step().unwrap().status, TaskStatus::Running);
    assert_eq!(tree.status_of(NodeId(2)), TaskStatus::Running);
    assert_eq!(tree.step().unwrap().status, TaskStatus::Success);
    assert_eq!(*first.borrow(), 1);
    assert_eq!(tree.status_of(NodeId(3)), TaskStatus::Success);
}

#[test]
fn sequence_stops_at_first_failure() {
    let tail = Rc::new(RefCell::new(0));
    let root = node(
        0,
        Sequence::new(vec![
            node(1, Fail),
            node(2, counting(&tail, TaskStatus::Success)),
        ]),
    );
    let mut tree = BehaviorTree::new(root);

    assert_eq!(tree.step().unwrap().status, TaskStatus::Failure);
    assert_eq!(*tail.borrow(), 0);
    assert_eq!(tree.status_of(NodeId(2)), TaskStatus::Fresh);
}

#[test]
fn selector_stops_at_first_success() {
    let tail = Rc::new(RefCell::new(0));
    let root = node(
        0,
        Selector::new(vec![
            node(1, Fail),
            node(2, Succeed),
            node(3, counting(&tail, TaskStatus::Success)),
        ]),
    );
    let mut tree = BehaviorTree::new(root);

    assert_eq!(tree.step().unwrap().status, TaskStatus::Success);
    assert_eq!(tree.status_of(NodeId(1)), TaskStatus::Failure);
    assert_eq!(*tail.borrow(), 0);
}

#[test]
fn selector_with_only_failing_children_fails() {
    let root = node(0, Selector::new(vec![node(1, Fail), node(2, Fail)]));
    let mut tree = BehaviorTree::new(root);
    assert_eq!(tree.step().unwrap().status, TaskStatus::Failure);
}

#[test]
fn parallel_sequence_policy_fails_fast_and_cancels_running_siblings() {
    let root = node(
        0,
        Parallel::new(
            ParallelPolicy::Sequence,
            vec![node(1, Wait::new(5)), node(2, Fail)],
        ),
    );
    let mut tree = BehaviorTree::new(root);

    let report = tree.step().unwrap();
    assert_eq!(report.status, TaskStatus::Failure);
    assert_eq!(tree.status_of(NodeId(1)), TaskStatus::Cancelled);
    assert_eq!(tree.status_of(NodeId(2)), TaskStatus::Failure);
}

#[test]
fn parallel_selector_policy_succeeds_on_first_success() {
    let root = node(
        0,
        Parallel::new(
            ParallelPolicy::Selector,
            vec![node(1, Wait::new(1)), node(2, Fail)],
        ),
    );
    let mut tree = BehaviorTree::new(root);

    assert_eq!(tree.step().unwrap().status, TaskStatus::Running);
    assert_eq!(tree.step().unwrap().status, TaskStatus::Success);
}

#[test]
fn parallel_sequence_policy_waits_for_every_child() {
    let root = node(
        0,
        Parallel::new(
            ParallelPolicy::Sequence,
            vec![node(1, Succeed), node(2, Wait::new(2))],
        ),
    );
    let mut tree = BehaviorTree::new(root);

    assert_eq!(tree.step().unwrap().status, TaskStatus::Running);
    assert_eq!(tree.step().unwrap().status, TaskStatus::Running);
    assert_eq!(tree.step().unwrap().status, TaskStatus::Success);
}

#[test]
fn repeat_finishes_one_child_run_per_step() {
    let runs = Rc::new(RefCell::new(0));
    let root = node(
        0,
        Repeat::new(node(1, counting(&runs, TaskStatus::Success)), Some(3)),
    );
    let mut tree = BehaviorTree::new(root);

    assert_eq!(tree.step().unwrap().status, TaskStatus::Running);
    assert_eq!(tree.step().unwrap().status, TaskStatus::Running);
    assert_eq!(tree.step().unwrap().status, TaskStatus::Success);
    assert_eq!(*runs.borrow(), 3);
}

#[test]
fn repeat_zero_times_succeeds_without_ticking() {
    let runs = Rc::new(RefCell::new(0));
    let root = node(
        0,
        Repeat::new(node(1, counting(&runs, TaskStatus::Success)), Some(0)),
    );
    let mut tree = BehaviorTree::new(root);

    assert_eq!(tree.step().unwrap().status, TaskStatus::Success);
    assert_eq!(*runs.borrow(), 0);
}

#[test]
fn until_success_keeps_running_through_failures() {
    let attempts = Rc::new(RefCell::new(0u32));
    let seen = Rc::clone(&attempts);
    let flaky = Leaf::new(move |_ctx: &mut bte_runtime::StepContext<'_>| {
        *seen.borrow_mut() += 1;
        if *seen.borrow() < 3 {
            Ok(TaskStatus::Failure)
        } else {
            Ok(TaskStatus::Success)
        }
    });
    let mut tree = BehaviorTree::new(node(0, UntilSuccess::new(node(1, flaky))));

    assert_eq!(tree.step().unwrap().status, TaskStatus::Running);
    assert_eq!(tree.step().unwrap().status, TaskStatus::Running);
    assert_eq!(tree.step().unwrap().status, TaskStatus::Success);
    assert_eq!(*attempts.borrow(), 3);
}

#[test]
fn invert_swaps_outcomes_and_passes_running_through() {
    let mut failing = BehaviorTree::new(node(0, Invert::new(node(1, Fail))));
    assert_eq!(failing.step().unwrap().status, TaskStatus::Success);

    let mut waiting = BehaviorTree::new(node(0, Invert::new(node(1, Wait::new(1)))));
    assert_eq!(waiting.step().unwrap().status, TaskStatus::Running);
    assert_eq!(waiting.step().unwrap().status, TaskStatus::Failure);
}

fn shuffled_visits(seed: u64) -> Vec<usize> {
    let visits = Rc::new(RefCell::new(Vec::new()));
    let children = (0..6)
        .map(|i| {
            let visits = Rc::clone(&visits);
            node(
                i + 1,
                Leaf::new(move |_ctx: &mut bte_runtime::StepContext<'_>| {
                    visits.borrow_mut().push(i);
                    Ok(TaskStatus::Success)
                }),
            )
        })
        .collect();
    let mut tree =
        BehaviorTree::new(node(0, RandomSequence::new(NodeId(0), children))).with_seed(seed);
    assert_eq!(tree.step().unwrap().status, TaskStatus::Success);
    let out = visits.borrow().clone();
    out
}

#[test]
fn random_sequence_order_is_a_seeded_permutation() {
    let a = shuffled_visits(7);
    let b = shuffled_visits(7);
    assert_eq!(a, b);

    let mut sorted = a.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2, 3, 4, 5]);
}
