use bte_runtime::{BehaviorTree, Condition, NodeId, Observed, Sequence, Task};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_step(c: &mut Criterion) {
    let conditions = (0..32)
        .map(|i| {
            Box::new(Observed::new(
                NodeId(i + 1),
                Box::new(Condition::new(|_bb: &bte_runtime::Blackboard| true)),
            )) as Box<dyn Task>
        })
        .collect::<Vec<_>>();

    let root = Observed::new(NodeId(0), Box::new(Sequence::new(conditions)));
    let mut tree = BehaviorTree::new(Box::new(root));

    c.bench_function("bte-runtime/step(conditions=32)", |b| {
        b.iter(|| {
            let report = tree.step();
            black_box(report.map(|r| r.status).ok());
        })
    });
}

criterion_group!(benches, bench_step);
criterion_main!(benches);
