use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use dom_store::DomStore;
use vdom::{HostOps, Node, diff, to_host};

const SMALL_LIST: usize = 64;
const LARGE_LIST: usize = 10_000;

fn make_list(keys: impl Iterator<Item = usize>) -> Node {
    Node::element("ul")
        .children(keys.map(|key| {
            Node::element("li")
                .key(key.to_string())
                .attr("class", if key % 2 == 0 { "even" } else { "odd" })
                .child(format!("row {key}"))
        }))
        .build()
}

/// Reverse every block of eight keys; a worst-ish case for the greedy mover.
fn shuffled(len: usize) -> Node {
    make_list((0..len).map(|i| (i / 8) * 8 + (7 - i % 8)).filter(move |&k| k < len))
}

fn bench_diff_identical(c: &mut Criterion) {
    let old = make_list(0..LARGE_LIST);
    let new = make_list(0..LARGE_LIST);
    c.bench_function("bench_diff_identical_large", |b| {
        b.iter(|| black_box(diff(black_box(&old), black_box(&new)).len()));
    });
}

fn bench_diff_reorder(c: &mut Criterion) {
    let small_old = make_list(0..SMALL_LIST);
    let small_new = shuffled(SMALL_LIST);
    c.bench_function("bench_diff_reorder_small", |b| {
        b.iter(|| black_box(diff(black_box(&small_old), black_box(&small_new)).len()));
    });

    let old = make_list(0..LARGE_LIST);
    let new = shuffled(LARGE_LIST);
    c.bench_function("bench_diff_reorder_large", |b| {
        b.iter(|| black_box(diff(black_box(&old), black_box(&new)).len()));
    });
}

fn bench_diff_text_updates(c: &mut Criterion) {
    let old = make_list(0..LARGE_LIST);
    let new = Node::element("ul")
        .children((0..LARGE_LIST).map(|key| {
            Node::element("li")
                .key(key.to_string())
                .attr("class", if key % 2 == 0 { "even" } else { "odd" })
                .child(format!("row {key} updated"))
        }))
        .build();
    c.bench_function("bench_diff_text_updates_large", |b| {
        b.iter(|| black_box(diff(black_box(&old), black_box(&new)).len()));
    });
}

fn bench_apply_reorder(c: &mut Criterion) {
    let old = make_list(0..LARGE_LIST);
    let new = shuffled(LARGE_LIST);
    let plan = diff(&old, &new);
    c.bench_function("bench_apply_reorder_large", |b| {
        b.iter_batched(
            || {
                let mut store = DomStore::new();
                let container = store.create_container().expect("container");
                let roots = to_host(&old, &mut store).expect("build failed");
                store
                    .append_child(&container, &roots[0])
                    .expect("mount failed");
                (store, roots[0])
            },
            |(mut store, root)| {
                let root = plan.apply_to(root, &mut store).expect("apply failed");
                black_box(root);
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_diff_identical,
    bench_diff_reorder,
    bench_diff_text_updates,
    bench_apply_reorder
);
criterion_main!(benches);
