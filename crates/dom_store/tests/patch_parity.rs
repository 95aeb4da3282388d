use dom_store::{DomSnapshot, DomStore, HostTree, SnapshotOptions, compare_host};
use vdom::{MountRegistry, Node, Patch, diff};
use vdom_test_support::{RoundTripCase, diff_lines, roundtrip_cases};

fn fresh_render(tree: &Node) -> HostTree {
    let mut store = DomStore::new();
    let container = store.create_container().expect("container");
    let mut registry: MountRegistry<DomStore> = MountRegistry::init();
    registry
        .render(tree, &container, &mut store)
        .expect("fresh render failed");
    store.materialize(container).expect("materialize failed")
}

fn patched_render(old: &Node, new: &Node) -> HostTree {
    let mut store = DomStore::new();
    let container = store.create_container().expect("container");
    let mut registry: MountRegistry<DomStore> = MountRegistry::init();
    registry
        .render(old, &container, &mut store)
        .expect("initial render failed");
    registry
        .render(new, &container, &mut store)
        .expect("incremental render failed");
    store.materialize(container).expect("materialize failed")
}

fn check_expectations(case: &RoundTripCase, old: &Node, new: &Node) {
    let plan = diff(old, new);
    if let Some(expected) = case.expect_patches {
        assert_eq!(plan.len(), expected, "case '{}' patch count\n{plan}", case.name);
    }
    if let Some(expected) = case.expect_reorder {
        let has_reorder = plan
            .iter()
            .any(|(_, patch)| matches!(patch, Patch::Reorder(_)));
        assert_eq!(has_reorder, expected, "case '{}' reorder\n{plan}", case.name);
    }
    if let Some(expected) = case.expect_warnings {
        assert_eq!(
            plan.warnings().len(),
            expected,
            "case '{}' warnings\n{plan}",
            case.name
        );
    }
}

#[test]
fn fixture_roundtrips_match_fresh_render() {
    for case in roundtrip_cases() {
        let old = case.old.to_node();
        let new = case.new.to_node();
        check_expectations(&case, &old, &new);

        let expected = fresh_render(&new);
        let actual = patched_render(&old, &new);
        if let Err(mismatch) = compare_host(&expected, &actual, SnapshotOptions::default()) {
            let expected_lines = DomSnapshot::new(&expected, SnapshotOptions::default());
            let actual_lines = DomSnapshot::new(&actual, SnapshotOptions::default());
            panic!(
                "case '{}' diverged from a fresh render\n{mismatch}\n{}\nplan:\n{}",
                case.name,
                diff_lines(expected_lines.as_lines(), actual_lines.as_lines()),
                diff(&old, &new)
            );
        }
    }
}

#[test]
fn fixture_roundtrips_backwards() {
    for case in roundtrip_cases() {
        let old = case.old.to_node();
        let new = case.new.to_node();
        let expected = fresh_render(&old);
        let actual = patched_render(&new, &old);
        if let Err(mismatch) = compare_host(&expected, &actual, SnapshotOptions::default()) {
            panic!("case '{}' (reversed) diverged\n{mismatch}", case.name);
        }
    }
}

#[test]
fn identical_trees_produce_empty_plans() {
    for case in roundtrip_cases() {
        for fixture in [&case.old, &case.new] {
            let tree = fixture.to_node();
            let plan = diff(&tree, &tree);
            assert!(plan.is_empty(), "case '{}' self-diff\n{plan}", case.name);

            // Separately built, structurally equal.
            let plan = diff(&tree, &fixture.to_node());
            assert_eq!(plan.len(), 0, "case '{}' rebuilt diff\n{plan}", case.name);
        }
    }
}

#[test]
fn chained_renders_stay_in_sync() {
    let cases = roundtrip_cases();
    let mut store = DomStore::new();
    let container = store.create_container().expect("container");
    let mut registry: MountRegistry<DomStore> = MountRegistry::init();

    for case in &cases {
        for tree in [case.old.to_node(), case.new.to_node()] {
            registry
                .render(&tree, &container, &mut store)
                .unwrap_or_else(|err| panic!("case '{}' render failed: {err}", case.name));
            let actual = store.materialize(container).expect("materialize failed");
            let expected = fresh_render(&tree);
            if let Err(mismatch) = compare_host(&expected, &actual, SnapshotOptions::default()) {
                panic!("case '{}' chained render diverged\n{mismatch}", case.name);
            }
        }
    }
}
