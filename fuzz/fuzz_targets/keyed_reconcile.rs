#![no_main]

use dom_store::{DomStore, SnapshotOptions, assert_host_eq};
use libfuzzer_sys::fuzz_target;
use vdom::{MountRegistry, Node};

// Each byte becomes one child: the low bits pick a key (or none), the high
// bits pick the text. Duplicate keys are allowed on purpose.
fn list(bytes: &[u8]) -> Node {
    Node::element("ul")
        .children(bytes.iter().map(|&byte| {
            let key = byte & 0x0f;
            let text = format!("t{}", byte >> 4);
            if key < 12 {
                Node::element("li").key(key.to_string()).child(text).build()
            } else {
                Node::text(text)
            }
        }))
        .build()
}

fn render(trees: &[&Node]) -> dom_store::HostTree {
    let mut store = DomStore::new();
    let container = store.create_container().expect("container");
    let mut registry: MountRegistry<DomStore> = MountRegistry::init();
    for tree in trees {
        registry
            .render(tree, &container, &mut store)
            .expect("render failed");
    }
    store.materialize(container).expect("materialize failed")
}

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = (split as usize).min(rest.len());
    let (old, new) = rest.split_at(split);
    let old = list(&old[..old.len().min(64)]);
    let new = list(&new[..new.len().min(64)]);

    let patched = render(&[&old, &new]);
    let fresh = render(&[&new]);
    assert_host_eq(&fresh, &patched, SnapshotOptions::default());
});
