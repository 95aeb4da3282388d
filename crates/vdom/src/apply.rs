//! Patch application.
//!
//! All patched indices are resolved to live host nodes *before* the first
//! mutation, by a pre-order walk over the source tree that only descends into
//! subtrees whose index range `[i, i + span]` contains a pending index. Each
//! range test is a binary search over the sorted pending indices.

use crate::attrs::{AttrDelta, AttrDiff, AttrMap, merge_nested};
use crate::config::ApplyConfig;
use crate::error::PatchError;
use crate::host::{HostKind, HostOps, to_host};
use crate::node::Node;
use crate::patch::{Moves, Patch, PatchPlan};
use std::collections::{BTreeMap, HashMap};

impl PatchPlan {
    /// Apply the plan to the host tree rendered from [`PatchPlan::source`].
    ///
    /// Returns the (possibly replaced) root. An empty plan returns `root`
    /// untouched.
    pub fn apply_to<H: HostOps>(
        &self,
        root: H::Node,
        host: &mut H,
    ) -> Result<H::Node, PatchError<H::Error>> {
        self.apply_to_with_config(root, host, &ApplyConfig::default())
    }

    pub fn apply_to_with_config<H: HostOps>(
        &self,
        root: H::Node,
        host: &mut H,
        config: &ApplyConfig,
    ) -> Result<H::Node, PatchError<H::Error>> {
        let indices: Vec<usize> = self.indices().collect();
        if indices.is_empty() {
            return Ok(root);
        }

        let resolved = resolve_indices(host, &root, self.source(), &indices);
        if config.strict {
            // Fail before the first mutation so the host is left untouched.
            if let Some(&missing) = indices.iter().find(|index| !resolved.contains_key(index)) {
                return Err(PatchError::UnresolvedIndex(missing));
            }
        }
        let mut root = root;
        for index in indices {
            let Some(target) = resolved.get(&index) else {
                log::debug!(target: "vdom.apply", "no host node at index {index}; skipping");
                continue;
            };
            let mut target = target.clone();
            for patch in self.patches_at(index) {
                log::trace!(target: "vdom.apply", "apply {} at {index}", patch.kind());
                if let Some(replacement) = apply_patch(host, &target, patch, config)? {
                    if target == root {
                        root = replacement.clone();
                    }
                    target = replacement;
                }
            }
        }
        Ok(root)
    }
}

/// Map each of the sorted `indices` to the host node at that pre-order
/// position of `tree`, where `root` is the host node rendered for `tree`.
///
/// Indices with no live counterpart are absent from the result.
pub fn resolve_indices<H: HostOps>(
    host: &H,
    root: &H::Node,
    tree: &Node,
    indices: &[usize],
) -> BTreeMap<usize, H::Node> {
    let mut resolved = BTreeMap::new();
    if in_range(indices, 0, tree.span()) {
        resolve_node(host, root, tree, indices, 0, &mut resolved);
    }
    resolved
}

fn resolve_node<H: HostOps>(
    host: &H,
    host_node: &H::Node,
    tree: &Node,
    indices: &[usize],
    index: usize,
    resolved: &mut BTreeMap<usize, H::Node>,
) {
    if indices.binary_search(&index).is_ok() {
        resolved.insert(index, host_node.clone());
    }

    let mut child_index = index;
    for (at, child) in tree.children().iter().enumerate() {
        child_index += 1;
        let last = child_index + child.span();
        if in_range(indices, child_index, last) {
            match host.child_at(host_node, at) {
                Some(host_child) => {
                    resolve_node(host, &host_child, child, indices, child_index, resolved);
                }
                None => {
                    log::debug!(
                        target: "vdom.apply",
                        "host node at index {index} has no child {at}"
                    );
                }
            }
        }
        child_index = last;
    }
}

/// Whether any of the sorted `indices` falls in `[first, last]`.
fn in_range(indices: &[usize], first: usize, last: usize) -> bool {
    let at = indices.partition_point(|&index| index < first);
    indices.get(at).is_some_and(|&index| index <= last)
}

fn apply_patch<H: HostOps>(
    host: &mut H,
    target: &H::Node,
    patch: &Patch,
    config: &ApplyConfig,
) -> Result<Option<H::Node>, PatchError<H::Error>> {
    match patch {
        Patch::Remove => {
            // Already detached by a reorder of the parent.
            if let Some(parent) = host.parent(target) {
                host.remove_child(&parent, target)?;
            }
            Ok(None)
        }
        Patch::Insert(node) => {
            for child in to_host(node, host)? {
                host.append_child(target, &child)?;
            }
            Ok(None)
        }
        Patch::ReplaceContent(node) => replace_content(host, target, node),
        Patch::ReplaceNode(node) => replace_node(host, target, node),
        Patch::Reorder(moves) => {
            reorder_children(host, target, moves, config)?;
            Ok(None)
        }
        Patch::UpdateAttributes { previous, diff } => {
            update_attributes(host, target, previous, diff)?;
            Ok(None)
        }
    }
}

fn replace_content<H: HostOps>(
    host: &mut H,
    target: &H::Node,
    node: &Node,
) -> Result<Option<H::Node>, PatchError<H::Error>> {
    let (kind, content) = match node {
        Node::Text(content) => (HostKind::Text, content),
        Node::Comment(content) => (HostKind::Comment, content),
        Node::Element(_) | Node::Fragment(_) => return replace_node(host, target, node),
    };
    if host.kind(target) == kind {
        host.set_content(target, content)?;
        return Ok(None);
    }
    replace_node(host, target, node)
}

fn replace_node<H: HostOps>(
    host: &mut H,
    target: &H::Node,
    node: &Node,
) -> Result<Option<H::Node>, PatchError<H::Error>> {
    let built = to_host(node, host)?;
    if let Some(parent) = host.parent(target) {
        match built.as_slice() {
            [single] => host.replace_child(&parent, single, target)?,
            many => {
                for child in many {
                    host.insert_before(&parent, child, Some(target))?;
                }
                host.remove_child(&parent, target)?;
            }
        }
    }
    Ok(built.into_iter().next())
}

fn reorder_children<H: HostOps>(
    host: &mut H,
    parent: &H::Node,
    moves: &Moves,
    config: &ApplyConfig,
) -> Result<(), PatchError<H::Error>> {
    let mut removed: HashMap<&str, H::Node> = HashMap::new();

    for removal in &moves.removals {
        let Some(child) = host.child_at(parent, removal.from) else {
            if config.strict {
                return Err(PatchError::UnresolvedIndex(removal.from));
            }
            log::debug!(target: "vdom.apply", "reorder: no child at {}", removal.from);
            continue;
        };
        if let Some(key) = removal.key.as_deref() {
            removed.insert(key, child.clone());
        }
        host.remove_child(parent, &child)?;
    }

    for insertion in &moves.insertions {
        let Some(child) = removed.get(insertion.key.as_str()) else {
            if config.strict {
                return Err(PatchError::MissingKey(insertion.key.clone()));
            }
            log::debug!(target: "vdom.apply", "reorder: key {:?} was not removed", insertion.key);
            continue;
        };
        let before = host.child_at(parent, insertion.to);
        host.insert_before(parent, child, before.as_ref())?;
    }
    Ok(())
}

fn update_attributes<H: HostOps>(
    host: &mut H,
    target: &H::Node,
    previous: &AttrMap,
    diff: &AttrDiff,
) -> Result<(), H::Error> {
    for (name, delta) in diff {
        match delta {
            AttrDelta::Removed => host.remove_attribute(target, name)?,
            AttrDelta::Set(value) => host.set_attribute(target, name, value)?,
            AttrDelta::Nested(nested) => {
                let previous = previous.get(name).and_then(|value| value.as_map());
                for (entry, change) in nested {
                    match change {
                        AttrDelta::Removed => {
                            host.set_attribute_entry(target, name, entry, None)?;
                        }
                        AttrDelta::Set(value) => {
                            host.set_attribute_entry(target, name, entry, Some(value))?;
                        }
                        AttrDelta::Nested(deeper) => {
                            let merged =
                                merge_nested(previous.and_then(|map| map.get(entry)), deeper);
                            host.set_attribute_entry(target, name, entry, Some(&merged))?;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
