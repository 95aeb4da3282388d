//! Patch plan: sparse, index-addressed mutations produced by a diff.
//!
//! Invariants:
//! - Indices are pre-order positions in the *source* (old) tree.
//! - Patches registered at one index are applied in registration order.
//! - For a child list, `Insert` patches precede the `Reorder` patch of the
//!   same parent, and both precede any patch at a child index.
//! - A plan is never mutated once `diff` returns it.

use crate::attrs::{AttrDiff, AttrMap};
use crate::node::Node;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum Patch {
    /// New text/comment payload. Swaps the host node if its kind changed.
    ReplaceContent(Node),
    /// Detach the node at this index.
    Remove,
    /// Append a new child to the node at this index.
    Insert(Node),
    /// Move children of the node at this index.
    Reorder(Moves),
    /// Swap the whole subtree at this index.
    ReplaceNode(Node),
    UpdateAttributes { previous: AttrMap, diff: AttrDiff },
}

impl Patch {
    pub fn kind(&self) -> &'static str {
        match self {
            Patch::ReplaceContent(_) => "replace-content",
            Patch::Remove => "remove",
            Patch::Insert(_) => "insert",
            Patch::Reorder(_) => "reorder",
            Patch::ReplaceNode(_) => "replace-node",
            Patch::UpdateAttributes { .. } => "update-attributes",
        }
    }
}

/// Key-addressed child moves.
///
/// Removals run first, in order, each against the list left by the previous
/// one; removed keyed children are remembered by key. Insertions then run in
/// order and place remembered children at their final position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Moves {
    pub removals: Vec<Removal>,
    pub insertions: Vec<Insertion>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Removal {
    pub from: usize,
    pub key: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Insertion {
    pub to: usize,
    pub key: String,
}

/// Non-fatal diagnostics collected during a diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// Keys repeated within one sibling list; those children were matched
    /// as if unkeyed.
    DuplicatedKeys {
        keys: Vec<String>,
        parent_tag: Option<String>,
        index: usize,
    },
    /// Brand-new keys had to be spliced into a reorder. The final order is
    /// correct but the move sequence is not guaranteed to be minimal.
    NewKeyedNodeInReorder {
        keys: Vec<String>,
        parent_tag: Option<String>,
        index: usize,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, keys, parent_tag, index) = match self {
            Warning::DuplicatedKeys {
                keys,
                parent_tag,
                index,
            } => ("duplicated keys", keys, parent_tag, index),
            Warning::NewKeyedNodeInReorder {
                keys,
                parent_tag,
                index,
            } => ("new keyed nodes in reorder", keys, parent_tag, index),
        };
        let parent = parent_tag.as_deref().unwrap_or("#fragment");
        write!(f, "{label} under <{parent}> at index {index}: {keys:?}")
    }
}

#[derive(Clone, Debug)]
pub struct PatchPlan {
    source: Node,
    patches: BTreeMap<usize, Vec<Patch>>,
    warnings: Vec<Warning>,
}

impl PatchPlan {
    pub(crate) fn new(source: Node) -> Self {
        Self {
            source,
            patches: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, index: usize, patch: Patch) {
        log::trace!(target: "vdom.diff", "patch {} at {index}", patch.kind());
        self.patches.entry(index).or_default().push(patch);
    }

    pub(crate) fn warn(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// The tree the indices refer to.
    pub fn source(&self) -> &Node {
        &self.source
    }

    /// Total number of patches across all indices.
    pub fn len(&self) -> usize {
        self.patches.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Distinct patched indices, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.patches.keys().copied()
    }

    pub fn patches_at(&self, index: usize) -> &[Patch] {
        self.patches.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Patch)> + '_ {
        self.patches
            .iter()
            .flat_map(|(index, patches)| patches.iter().map(move |patch| (*index, patch)))
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

impl fmt::Display for PatchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, patch) in self.iter() {
            match patch {
                Patch::ReplaceContent(node) | Patch::Insert(node) | Patch::ReplaceNode(node) => {
                    writeln!(f, "{index}: {} {node:?}", patch.kind())?;
                }
                Patch::Remove => writeln!(f, "{index}: remove")?,
                Patch::Reorder(moves) => {
                    writeln!(
                        f,
                        "{index}: reorder -{} +{}",
                        moves.removals.len(),
                        moves.insertions.len()
                    )?;
                }
                Patch::UpdateAttributes { diff, .. } => {
                    let names: Vec<&str> = diff.keys().map(String::as_str).collect();
                    writeln!(f, "{index}: update-attributes {}", names.join(","))?;
                }
            }
        }
        for warning in &self.warnings {
            writeln!(f, "warning: {warning}")?;
        }
        Ok(())
    }
}
