//! Node-pair diff dispatch.
//!
//! Contract:
//! - Both trees are walked in lock-step pre-order; patches are keyed by the
//!   pre-order index of the *old* node.
//! - Structurally equal subtrees are skipped entirely.
//! - Elements with the same tag, namespace and key are updated in place
//!   (attributes, then children). Anything else is replaced wholesale.
//! - Child lists go through keyed reconciliation; inserts and the reorder are
//!   registered on the parent index, after its attribute update.
//!
//! Complexity: O(n) in the number of visited nodes plus keyed move work.

use crate::attrs::diff_attributes;
use crate::config::DiffConfig;
use crate::node::Node;
use crate::patch::{Patch, PatchPlan, Warning};
use crate::reorder::reorder;

pub fn diff(old: &Node, new: &Node) -> PatchPlan {
    diff_with_config(old, new, &DiffConfig::default())
}

pub fn diff_with_config(old: &Node, new: &Node, config: &DiffConfig) -> PatchPlan {
    let mut differ = Differ {
        plan: PatchPlan::new(old.clone()),
        config,
    };
    differ.walk(old, Some(new), 0);
    log::debug!(
        target: "vdom.diff",
        "diff produced {} patches at {} indices, {} warnings",
        differ.plan.len(),
        differ.plan.indices().count(),
        differ.plan.warnings().len()
    );
    differ.plan
}

struct Differ<'c> {
    plan: PatchPlan,
    config: &'c DiffConfig,
}

impl Differ<'_> {
    fn walk(&mut self, old: &Node, new: Option<&Node>, index: usize) {
        let Some(new) = new else {
            self.plan.push(index, Patch::Remove);
            return;
        };
        if old.equals(new) {
            return;
        }

        match new {
            Node::Text(_) | Node::Comment(_) => {
                self.plan.push(index, Patch::ReplaceContent(new.clone()));
            }
            Node::Element(next) => match old {
                Node::Element(prev) if prev.same_identity(next) => {
                    if let Some(diff) = diff_attributes(prev.attributes(), next.attributes()) {
                        self.plan.push(
                            index,
                            Patch::UpdateAttributes {
                                previous: prev.attributes().clone(),
                                diff,
                            },
                        );
                    }
                    self.diff_children(
                        prev.children(),
                        next.children(),
                        Some(next.tag()),
                        index,
                    );
                }
                _ => self.plan.push(index, Patch::ReplaceNode(new.clone())),
            },
            Node::Fragment(next) => match old {
                Node::Fragment(prev) => {
                    self.diff_children(prev.children(), next.children(), None, index);
                }
                _ => self.plan.push(index, Patch::ReplaceNode(new.clone())),
            },
        }
    }

    fn diff_children(
        &mut self,
        old: &[Node],
        new: &[Node],
        parent_tag: Option<&str>,
        index: usize,
    ) {
        let reordered = reorder(old, new);

        if let Some(keys) = reordered.duplicate_keys {
            self.warn(Warning::DuplicatedKeys {
                keys: keys.into_iter().collect(),
                parent_tag: parent_tag.map(str::to_owned),
                index,
            });
        }

        let len = old.len().max(reordered.projected.len());
        let mut child_index = index;
        for at in 0..len {
            child_index += 1;
            let next = reordered.projected.get(at).and_then(Option::as_ref);
            match old.get(at) {
                Some(prev) => {
                    self.walk(prev, next, child_index);
                    child_index += prev.span();
                }
                None => {
                    if let Some(next) = next {
                        self.plan.push(index, Patch::Insert(next.clone()));
                    }
                }
            }
        }

        if let Some(moves) = reordered.moves {
            if let Some(keys) = reordered.new_keys {
                self.warn(Warning::NewKeyedNodeInReorder {
                    keys,
                    parent_tag: parent_tag.map(str::to_owned),
                    index,
                });
            }
            self.plan.push(index, Patch::Reorder(moves));
        }
    }

    fn warn(&mut self, warning: Warning) {
        if self.config.log_warnings {
            log::warn!(target: "vdom.diff", "{warning}");
        }
        self.plan.warn(warning);
    }
}
