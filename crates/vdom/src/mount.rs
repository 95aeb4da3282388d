//! Per-container render memo.
//!
//! A [`MountRegistry`] remembers, for every container it has rendered into,
//! the last tree and the host node that tree was rendered to. The next render
//! into the same container diffs against that tree and patches in place.
//!
//! Fragment roots have no host node of their own. Their children sit directly
//! in the container, possibly next to children the registry did not create,
//! so the registry remembers the run of container children it owns and
//! patches through a window onto the host that shows only that run.

use crate::attrs::AttrValue;
use crate::config::{ApplyConfig, DiffConfig};
use crate::diff::diff_with_config;
use crate::error::PatchError;
use crate::host::{HostKind, HostOps, to_host};
use crate::node::Node;
use std::collections::HashMap;

enum Mounted<N> {
    Root(N),
    /// `nodes` are contiguous container children; `start` is where the run
    /// began when it was last rendered, used when the run is empty.
    Fragment { start: usize, nodes: Vec<N> },
}

struct MountState<N> {
    tree: Node,
    mounted: Mounted<N>,
}

pub struct MountRegistry<H: HostOps> {
    mounts: HashMap<H::Node, MountState<H::Node>>,
    diff_config: DiffConfig,
    apply_config: ApplyConfig,
}

impl<H: HostOps> Default for MountRegistry<H> {
    fn default() -> Self {
        Self::init()
    }
}

impl<H: HostOps> MountRegistry<H> {
    pub fn init() -> Self {
        Self::with_config(DiffConfig::default(), ApplyConfig::default())
    }

    pub fn with_config(diff_config: DiffConfig, apply_config: ApplyConfig) -> Self {
        Self {
            mounts: HashMap::new(),
            diff_config,
            apply_config,
        }
    }

    /// Render `tree` into `container`.
    ///
    /// Returns the host node of the root, or `None` when the root is a
    /// fragment (its children live directly in `container`).
    pub fn render(
        &mut self,
        tree: &Node,
        container: &H::Node,
        host: &mut H,
    ) -> Result<Option<H::Node>, PatchError<H::Error>> {
        let Some(state) = self.mounts.get(container) else {
            return self.mount_fresh(tree, container, host);
        };

        if state.tree.is_fragment() != tree.is_fragment() {
            log::debug!(
                target: "vdom.mount",
                "root crossed the fragment boundary in {container:?}; remounting"
            );
            self.unmount(container, host)?;
            return self.mount_fresh(tree, container, host);
        }

        let plan = diff_with_config(&state.tree, tree, &self.diff_config);
        log::trace!(
            target: "vdom.mount",
            "incremental render into {container:?}: {} patches",
            plan.len()
        );
        let (mounted, root) = match &state.mounted {
            Mounted::Root(root) => {
                let root = plan.apply_to_with_config(root.clone(), host, &self.apply_config)?;
                (Mounted::Root(root.clone()), Some(root))
            }
            Mounted::Fragment { start, nodes } => {
                let mut window = FragmentWindow::open(host, container, *start, nodes);
                plan.apply_to_with_config(container.clone(), &mut window, &self.apply_config)?;
                let mounted = Mounted::Fragment {
                    start: window.offset,
                    nodes: window.nodes(),
                };
                (mounted, None)
            }
        };
        self.mounts.insert(
            container.clone(),
            MountState {
                tree: tree.clone(),
                mounted,
            },
        );
        Ok(root)
    }

    fn mount_fresh(
        &mut self,
        tree: &Node,
        container: &H::Node,
        host: &mut H,
    ) -> Result<Option<H::Node>, PatchError<H::Error>> {
        let start = host.child_nodes(container).len();
        let roots = to_host(tree, host)?;
        for root in &roots {
            host.append_child(container, root)?;
        }
        log::trace!(
            target: "vdom.mount",
            "fresh mount into {container:?}: {} root nodes after {start}",
            roots.len()
        );

        let (mounted, root) = if tree.is_fragment() {
            (Mounted::Fragment { start, nodes: roots }, None)
        } else {
            let Some(root) = roots.into_iter().next() else {
                return Ok(None);
            };
            (Mounted::Root(root.clone()), Some(root))
        };
        self.mounts.insert(
            container.clone(),
            MountState {
                tree: tree.clone(),
                mounted,
            },
        );
        Ok(root)
    }

    /// Remove the rendered nodes from `container` and forget it.
    ///
    /// Returns `false` when nothing was mounted there.
    pub fn unmount(&mut self, container: &H::Node, host: &mut H) -> Result<bool, H::Error> {
        let Some(state) = self.mounts.remove(container) else {
            return Ok(false);
        };
        let owned = match state.mounted {
            Mounted::Root(root) => vec![root],
            Mounted::Fragment { nodes, .. } => nodes,
        };
        for node in owned {
            if host.parent(&node).as_ref() == Some(container) {
                host.remove_child(container, &node)?;
            }
        }
        log::trace!(target: "vdom.mount", "unmounted {container:?}");
        Ok(true)
    }

    /// Forget `container` without touching the host tree.
    pub fn dispose(&mut self, container: &H::Node) -> bool {
        self.mounts.remove(container).is_some()
    }

    pub fn last_tree(&self, container: &H::Node) -> Option<&Node> {
        self.mounts.get(container).map(|state| &state.tree)
    }

    pub fn is_mounted(&self, container: &H::Node) -> bool {
        self.mounts.contains_key(container)
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

/// A host view in which `container` only has the children of one mounted
/// fragment, `len` children starting at `offset`.
///
/// Every other node is passed through untouched.
struct FragmentWindow<'a, H: HostOps> {
    host: &'a mut H,
    container: H::Node,
    offset: usize,
    len: usize,
}

impl<'a, H: HostOps> FragmentWindow<'a, H> {
    fn open(host: &'a mut H, container: &H::Node, start: usize, nodes: &[H::Node]) -> Self {
        let children = host.child_nodes(container);
        let offset = nodes
            .first()
            .and_then(|first| children.iter().position(|child| child == first))
            .unwrap_or_else(|| start.min(children.len()));
        Self {
            host,
            container: container.clone(),
            offset,
            len: nodes.len(),
        }
    }

    fn nodes(&self) -> Vec<H::Node> {
        self.window_of(&self.container)
    }

    fn window_of(&self, node: &H::Node) -> Vec<H::Node> {
        let children = self.host.child_nodes(node);
        let end = (self.offset + self.len).min(children.len());
        children
            .get(self.offset..end)
            .map(<[H::Node]>::to_vec)
            .unwrap_or_default()
    }

    fn is_container(&self, node: &H::Node) -> bool {
        *node == self.container
    }

    fn is_ours(&self, child: &H::Node) -> bool {
        self.host.parent(child).as_ref() == Some(&self.container)
    }

    /// First container child after the window, the anchor for appends.
    fn window_end(&self) -> Option<H::Node> {
        self.host.child_at(&self.container, self.offset + self.len)
    }
}

impl<H: HostOps> HostOps for FragmentWindow<'_, H> {
    type Node = H::Node;
    type Error = H::Error;

    fn create_element(
        &mut self,
        tag: &str,
        namespace: Option<&str>,
    ) -> Result<H::Node, H::Error> {
        self.host.create_element(tag, namespace)
    }

    fn create_text(&mut self, content: &str) -> Result<H::Node, H::Error> {
        self.host.create_text(content)
    }

    fn create_comment(&mut self, content: &str) -> Result<H::Node, H::Error> {
        self.host.create_comment(content)
    }

    fn append_child(&mut self, parent: &H::Node, child: &H::Node) -> Result<(), H::Error> {
        self.insert_before(parent, child, None)
    }

    fn insert_before(
        &mut self,
        parent: &H::Node,
        child: &H::Node,
        before: Option<&H::Node>,
    ) -> Result<(), H::Error> {
        if !self.is_container(parent) {
            return self.host.insert_before(parent, child, before);
        }
        let moved = self.is_ours(child);
        let anchor = match before {
            Some(before) => Some(before.clone()),
            None => self.window_end(),
        };
        self.host.insert_before(parent, child, anchor.as_ref())?;
        if !moved {
            self.len += 1;
        }
        Ok(())
    }

    fn remove_child(&mut self, parent: &H::Node, child: &H::Node) -> Result<(), H::Error> {
        self.host.remove_child(parent, child)?;
        if self.is_container(parent) {
            self.len = self.len.saturating_sub(1);
        }
        Ok(())
    }

    fn replace_child(
        &mut self,
        parent: &H::Node,
        new_child: &H::Node,
        old_child: &H::Node,
    ) -> Result<(), H::Error> {
        let moved = self.is_container(parent) && self.is_ours(new_child);
        self.host.replace_child(parent, new_child, old_child)?;
        if moved {
            self.len = self.len.saturating_sub(1);
        }
        Ok(())
    }

    fn parent(&self, node: &H::Node) -> Option<H::Node> {
        self.host.parent(node)
    }

    fn child_nodes(&self, node: &H::Node) -> Vec<H::Node> {
        if self.is_container(node) {
            self.window_of(node)
        } else {
            self.host.child_nodes(node)
        }
    }

    fn child_at(&self, node: &H::Node, index: usize) -> Option<H::Node> {
        if !self.is_container(node) {
            return self.host.child_at(node, index);
        }
        if index < self.len {
            self.host.child_at(node, self.offset + index)
        } else {
            None
        }
    }

    fn kind(&self, node: &H::Node) -> HostKind {
        self.host.kind(node)
    }

    fn set_attribute(
        &mut self,
        node: &H::Node,
        name: &str,
        value: &AttrValue,
    ) -> Result<(), H::Error> {
        self.host.set_attribute(node, name, value)
    }

    fn remove_attribute(&mut self, node: &H::Node, name: &str) -> Result<(), H::Error> {
        self.host.remove_attribute(node, name)
    }

    fn set_attribute_entry(
        &mut self,
        node: &H::Node,
        name: &str,
        entry: &str,
        value: Option<&AttrValue>,
    ) -> Result<(), H::Error> {
        self.host.set_attribute_entry(node, name, entry, value)
    }

    fn set_content(&mut self, node: &H::Node, content: &str) -> Result<(), H::Error> {
        self.host.set_content(node, content)
    }
}
