//! Arena-backed host tree.
//!
//! Nodes are allocated once and never freed; removing a node only detaches
//! it, so handles stay valid and a detached subtree can be re-inserted
//! elsewhere (which keyed reorders rely on).

mod snapshot;

pub use crate::snapshot::{
    DomSnapshot, HostMismatch, SnapshotOptions, assert_host_eq, compare_host,
};

use std::fmt;
use vdom::{AttrMap, AttrValue, HostKind, HostOps};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u32);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum DomStoreError {
    UnknownNode(NodeHandle),
    WrongNodeKind(NodeHandle),
    NotAChild {
        parent: NodeHandle,
        child: NodeHandle,
    },
    CycleDetected {
        parent: NodeHandle,
        child: NodeHandle,
    },
    /// The parent cannot hold children, or the child is already attached.
    InvalidParent(NodeHandle),
    InvalidSibling {
        parent: NodeHandle,
        before: NodeHandle,
    },
    /// Every `u32` handle has been handed out.
    ArenaFull,
}

impl fmt::Display for DomStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomStoreError::UnknownNode(node) => write!(f, "unknown node {node}"),
            DomStoreError::WrongNodeKind(node) => write!(f, "wrong node kind for {node}"),
            DomStoreError::NotAChild { parent, child } => {
                write!(f, "{child} is not a child of {parent}")
            }
            DomStoreError::CycleDetected { parent, child } => {
                write!(f, "attaching {child} under {parent} would create a cycle")
            }
            DomStoreError::InvalidParent(node) => write!(f, "invalid parent for {node}"),
            DomStoreError::InvalidSibling { parent, before } => {
                write!(f, "{before} is not a child of {parent}")
            }
            DomStoreError::ArenaFull => f.write_str("node arena is full"),
        }
    }
}

impl std::error::Error for DomStoreError {}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Mount point created by [`DomStore::create_container`].
    Container,
    Element {
        tag: String,
        namespace: Option<String>,
        attributes: AttrMap,
    },
    Text {
        content: String,
    },
    Comment {
        content: String,
    },
}

/// Owned copy of a host subtree.
#[derive(Clone, Debug, PartialEq)]
pub struct HostTree {
    pub handle: NodeHandle,
    pub kind: NodeKind,
    pub children: Vec<HostTree>,
}

struct NodeRecord {
    kind: NodeKind,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
}

impl NodeRecord {
    fn allows_children(&self) -> bool {
        matches!(self.kind, NodeKind::Container | NodeKind::Element { .. })
    }
}

#[derive(Default)]
pub struct DomStore {
    nodes: Vec<NodeRecord>,
}

impl DomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_container(&mut self) -> Result<NodeHandle, DomStoreError> {
        self.allocate(NodeKind::Container)
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&NodeKind> {
        self.record(handle).ok().map(|record| &record.kind)
    }

    pub fn attribute(&self, handle: NodeHandle, name: &str) -> Option<&AttrValue> {
        match self.node(handle)? {
            NodeKind::Element { attributes, .. } => attributes.get(name),
            _ => None,
        }
    }

    pub fn materialize(&self, handle: NodeHandle) -> Result<HostTree, DomStoreError> {
        let record = self.record(handle)?;
        let children = record
            .children
            .iter()
            .map(|child| self.materialize(*child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(HostTree {
            handle,
            kind: record.kind.clone(),
            children,
        })
    }

    fn allocate(&mut self, kind: NodeKind) -> Result<NodeHandle, DomStoreError> {
        let handle = next_handle(self.nodes.len())?;
        log::trace!(target: "dom_store", "allocate {handle} {kind:?}");
        self.nodes.push(NodeRecord {
            kind,
            parent: None,
            children: Vec::new(),
        });
        Ok(handle)
    }

    fn record(&self, handle: NodeHandle) -> Result<&NodeRecord, DomStoreError> {
        self.nodes
            .get(handle.0 as usize)
            .ok_or(DomStoreError::UnknownNode(handle))
    }

    fn record_mut(&mut self, handle: NodeHandle) -> Result<&mut NodeRecord, DomStoreError> {
        self.nodes
            .get_mut(handle.0 as usize)
            .ok_or(DomStoreError::UnknownNode(handle))
    }

    fn attributes_mut(&mut self, handle: NodeHandle) -> Result<&mut AttrMap, DomStoreError> {
        match &mut self.record_mut(handle)?.kind {
            NodeKind::Element { attributes, .. } => Ok(attributes),
            _ => Err(DomStoreError::WrongNodeKind(handle)),
        }
    }

    /// Validate attaching the detached `child` under `parent`.
    fn check_attach(&self, parent: NodeHandle, child: NodeHandle) -> Result<(), DomStoreError> {
        let parent_record = self.record(parent)?;
        let child_record = self.record(child)?;
        if parent == child || self.is_descendant(child, parent) {
            return Err(DomStoreError::CycleDetected { parent, child });
        }
        if !parent_record.allows_children() {
            return Err(DomStoreError::InvalidParent(parent));
        }
        if child_record.parent.is_some() {
            return Err(DomStoreError::InvalidParent(child));
        }
        Ok(())
    }

    fn position(&self, parent: NodeHandle, child: NodeHandle) -> Option<usize> {
        self.nodes
            .get(parent.0 as usize)?
            .children
            .iter()
            .position(|c| *c == child)
    }

    fn is_descendant(&self, ancestor: NodeHandle, maybe_descendant: NodeHandle) -> bool {
        let mut current = self
            .nodes
            .get(maybe_descendant.0 as usize)
            .and_then(|record| record.parent);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.nodes.get(node.0 as usize).and_then(|record| record.parent);
        }
        false
    }
}

fn next_handle(allocated: usize) -> Result<NodeHandle, DomStoreError> {
    u32::try_from(allocated)
        .map(NodeHandle)
        .map_err(|_| DomStoreError::ArenaFull)
}

impl HostOps for DomStore {
    type Node = NodeHandle;
    type Error = DomStoreError;

    fn create_element(
        &mut self,
        tag: &str,
        namespace: Option<&str>,
    ) -> Result<NodeHandle, DomStoreError> {
        self.allocate(NodeKind::Element {
            tag: tag.to_owned(),
            namespace: namespace.map(str::to_owned),
            attributes: AttrMap::new(),
        })
    }

    fn create_text(&mut self, content: &str) -> Result<NodeHandle, DomStoreError> {
        self.allocate(NodeKind::Text {
            content: content.to_owned(),
        })
    }

    fn create_comment(&mut self, content: &str) -> Result<NodeHandle, DomStoreError> {
        self.allocate(NodeKind::Comment {
            content: content.to_owned(),
        })
    }

    fn append_child(
        &mut self,
        parent: &NodeHandle,
        child: &NodeHandle,
    ) -> Result<(), DomStoreError> {
        self.insert_before(parent, child, None)
    }

    fn insert_before(
        &mut self,
        parent: &NodeHandle,
        child: &NodeHandle,
        before: Option<&NodeHandle>,
    ) -> Result<(), DomStoreError> {
        let (parent, child) = (*parent, *child);
        self.check_attach(parent, child)?;
        let at = match before {
            Some(&before) => self
                .position(parent, before)
                .ok_or(DomStoreError::InvalidSibling { parent, before })?,
            None => self.record(parent)?.children.len(),
        };
        log::trace!(target: "dom_store", "insert {child} into {parent} at {at}");
        self.record_mut(parent)?.children.insert(at, child);
        self.record_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: &NodeHandle,
        child: &NodeHandle,
    ) -> Result<(), DomStoreError> {
        let (parent, child) = (*parent, *child);
        let at = self
            .position(parent, child)
            .ok_or(DomStoreError::NotAChild { parent, child })?;
        log::trace!(target: "dom_store", "remove {child} from {parent}");
        self.record_mut(parent)?.children.remove(at);
        self.record_mut(child)?.parent = None;
        Ok(())
    }

    fn replace_child(
        &mut self,
        parent: &NodeHandle,
        new_child: &NodeHandle,
        old_child: &NodeHandle,
    ) -> Result<(), DomStoreError> {
        let (parent, new_child, old_child) = (*parent, *new_child, *old_child);
        let at = self.position(parent, old_child).ok_or(DomStoreError::NotAChild {
            parent,
            child: old_child,
        })?;
        self.check_attach(parent, new_child)?;
        log::trace!(target: "dom_store", "replace {old_child} with {new_child} in {parent}");
        self.record_mut(parent)?.children[at] = new_child;
        self.record_mut(old_child)?.parent = None;
        self.record_mut(new_child)?.parent = Some(parent);
        Ok(())
    }

    fn parent(&self, node: &NodeHandle) -> Option<NodeHandle> {
        self.record(*node).ok()?.parent
    }

    fn child_nodes(&self, node: &NodeHandle) -> Vec<NodeHandle> {
        self.record(*node)
            .map(|record| record.children.clone())
            .unwrap_or_default()
    }

    fn child_at(&self, node: &NodeHandle, index: usize) -> Option<NodeHandle> {
        self.record(*node).ok()?.children.get(index).copied()
    }

    fn kind(&self, node: &NodeHandle) -> HostKind {
        match self.node(*node) {
            Some(NodeKind::Element { .. }) => HostKind::Element,
            Some(NodeKind::Text { .. }) => HostKind::Text,
            Some(NodeKind::Comment { .. }) => HostKind::Comment,
            Some(NodeKind::Container) | None => HostKind::Other,
        }
    }

    fn set_attribute(
        &mut self,
        node: &NodeHandle,
        name: &str,
        value: &AttrValue,
    ) -> Result<(), DomStoreError> {
        self.attributes_mut(*node)?
            .insert(name.to_owned(), value.clone());
        Ok(())
    }

    fn remove_attribute(&mut self, node: &NodeHandle, name: &str) -> Result<(), DomStoreError> {
        self.attributes_mut(*node)?.remove(name);
        Ok(())
    }

    fn set_attribute_entry(
        &mut self,
        node: &NodeHandle,
        name: &str,
        entry: &str,
        value: Option<&AttrValue>,
    ) -> Result<(), DomStoreError> {
        let attributes = self.attributes_mut(*node)?;
        let slot = attributes
            .entry(name.to_owned())
            .or_insert_with(|| AttrValue::Map(AttrMap::new()));
        // A scalar value is overwritten by the first entry edit.
        if !matches!(slot, AttrValue::Map(_)) {
            *slot = AttrValue::Map(AttrMap::new());
        }
        if let AttrValue::Map(map) = slot {
            match value {
                Some(value) => map.insert(entry.to_owned(), value.clone()),
                None => map.remove(entry),
            };
        }
        Ok(())
    }

    fn set_content(&mut self, node: &NodeHandle, content: &str) -> Result<(), DomStoreError> {
        match &mut self.record_mut(*node)?.kind {
            NodeKind::Text { content: existing } | NodeKind::Comment { content: existing } => {
                existing.clear();
                existing.push_str(content);
                Ok(())
            }
            _ => Err(DomStoreError::WrongNodeKind(*node)),
        }
    }
}
