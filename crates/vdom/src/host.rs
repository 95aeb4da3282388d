//! Host tree capabilities.
//!
//! The engine never touches a host tree during diffing. Host operations are
//! only issued by [`to_host`] (initial construction) and by patch application.

use crate::attrs::AttrValue;
use crate::node::Node;
use std::fmt;
use std::hash::Hash;

/// Kind of a live host node, as far as content patches care.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostKind {
    Element,
    Text,
    Comment,
    /// Containers, documents and anything else that is not built from a node.
    Other,
}

/// Ordered, mutable host tree (a browser document, an arena, a widget tree).
///
/// `Node` is a cheap handle; two handles are equal iff they name the same
/// live node.
pub trait HostOps {
    type Node: Clone + Eq + Hash + fmt::Debug;
    type Error: fmt::Debug + fmt::Display;

    fn create_element(
        &mut self,
        tag: &str,
        namespace: Option<&str>,
    ) -> Result<Self::Node, Self::Error>;
    fn create_text(&mut self, content: &str) -> Result<Self::Node, Self::Error>;
    fn create_comment(&mut self, content: &str) -> Result<Self::Node, Self::Error>;

    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node)
    -> Result<(), Self::Error>;
    /// Insert `child` before `before`, or append when `before` is `None`.
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        child: &Self::Node,
        before: Option<&Self::Node>,
    ) -> Result<(), Self::Error>;
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node)
    -> Result<(), Self::Error>;
    fn replace_child(
        &mut self,
        parent: &Self::Node,
        new_child: &Self::Node,
        old_child: &Self::Node,
    ) -> Result<(), Self::Error>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
    fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;
    fn child_at(&self, node: &Self::Node, index: usize) -> Option<Self::Node> {
        self.child_nodes(node).get(index).cloned()
    }
    fn kind(&self, node: &Self::Node) -> HostKind;

    fn set_attribute(
        &mut self,
        node: &Self::Node,
        name: &str,
        value: &AttrValue,
    ) -> Result<(), Self::Error>;
    fn remove_attribute(&mut self, node: &Self::Node, name: &str) -> Result<(), Self::Error>;
    /// Set (`Some`) or clear (`None`) one entry of a map-valued attribute,
    /// such as a single inline style property.
    fn set_attribute_entry(
        &mut self,
        node: &Self::Node,
        name: &str,
        entry: &str,
        value: Option<&AttrValue>,
    ) -> Result<(), Self::Error>;
    /// Replace the content of a text or comment node.
    fn set_content(&mut self, node: &Self::Node, content: &str) -> Result<(), Self::Error>;
}

/// Build detached host nodes for `node`.
///
/// Returns one root for text, comment and element nodes, and one root per
/// child for a fragment.
pub fn to_host<H: HostOps>(node: &Node, host: &mut H) -> Result<Vec<H::Node>, H::Error> {
    let mut roots = Vec::new();
    build_into(node, host, &mut roots)?;
    Ok(roots)
}

fn build_into<H: HostOps>(
    node: &Node,
    host: &mut H,
    out: &mut Vec<H::Node>,
) -> Result<(), H::Error> {
    match node {
        Node::Text(content) => out.push(host.create_text(content)?),
        Node::Comment(content) => out.push(host.create_comment(content)?),
        Node::Fragment(fragment) => {
            for child in fragment.children() {
                build_into(child, host, out)?;
            }
        }
        Node::Element(element) => {
            let created = host.create_element(element.tag(), element.namespace())?;
            for (name, value) in element.attributes() {
                host.set_attribute(&created, name, value)?;
            }
            let mut children = Vec::with_capacity(element.children().len());
            for child in element.children() {
                build_into(child, host, &mut children)?;
            }
            for child in &children {
                host.append_child(&created, child)?;
            }
            out.push(created);
        }
    }
    Ok(())
}
