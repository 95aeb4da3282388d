//! Immutable virtual tree.
//!
//! Invariants:
//! - Children are normalized once, at construction: nested fragments and
//!   lists are flattened, `None` entries dropped, primitives turned into text.
//!   A `Fragment` is therefore never the child of another node.
//! - `span` (the number of descendant nodes, any variant) is computed from the
//!   flattened children and never changes afterwards. A subtree rooted at
//!   pre-order index `i` occupies `[i, i + span]`.
//! - Nodes are cheap to clone; clones share their payload.

use crate::attrs::{AttrMap, AttrValue};
use std::fmt;
use std::ptr;
use std::rc::Rc;

#[derive(Clone)]
pub enum Node {
    Text(Rc<str>),
    Comment(Rc<str>),
    Fragment(Rc<Fragment>),
    Element(Rc<Element>),
}

#[derive(Debug)]
pub struct Fragment {
    children: Vec<Node>,
    span: usize,
}

#[derive(Debug)]
pub struct Element {
    tag: String,
    namespace: Option<String>,
    key: Option<String>,
    attributes: AttrMap,
    children: Vec<Node>,
    span: usize,
}

impl Fragment {
    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

impl Element {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn attributes(&self) -> &AttrMap {
        &self.attributes
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Same tag, namespace and key: the element may be updated in place.
    pub fn same_identity(&self, other: &Element) -> bool {
        self.tag == other.tag && self.namespace == other.namespace && self.key == other.key
    }

    fn equals(&self, other: &Element) -> bool {
        self.same_identity(other)
            && self.attribute_count() == other.attribute_count()
            && self.attributes == other.attributes
            && self.children == other.children
    }
}

impl Node {
    pub fn text(content: impl Into<Rc<str>>) -> Node {
        Node::Text(content.into())
    }

    pub fn comment(content: impl Into<Rc<str>>) -> Node {
        Node::Comment(content.into())
    }

    pub fn fragment<I, C>(children: I) -> Node
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        let children = normalize(children);
        let span = span_of(&children);
        Node::Fragment(Rc::new(Fragment { children, span }))
    }

    pub fn element(tag: impl Into<String>) -> ElementBuilder {
        ElementBuilder::new(tag)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Node::Comment(_))
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self, Node::Fragment(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Text or comment payload.
    pub fn content(&self) -> Option<&str> {
        match self {
            Node::Text(content) | Node::Comment(content) => Some(&**content),
            Node::Fragment(_) | Node::Element(_) => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.as_element().map(Element::tag)
    }

    pub fn key(&self) -> Option<&str> {
        self.as_element().and_then(Element::key)
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(element) => &element.children,
            Node::Fragment(fragment) => &fragment.children,
            Node::Text(_) | Node::Comment(_) => &[],
        }
    }

    pub fn span(&self) -> usize {
        match self {
            Node::Element(element) => element.span,
            Node::Fragment(fragment) => fragment.span,
            Node::Text(_) | Node::Comment(_) => 0,
        }
    }

    pub fn attribute_count(&self) -> usize {
        self.as_element().map_or(0, Element::attribute_count)
    }

    /// Structural equality with a reference-identity fast path.
    pub fn equals(&self, other: &Node) -> bool {
        if ptr::eq(self, other) {
            return true;
        }
        match (self, other) {
            (Node::Text(a), Node::Text(b)) | (Node::Comment(a), Node::Comment(b)) => {
                Rc::ptr_eq(a, b) || a == b
            }
            (Node::Element(a), Node::Element(b)) => Rc::ptr_eq(a, b) || a.equals(b),
            (Node::Fragment(a), Node::Fragment(b)) => {
                Rc::ptr_eq(a, b) || a.children == b.children
            }
            _ => false,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(content) => write!(f, "Text({content:?})"),
            Node::Comment(content) => write!(f, "Comment({content:?})"),
            Node::Fragment(fragment) => f.debug_list().entries(&fragment.children).finish(),
            Node::Element(element) => {
                let mut out = f.debug_struct("Element");
                out.field("tag", &element.tag);
                if let Some(key) = &element.key {
                    out.field("key", key);
                }
                if let Some(namespace) = &element.namespace {
                    out.field("namespace", namespace);
                }
                if !element.attributes.is_empty() {
                    out.field("attributes", &element.attributes);
                }
                if !element.children.is_empty() {
                    out.field("children", &element.children);
                }
                out.finish()
            }
        }
    }
}

/// Builder for [`Node::Element`]. Children are normalized on `build`.
#[derive(Debug)]
pub struct ElementBuilder {
    tag: String,
    namespace: Option<String>,
    key: Option<String>,
    attributes: AttrMap,
    children: Vec<Child>,
}

impl ElementBuilder {
    fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            namespace: None,
            key: None,
            attributes: AttrMap::new(),
            children: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attrs(mut self, attributes: AttrMap) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Node {
        let children = normalize(self.children);
        let span = span_of(&children);
        Node::Element(Rc::new(Element {
            tag: self.tag,
            namespace: self.namespace,
            key: self.key,
            attributes: self.attributes,
            children,
            span,
        }))
    }
}

impl From<ElementBuilder> for Node {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

/// Anything accepted as a child before normalization.
#[derive(Debug)]
pub enum Child {
    Node(Node),
    List(Vec<Child>),
    Empty,
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<ElementBuilder> for Child {
    fn from(builder: ElementBuilder) -> Self {
        Child::Node(builder.build())
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Node(Node::text(text))
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Node(Node::text(text))
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(child: Option<T>) -> Self {
        child.map_or(Child::Empty, Into::into)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(children: Vec<T>) -> Self {
        Child::List(children.into_iter().map(Into::into).collect())
    }
}

macro_rules! text_child_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Child {
                fn from(value: $ty) -> Self {
                    Child::Node(Node::text(value.to_string()))
                }
            }
        )*
    };
}

text_child_from!(bool, char, i32, i64, u32, u64, usize, f64);

fn normalize<I, C>(children: I) -> Vec<Node>
where
    I: IntoIterator<Item = C>,
    C: Into<Child>,
{
    let mut out = Vec::new();
    for child in children {
        flatten_into(child.into(), &mut out);
    }
    out
}

fn flatten_into(child: Child, out: &mut Vec<Node>) {
    match child {
        Child::Node(Node::Fragment(fragment)) => {
            out.extend(fragment.children.iter().cloned());
        }
        Child::Node(node) => out.push(node),
        Child::List(children) => {
            for child in children {
                flatten_into(child, out);
            }
        }
        Child::Empty => {}
    }
}

fn span_of(children: &[Node]) -> usize {
    children.iter().map(|child| 1 + child.span()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_counts_every_descendant() {
        let tree = Node::element("ul")
            .child(Node::element("li").child("a"))
            .child(Node::element("li").child("b").child(Node::comment("c")))
            .child("tail")
            .build();
        // li, "a", li, "b", <!--c-->, "tail"
        assert_eq!(tree.span(), 6);
        assert_eq!(tree.children()[1].span(), 2);
        assert_eq!(Node::text("x").span(), 0);
    }

    #[test]
    fn nested_fragments_and_lists_are_flattened() {
        let inner = Node::fragment(["b", "c"]);
        let tree = Node::element("div")
            .child("a")
            .child(Node::fragment(vec![Child::from(inner), Child::from("d")]))
            .child(None::<Node>)
            .child(vec![Node::text("e"), Node::fragment(Vec::<Node>::new())])
            .child(42)
            .build();
        let contents: Vec<_> = tree.children().iter().filter_map(Node::content).collect();
        assert_eq!(contents, ["a", "b", "c", "d", "e", "42"]);
        assert!(tree.children().iter().all(|child| !child.is_fragment()));
        assert_eq!(tree.span(), 6);
    }

    #[test]
    fn structural_equality() {
        let build = |id: &str| {
            Node::element("div")
                .attr("id", id)
                .key("k")
                .child(Node::element("span").child("hi"))
                .build()
        };
        assert_eq!(build("a"), build("a"));
        assert_ne!(build("a"), build("b"));
        assert_ne!(Node::text("x"), Node::comment("x"));
        assert_ne!(
            Node::element("div").key("a").build(),
            Node::element("div").key("b").build()
        );
        assert_ne!(
            Node::element("svg").namespace("http://www.w3.org/2000/svg").build(),
            Node::element("svg").build()
        );
        assert_eq!(Node::fragment(["a", "b"]), Node::fragment(["a", "b"]));
        assert_ne!(Node::fragment(["a", "b"]), Node::fragment(["a"]));
    }

    #[test]
    fn clones_share_payload() {
        let tree = Node::element("div").child("x").build();
        let copy = tree.clone();
        match (&tree, &copy) {
            (Node::Element(a), Node::Element(b)) => assert!(Rc::ptr_eq(a, b)),
            _ => unreachable!(),
        }
        assert!(tree.equals(&copy));
    }
}
