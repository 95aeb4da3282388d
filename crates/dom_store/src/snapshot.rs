use crate::{HostTree, NodeKind};
use std::fmt::{self, Write};
use std::sync::OnceLock;
use vdom::AttrValue;

/// Deterministic host tree serialization and equality rules for parity tests.
///
/// Equivalence rules:
/// - Node kinds must match; containers only match containers.
/// - Element tags and namespaces must match.
/// - Attributes compare in name order; names and values must match, nested
///   maps entry by entry.
/// - Text and comment content must match exactly.
/// - Handles are ignored unless `ignore_handles` is off.
#[derive(Clone, Copy, Debug)]
pub struct SnapshotOptions {
    pub ignore_handles: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            ignore_handles: true,
        }
    }
}

#[derive(Debug)]
pub struct DomSnapshot {
    lines: Vec<String>,
}

impl DomSnapshot {
    pub fn new(root: &HostTree, options: SnapshotOptions) -> Self {
        let mut lines = Vec::new();
        walk_snapshot(root, &options, 0, &mut lines);
        Self { lines }
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for DomSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug)]
pub struct HostMismatch<'a> {
    path: String,
    detail: String,
    expected: String,
    actual: String,
    expected_node: &'a HostTree,
    actual_node: &'a HostTree,
    options: SnapshotOptions,
    expected_subtree: OnceLock<String>,
    actual_subtree: OnceLock<String>,
}

impl HostMismatch<'_> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for HostMismatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected_subtree = self
            .expected_subtree
            .get_or_init(|| DomSnapshot::new(self.expected_node, self.options).render());
        let actual_subtree = self
            .actual_subtree
            .get_or_init(|| DomSnapshot::new(self.actual_node, self.options).render());
        writeln!(f, "host mismatch at {}: {}", self.path, self.detail)?;
        writeln!(f, "expected: {}", self.expected)?;
        writeln!(f, "actual:   {}", self.actual)?;
        writeln!(f, "expected subtree:\n{expected_subtree}")?;
        writeln!(f, "actual subtree:\n{actual_subtree}")?;
        Ok(())
    }
}

impl std::error::Error for HostMismatch<'_> {}

pub fn assert_host_eq(expected: &HostTree, actual: &HostTree, options: SnapshotOptions) {
    if let Err(mismatch) = compare_host(expected, actual, options) {
        panic!("{mismatch}");
    }
}

pub fn compare_host<'a>(
    expected: &'a HostTree,
    actual: &'a HostTree,
    options: SnapshotOptions,
) -> Result<(), Box<HostMismatch<'a>>> {
    let mut path = vec![node_label(expected)];
    compare_nodes(expected, actual, &options, &mut path)
}

fn compare_nodes<'a>(
    expected: &'a HostTree,
    actual: &'a HostTree,
    options: &SnapshotOptions,
    path: &mut Vec<String>,
) -> Result<(), Box<HostMismatch<'a>>> {
    let fail = |detail: &str| Err(Box::new(mismatch(path, detail, expected, actual, options)));

    if !options.ignore_handles && expected.handle != actual.handle {
        return fail("handle");
    }
    match (&expected.kind, &actual.kind) {
        (NodeKind::Container, NodeKind::Container) => {}
        (
            NodeKind::Element {
                tag: expected_tag,
                namespace: expected_namespace,
                attributes: expected_attrs,
            },
            NodeKind::Element {
                tag: actual_tag,
                namespace: actual_namespace,
                attributes: actual_attrs,
            },
        ) => {
            if expected_tag != actual_tag {
                return fail("element tag");
            }
            if expected_namespace != actual_namespace {
                return fail("element namespace");
            }
            if expected_attrs.len() != actual_attrs.len() {
                return fail("attribute count");
            }
            for ((exp_name, exp_value), (act_name, act_value)) in
                expected_attrs.iter().zip(actual_attrs.iter())
            {
                if exp_name != act_name {
                    return fail(&format!("attribute name {exp_name:?}"));
                }
                if exp_value != act_value {
                    return fail(&format!("attribute value {exp_name:?}"));
                }
            }
        }
        (NodeKind::Text { content: exp }, NodeKind::Text { content: act }) => {
            if exp != act {
                return fail("text");
            }
        }
        (NodeKind::Comment { content: exp }, NodeKind::Comment { content: act }) => {
            if exp != act {
                return fail("comment");
            }
        }
        _ => return fail("node kind"),
    }
    compare_children(expected, actual, options, path)
}

fn compare_children<'a>(
    expected: &'a HostTree,
    actual: &'a HostTree,
    options: &SnapshotOptions,
    path: &mut Vec<String>,
) -> Result<(), Box<HostMismatch<'a>>> {
    if expected.children.len() != actual.children.len() {
        return Err(Box::new(mismatch(
            path,
            &format!(
                "child count (expected {}, actual {})",
                expected.children.len(),
                actual.children.len()
            ),
            expected,
            actual,
            options,
        )));
    }
    for (idx, (exp, act)) in expected.children.iter().zip(&actual.children).enumerate() {
        path.push(format!("{}[{}]", node_label(exp), idx));
        let result = compare_nodes(exp, act, options, path);
        path.pop();
        result?;
    }
    Ok(())
}

fn mismatch<'a>(
    path: &[String],
    detail: &str,
    expected: &'a HostTree,
    actual: &'a HostTree,
    options: &SnapshotOptions,
) -> HostMismatch<'a> {
    HostMismatch {
        path: format!("/{}", path.join("/")),
        detail: detail.to_string(),
        expected: truncate_line(format_node_line(expected, options), 160),
        actual: truncate_line(format_node_line(actual, options), 160),
        expected_node: expected,
        actual_node: actual,
        options: *options,
        expected_subtree: OnceLock::new(),
        actual_subtree: OnceLock::new(),
    }
}

fn node_label(node: &HostTree) -> String {
    match &node.kind {
        NodeKind::Container => "#container".to_string(),
        NodeKind::Element {
            tag, attributes, ..
        } => {
            let mut label = tag.clone();
            let non_empty = |name: &str| {
                attributes
                    .get(name)
                    .and_then(AttrValue::as_str)
                    .filter(|value| !value.is_empty())
            };
            if let Some(id) = non_empty("id") {
                label.push('#');
                write_escaped(&mut label, id);
            } else if let Some(class) = non_empty("class") {
                label.push_str(".class=");
                write_escaped(&mut label, class);
            }
            label
        }
        NodeKind::Text { .. } => "#text".to_string(),
        NodeKind::Comment { .. } => "#comment".to_string(),
    }
}

fn truncate_line(mut line: String, max_len: usize) -> String {
    if line.len() > max_len {
        let mut cut = max_len.saturating_sub(3);
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        line.truncate(cut);
        line.push_str("...");
    }
    line
}

fn walk_snapshot(
    node: &HostTree,
    options: &SnapshotOptions,
    depth: usize,
    out: &mut Vec<String>,
) {
    const INDENT_STEP: usize = 2;
    let mut line = " ".repeat(depth * INDENT_STEP);
    write_node_line(&mut line, node, options);
    out.push(line);
    for child in &node.children {
        walk_snapshot(child, options, depth + 1, out);
    }
}

fn format_node_line(node: &HostTree, options: &SnapshotOptions) -> String {
    let mut line = String::new();
    write_node_line(&mut line, node, options);
    line
}

fn write_node_line(out: &mut String, node: &HostTree, options: &SnapshotOptions) {
    match &node.kind {
        NodeKind::Container => out.push_str("#container"),
        NodeKind::Element {
            tag,
            namespace,
            attributes,
        } => {
            out.push('<');
            if let Some(namespace) = namespace {
                out.push('{');
                out.push_str(namespace);
                out.push('}');
            }
            out.push_str(tag);
            for (name, value) in attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                write_escaped(out, &value.to_string());
                out.push('"');
            }
            out.push('>');
        }
        NodeKind::Text { content } => {
            out.push('"');
            write_escaped(out, content);
            out.push('"');
        }
        NodeKind::Comment { content } => {
            out.push_str("<!-- ");
            write_escaped(out, content);
            out.push_str(" -->");
        }
    }
    if !options.ignore_handles {
        let _ = write!(out, " @{}", node.handle);
    }
}

fn write_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ if ch.is_ascii() => out.push(ch),
            _ => {
                let _ = write!(out, "\\u{{{:X}}}", ch as u32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DomSnapshot, SnapshotOptions, assert_host_eq, compare_host};
    use crate::{HostTree, NodeHandle, NodeKind};
    use vdom::AttrMap;

    fn leaf(handle: u32, kind: NodeKind) -> HostTree {
        HostTree {
            handle: NodeHandle(handle),
            kind,
            children: Vec::new(),
        }
    }

    fn text(handle: u32, content: &str) -> HostTree {
        leaf(
            handle,
            NodeKind::Text {
                content: content.to_string(),
            },
        )
    }

    fn elem(handle: u32, tag: &str, id: Option<&str>, children: Vec<HostTree>) -> HostTree {
        let mut attributes = AttrMap::new();
        attributes.insert("class".into(), "a b".into());
        if let Some(id) = id {
            attributes.insert("id".into(), id.into());
        }
        HostTree {
            handle: NodeHandle(handle),
            kind: NodeKind::Element {
                tag: tag.to_string(),
                namespace: None,
                attributes,
            },
            children,
        }
    }

    fn container(handle: u32, children: Vec<HostTree>) -> HostTree {
        HostTree {
            handle: NodeHandle(handle),
            kind: NodeKind::Container,
            children,
        }
    }

    #[test]
    fn host_eq_ignores_handles_by_default() {
        let expected = container(0, vec![elem(1, "div", None, vec![text(2, "hi")])]);
        let actual = container(10, vec![elem(11, "div", None, vec![text(12, "hi")])]);
        assert_host_eq(&expected, &actual, SnapshotOptions::default());

        let strict = SnapshotOptions {
            ignore_handles: false,
        };
        let err = compare_host(&expected, &actual, strict).expect_err("handles differ");
        assert_eq!(err.detail(), "handle");
    }

    #[test]
    fn mismatch_points_to_text() {
        let expected = container(0, vec![elem(0, "p", None, vec![text(0, "a")])]);
        let actual = container(0, vec![elem(0, "p", None, vec![text(0, "b")])]);
        let err = compare_host(&expected, &actual, SnapshotOptions::default())
            .expect_err("expected mismatch");
        assert_eq!(err.path(), "/#container/p.class=a b[0]/#text[0]");
        assert!(err.to_string().contains("#text"));
    }

    #[test]
    fn mismatch_path_prefers_id_label() {
        let expected = container(0, vec![elem(0, "div", Some("main"), vec![text(0, "a")])]);
        let actual = container(0, vec![elem(0, "div", Some("main"), vec![])]);
        let err = compare_host(&expected, &actual, SnapshotOptions::default())
            .expect_err("expected mismatch");
        assert!(err.to_string().contains("div#main[0]"));
        assert!(err.detail().starts_with("child count"));
    }

    #[test]
    fn snapshot_lines_are_indented_and_escaped() {
        let tree = container(0, vec![elem(1, "p", None, vec![text(2, "a\"b\n")])]);
        let snapshot = DomSnapshot::new(&tree, SnapshotOptions::default());
        assert_eq!(
            snapshot.as_lines(),
            [
                "#container".to_string(),
                "  <p class=\"\\\"a b\\\"\">".to_string(),
                "    \"a\\\"b\\n\"".to_string(),
            ]
        );
    }
}
