//! Fixture corpus and assertion helpers shared by vdom parity tests.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use vdom::{AttrMap, AttrValue, Node};

pub const ROUNDTRIP_FORMAT_V1: &str = "vdom-roundtrip-v1";

/// A tree as written in a fixture file.
///
/// ```toml
/// old = { tag = "ul", children = [{ tag = "li", key = "a", children = [{ text = "a" }] }] }
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum FixtureNode {
    Text {
        text: String,
    },
    Comment {
        comment: String,
    },
    Fragment {
        fragment: Vec<FixtureNode>,
    },
    Element {
        tag: String,
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        namespace: Option<String>,
        #[serde(default)]
        attrs: BTreeMap<String, FixtureValue>,
        #[serde(default)]
        children: Vec<FixtureNode>,
    },
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum FixtureValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Map(BTreeMap<String, FixtureValue>),
}

impl FixtureNode {
    pub fn to_node(&self) -> Node {
        match self {
            FixtureNode::Text { text } => Node::text(text.as_str()),
            FixtureNode::Comment { comment } => Node::comment(comment.as_str()),
            FixtureNode::Fragment { fragment } => {
                Node::fragment(fragment.iter().map(FixtureNode::to_node))
            }
            FixtureNode::Element {
                tag,
                key,
                namespace,
                attrs,
                children,
            } => {
                let mut builder = Node::element(tag.as_str()).attrs(to_attr_map(attrs));
                if let Some(key) = key {
                    builder = builder.key(key.as_str());
                }
                if let Some(namespace) = namespace {
                    builder = builder.namespace(namespace.as_str());
                }
                builder
                    .children(children.iter().map(FixtureNode::to_node))
                    .build()
            }
        }
    }
}

impl FixtureValue {
    pub fn to_value(&self) -> AttrValue {
        match self {
            FixtureValue::Bool(value) => AttrValue::Bool(*value),
            FixtureValue::Int(value) => AttrValue::Int(*value),
            FixtureValue::Float(value) => AttrValue::Float(*value),
            FixtureValue::Str(value) => AttrValue::Str(value.clone()),
            FixtureValue::Map(map) => AttrValue::Map(to_attr_map(map)),
        }
    }
}

fn to_attr_map(attrs: &BTreeMap<String, FixtureValue>) -> AttrMap {
    attrs
        .iter()
        .map(|(name, value)| (name.clone(), value.to_value()))
        .collect()
}

#[derive(Clone, Debug, Deserialize)]
pub struct RoundTripCase {
    pub name: String,
    pub old: FixtureNode,
    pub new: FixtureNode,
    /// Whether the plan must (or must not) contain a reorder.
    #[serde(default)]
    pub expect_reorder: Option<bool>,
    #[serde(default)]
    pub expect_patches: Option<usize>,
    #[serde(default)]
    pub expect_warnings: Option<usize>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Corpus {
    pub format: String,
    #[serde(default)]
    pub case: Vec<RoundTripCase>,
}

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

pub fn load_corpus(path: &Path) -> Corpus {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read fixture corpus {path:?}: {err}"));
    let corpus: Corpus = toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse fixture corpus {path:?}: {err}"));
    assert_eq!(
        corpus.format, ROUNDTRIP_FORMAT_V1,
        "unsupported fixture format in {path:?}"
    );
    let mut seen = std::collections::BTreeSet::new();
    for case in &corpus.case {
        assert!(
            seen.insert(case.name.as_str()),
            "duplicate case name in {path:?}: {}",
            case.name
        );
    }
    corpus
}

/// All round-trip cases in `fixtures/roundtrip.toml`.
pub fn roundtrip_cases() -> Vec<RoundTripCase> {
    load_corpus(&fixtures_dir().join("roundtrip.toml")).case
}

pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    use std::fmt::Write;
    fn line(lines: &[String], i: usize) -> &str {
        lines.get(i).map(String::as_str).unwrap_or("<missing>")
    }
    let max = expected.len().max(actual.len());
    let mut out = String::new();

    let mismatch = (0..max).find(|&i| line(expected, i) != line(actual, i));
    if let Some(i) = mismatch {
        let start = i.saturating_sub(2);
        let end = (i + 3).min(max);
        let _ = writeln!(
            &mut out,
            "first mismatch at line {} (showing {}..={}):",
            i + 1,
            start + 1,
            end
        );
        for at in start..end {
            let marker = if at == i { ">" } else { " " };
            let _ = writeln!(&mut out, "{marker} {:>4}  expected: {}", at + 1, line(expected, at));
            let _ = writeln!(&mut out, "{marker} {:>4}    actual: {}", at + 1, line(actual, at));
        }
    }
    let _ = writeln!(
        &mut out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}
