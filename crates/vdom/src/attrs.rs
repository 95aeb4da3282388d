//! Attribute values and the property-map diff.
//!
//! Equality rules:
//! - Primitives compare by value.
//! - `Map` values compare entry by entry.
//! - `Opaque` values compare by identity only; two distinct allocations are
//!   never equal, even if their contents are.
//!
//! Diff rules:
//! - Keys only in the old map are recorded as [`AttrDelta::Removed`].
//! - Keys whose values differ are recorded as [`AttrDelta::Set`], except when
//!   both sides are `Map`s, in which case only the nested diff is recorded.
//! - Keys only in the new map are recorded as [`AttrDelta::Set`].

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Ordered attribute map. Ordering keeps patch output deterministic.
pub type AttrMap = BTreeMap<String, AttrValue>;

/// Per-key changes between two attribute maps.
pub type AttrDiff = BTreeMap<String, AttrDelta>;

#[derive(Clone, Debug)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Plain nested table (inline styles, datasets). Diffed entry by entry.
    Map(AttrMap),
    /// Host-owned object. Never merged, only replaced.
    Opaque(OpaqueValue),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&AttrMap> {
        match self {
            AttrValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Bool(a), AttrValue::Bool(b)) => a == b,
            (AttrValue::Int(a), AttrValue::Int(b)) => a == b,
            (AttrValue::Float(a), AttrValue::Float(b)) => a == b,
            (AttrValue::Str(a), AttrValue::Str(b)) => a == b,
            (AttrValue::Map(a), AttrValue::Map(b)) => a == b,
            (AttrValue::Opaque(a), AttrValue::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(value) => write!(f, "{value}"),
            AttrValue::Int(value) => write!(f, "{value}"),
            AttrValue::Float(value) => write!(f, "{value}"),
            AttrValue::Str(value) => write!(f, "{value:?}"),
            AttrValue::Map(map) => {
                f.write_str("{")?;
                for (i, (name, value)) in map.iter().enumerate() {
                    if i != 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
            AttrValue::Opaque(_) => f.write_str("<opaque>"),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(i64::from(value))
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<AttrMap> for AttrValue {
    fn from(value: AttrMap) -> Self {
        AttrValue::Map(value)
    }
}

impl From<OpaqueValue> for AttrValue {
    fn from(value: OpaqueValue) -> Self {
        AttrValue::Opaque(value)
    }
}

/// Shared handle to an arbitrary host object, compared by identity.
#[derive(Clone)]
pub struct OpaqueValue(Rc<dyn Any>);

impl OpaqueValue {
    pub fn new<T: Any>(value: T) -> Self {
        Self(Rc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueValue({:p})", Rc::as_ptr(&self.0))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttrDelta {
    Removed,
    Set(AttrValue),
    Nested(AttrDiff),
}

/// Compare two attribute maps.
///
/// Returns `None` when the maps are equal; callers must not emit an update
/// for an empty diff.
pub fn diff_attributes(old: &AttrMap, new: &AttrMap) -> Option<AttrDiff> {
    let mut diff = AttrDiff::new();

    for (name, old_value) in old {
        let Some(new_value) = new.get(name) else {
            diff.insert(name.clone(), AttrDelta::Removed);
            continue;
        };
        if old_value == new_value {
            continue;
        }
        match (old_value, new_value) {
            (AttrValue::Map(old_map), AttrValue::Map(new_map)) => {
                if let Some(nested) = diff_attributes(old_map, new_map) {
                    diff.insert(name.clone(), AttrDelta::Nested(nested));
                }
            }
            _ => {
                diff.insert(name.clone(), AttrDelta::Set(new_value.clone()));
            }
        }
    }

    for (name, new_value) in new {
        if !old.contains_key(name) {
            diff.insert(name.clone(), AttrDelta::Set(new_value.clone()));
        }
    }

    if diff.is_empty() { None } else { Some(diff) }
}

/// Apply `diff` on top of `previous`, producing the merged map value.
///
/// Used when a nested change is deeper than a host can address entry by entry.
pub fn merge_nested(previous: Option<&AttrValue>, diff: &AttrDiff) -> AttrValue {
    let mut merged = previous
        .and_then(AttrValue::as_map)
        .cloned()
        .unwrap_or_default();
    for (name, delta) in diff {
        match delta {
            AttrDelta::Removed => {
                merged.remove(name);
            }
            AttrDelta::Set(value) => {
                merged.insert(name.clone(), value.clone());
            }
            AttrDelta::Nested(nested) => {
                let value = merge_nested(merged.get(name), nested);
                merged.insert(name.clone(), value);
            }
        }
    }
    AttrValue::Map(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, AttrValue)]) -> AttrMap {
        entries
            .iter()
            .map(|(name, value)| ((*name).to_owned(), value.clone()))
            .collect()
    }

    #[test]
    fn equal_maps_produce_no_diff() {
        let a = map(&[("id", "a".into()), ("tabindex", 3.into())]);
        assert_eq!(diff_attributes(&a, &a.clone()), None);
    }

    #[test]
    fn added_removed_and_changed_keys() {
        let old = map(&[("id", "a".into()), ("title", "t".into())]);
        let new = map(&[("id", "b".into()), ("hidden", true.into())]);
        let diff = diff_attributes(&old, &new).expect("expected a diff");
        assert_eq!(diff.len(), 3);
        assert_eq!(diff["id"], AttrDelta::Set("b".into()));
        assert_eq!(diff["title"], AttrDelta::Removed);
        assert_eq!(diff["hidden"], AttrDelta::Set(true.into()));
    }

    #[test]
    fn nested_maps_record_only_the_nested_change() {
        let old = map(&[(
            "style",
            map(&[("color", "red".into()), ("margin", "0".into())]).into(),
        )]);
        let new = map(&[(
            "style",
            map(&[("color", "blue".into()), ("margin", "0".into())]).into(),
        )]);
        let diff = diff_attributes(&old, &new).expect("expected a diff");
        let AttrDelta::Nested(nested) = &diff["style"] else {
            panic!("expected nested delta, got {:?}", diff["style"]);
        };
        assert_eq!(nested.len(), 1);
        assert_eq!(nested["color"], AttrDelta::Set("blue".into()));
    }

    #[test]
    fn map_replaced_by_primitive_is_set_wholesale() {
        let old = map(&[("style", map(&[("color", "red".into())]).into())]);
        let new = map(&[("style", "color: red".into())]);
        let diff = diff_attributes(&old, &new).expect("expected a diff");
        assert_eq!(diff["style"], AttrDelta::Set("color: red".into()));
    }

    #[test]
    fn opaque_values_compare_by_identity() {
        let shared = OpaqueValue::new(vec![1u8, 2, 3]);
        let same = map(&[("data", shared.clone().into())]);
        assert_eq!(diff_attributes(&same, &same.clone()), None);

        let other = map(&[("data", OpaqueValue::new(vec![1u8, 2, 3]).into())]);
        let diff = diff_attributes(&same, &other).expect("distinct allocations differ");
        assert!(matches!(diff["data"], AttrDelta::Set(AttrValue::Opaque(_))));
    }

    #[test]
    fn merge_nested_applies_deep_changes() {
        let previous: AttrValue = map(&[
            ("a", "1".into()),
            ("inner", map(&[("x", 1.into()), ("y", 2.into())]).into()),
        ])
        .into();
        let mut inner = AttrDiff::new();
        inner.insert("y".into(), AttrDelta::Removed);
        let mut diff = AttrDiff::new();
        diff.insert("a".into(), AttrDelta::Removed);
        diff.insert("inner".into(), AttrDelta::Nested(inner));
        let merged = merge_nested(Some(&previous), &diff);
        assert_eq!(
            merged,
            AttrValue::Map(map(&[("inner", map(&[("x", 1.into())]).into())]))
        );
    }
}
