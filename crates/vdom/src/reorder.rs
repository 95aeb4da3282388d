//! Keyed child-list reconciliation.
//!
//! Produces two things from an old and a new child list:
//! - a *projection*: the new children laid out in old-child order (a `None`
//!   marks an old child to delete), followed by children that did not exist
//!   before. Positional sub-diffing walks old children against this list.
//! - a key-addressed move list that turns the projected order into the new
//!   order on the host. Moves name children by key, not index, because every
//!   removal shifts the positions of the siblings after it.
//!
//! A key that occurs more than once in either list is treated as absent on
//! both sides. Unkeyed children are matched by position among unkeyed
//! children and never appear in moves except as plain removals.
//!
//! Complexity: O(n + m) for the projection; the move pass is greedy and can
//! be quadratic in the number of out-of-place keys. It is not move-minimal.

use crate::node::Node;
use crate::patch::{Insertion, Moves, Removal};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug)]
pub struct Reordered {
    pub projected: Vec<Option<Node>>,
    pub moves: Option<Moves>,
    pub duplicate_keys: Option<BTreeSet<String>>,
    /// Keys present in the new list only, in new-list order.
    pub new_keys: Option<Vec<String>>,
}

pub fn reorder(old: &[Node], new: &[Node]) -> Reordered {
    let duplicates = duplicate_keys(old, new);
    let keys = KeyFilter {
        duplicates: &duplicates,
    };

    let new_index = KeyIndex::build(new, &keys);
    let duplicate_keys = (!duplicates.is_empty()).then(|| duplicates.clone());

    if new_index.free.len() == new.len() {
        return positional(new, duplicate_keys);
    }
    let old_index = KeyIndex::build(old, &keys);
    if old_index.free.len() == old.len() {
        return positional(new, duplicate_keys);
    }

    let mut projected = Vec::with_capacity(old.len().max(new.len()));
    let mut free_cursor = 0usize;
    let mut deleted = 0usize;

    for child in old {
        let placed = match keys.of(child) {
            Some(key) => new_index.keys.get(key).map(|&at| new[at].clone()),
            None => {
                let slot = new_index.free.get(free_cursor).map(|&at| new[at].clone());
                if slot.is_some() {
                    free_cursor += 1;
                }
                slot
            }
        };
        if placed.is_none() {
            deleted += 1;
        }
        projected.push(placed);
    }

    let last_free = new_index
        .free
        .get(free_cursor)
        .copied()
        .unwrap_or(new.len());
    let mut new_keys = Vec::new();
    for (at, child) in new.iter().enumerate() {
        match keys.of(child) {
            Some(key) => {
                if !old_index.keys.contains_key(key) {
                    new_keys.push(key.to_owned());
                    projected.push(Some(child.clone()));
                }
            }
            None => {
                if at >= last_free {
                    projected.push(Some(child.clone()));
                }
            }
        }
    }

    let moves = compute_moves(&projected, new, &new_index, &keys, deleted);
    log::trace!(
        target: "vdom.reorder",
        "projected {} -> {} children, deleted {deleted}, moves: {}",
        old.len(),
        projected.len(),
        moves.as_ref().map_or(0, |m| m.removals.len() + m.insertions.len())
    );

    Reordered {
        projected,
        moves,
        duplicate_keys,
        new_keys: (!new_keys.is_empty()).then_some(new_keys),
    }
}

fn positional(new: &[Node], duplicate_keys: Option<BTreeSet<String>>) -> Reordered {
    Reordered {
        projected: new.iter().cloned().map(Some).collect(),
        moves: None,
        duplicate_keys,
        new_keys: None,
    }
}

/// A slot in the simulated live list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot<'a> {
    Deleted,
    Item(Option<&'a str>),
}

impl<'a> Slot<'a> {
    fn key(self) -> Option<&'a str> {
        match self {
            Slot::Deleted => None,
            Slot::Item(key) => key,
        }
    }
}

fn compute_moves<'a>(
    projected: &'a [Option<Node>],
    new: &'a [Node],
    new_index: &KeyIndex<'a>,
    keys: &KeyFilter<'_>,
    deleted: usize,
) -> Option<Moves> {
    let mut simulate: Vec<Slot<'a>> = projected
        .iter()
        .map(|slot| match slot {
            Some(node) => Slot::Item(keys.of(node)),
            None => Slot::Deleted,
        })
        .collect();
    let mut moves = Moves::default();
    let mut cursor = 0usize;
    let mut wanted_at = 0usize;

    while wanted_at < new.len() {
        let wanted = keys.of(&new[wanted_at]);

        while simulate.get(cursor) == Some(&Slot::Deleted) {
            moves.removals.push(remove(&mut simulate, cursor, None));
        }

        let current = simulate.get(cursor).copied().map(Slot::key);
        if current == Some(wanted) {
            cursor += 1;
            wanted_at += 1;
            continue;
        }

        match (wanted, current) {
            (Some(wanted_key), Some(Some(current_key))) => {
                // An insert before `current` only helps if it then lands in
                // the very next wanted slot; otherwise move it out of the way.
                if new_index.keys.get(current_key) != Some(&(wanted_at + 1)) {
                    moves
                        .removals
                        .push(remove(&mut simulate, cursor, Some(current_key)));
                    let next = simulate.get(cursor).copied().map(Slot::key);
                    if next == Some(Some(wanted_key)) {
                        cursor += 1;
                    } else {
                        moves.insertions.push(Insertion {
                            to: wanted_at,
                            key: wanted_key.to_owned(),
                        });
                    }
                } else {
                    moves.insertions.push(Insertion {
                        to: wanted_at,
                        key: wanted_key.to_owned(),
                    });
                }
                wanted_at += 1;
            }
            (Some(wanted_key), _) => {
                moves.insertions.push(Insertion {
                    to: wanted_at,
                    key: wanted_key.to_owned(),
                });
                wanted_at += 1;
            }
            (None, Some(Some(current_key))) => {
                moves
                    .removals
                    .push(remove(&mut simulate, cursor, Some(current_key)));
            }
            (None, _) => {
                // Unkeyed slots match by position; nothing to move.
                wanted_at += 1;
            }
        }
    }

    while cursor < simulate.len() {
        let key = simulate[cursor].key();
        moves.removals.push(remove(&mut simulate, cursor, key));
    }

    if moves.removals.len() == deleted && moves.insertions.is_empty() {
        return None;
    }
    Some(moves)
}

fn remove(simulate: &mut Vec<Slot<'_>>, at: usize, key: Option<&str>) -> Removal {
    simulate.remove(at);
    Removal {
        from: at,
        key: key.map(str::to_owned),
    }
}

struct KeyFilter<'d> {
    duplicates: &'d BTreeSet<String>,
}

impl KeyFilter<'_> {
    /// The key used for matching, or `None` for unkeyed and duplicated keys.
    fn of<'n>(&self, node: &'n Node) -> Option<&'n str> {
        node.key().filter(|key| !self.duplicates.contains(*key))
    }
}

struct KeyIndex<'a> {
    keys: HashMap<&'a str, usize>,
    free: Vec<usize>,
}

impl<'a> KeyIndex<'a> {
    fn build(children: &'a [Node], keys: &KeyFilter<'_>) -> Self {
        let mut index = KeyIndex {
            keys: HashMap::with_capacity(children.len()),
            free: Vec::new(),
        };
        for (at, child) in children.iter().enumerate() {
            match keys.of(child) {
                Some(key) => {
                    index.keys.insert(key, at);
                }
                None => index.free.push(at),
            }
        }
        index
    }
}

fn duplicate_keys(old: &[Node], new: &[Node]) -> BTreeSet<String> {
    let mut duplicates = BTreeSet::new();
    for children in [old, new] {
        let mut seen = BTreeSet::new();
        for key in children.iter().filter_map(Node::key) {
            if !seen.insert(key) {
                duplicates.insert(key.to_owned());
            }
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str) -> Node {
        Node::element("li").key(key).child(key).build()
    }

    fn keyed(keys: &[&str]) -> Vec<Node> {
        keys.iter().map(|key| item(key)).collect()
    }

    fn projected_keys(reordered: &Reordered) -> Vec<Option<&str>> {
        reordered
            .projected
            .iter()
            .map(|slot| slot.as_ref().and_then(Node::key))
            .collect()
    }

    /// Replays moves on a list of keys the way a host applies them.
    fn replay(mut live: Vec<Option<String>>, moves: &Moves) -> Vec<Option<String>> {
        let mut removed = HashMap::new();
        for removal in &moves.removals {
            let node = live.remove(removal.from);
            if let Some(key) = &removal.key {
                removed.insert(key.clone(), node);
            }
        }
        for insertion in &moves.insertions {
            let node = removed
                .remove(&insertion.key)
                .expect("insertion key was removed first");
            let at = insertion.to.min(live.len());
            live.insert(at, node);
        }
        live
    }

    fn assert_reorders_to(old: &[&str], new: &[&str]) {
        let reordered = reorder(&keyed(old), &keyed(new));
        let live: Vec<Option<String>> = reordered
            .projected
            .iter()
            .zip(old.iter().map(Some).chain(std::iter::repeat(None)))
            .map(|(slot, old_key)| match slot {
                Some(node) => node.key().map(str::to_owned),
                None => old_key.map(|key| key.to_string()),
            })
            .collect();
        let moves = reordered.moves.clone().unwrap_or_default();
        let mut result = replay(live, &moves);
        // Deleted children left behind without moves are removed by their own patch.
        result.retain(|key| key.as_deref().is_some_and(|key| new.contains(&key)));
        let expected: Vec<Option<String>> = new.iter().map(|k| Some(k.to_string())).collect();
        assert_eq!(result, expected, "old={old:?} new={new:?}");
    }

    #[test]
    fn unkeyed_lists_take_the_positional_fast_path() {
        let old = vec![Node::text("a"), Node::text("b")];
        let new = vec![Node::text("b"), Node::text("a"), Node::text("c")];
        let reordered = reorder(&old, &new);
        assert!(reordered.moves.is_none());
        assert_eq!(reordered.projected.len(), 3);
        assert!(reordered.projected.iter().all(Option::is_some));

        let reordered = reorder(&old, &keyed(&["x", "y"]));
        assert!(reordered.moves.is_none());
    }

    #[test]
    fn projection_places_new_children_in_old_order() {
        let reordered = reorder(&keyed(&["a", "b", "c"]), &keyed(&["c", "a", "d"]));
        assert_eq!(
            projected_keys(&reordered),
            [Some("a"), None, Some("c"), Some("d")]
        );
        assert_eq!(reordered.new_keys, Some(vec!["d".to_owned()]));
        assert!(reordered.moves.is_some());
    }

    #[test]
    fn swap_produces_key_addressed_moves() {
        let reordered = reorder(&keyed(&["a", "b"]), &keyed(&["b", "a"]));
        let moves = reordered.moves.expect("swap needs moves");
        // "a" already sits right before the next wanted key, so "b" is the one moved.
        assert_eq!(
            moves.removals,
            [Removal {
                from: 1,
                key: Some("b".to_owned())
            }]
        );
        assert_eq!(
            moves.insertions,
            [Insertion {
                to: 0,
                key: "b".to_owned()
            }]
        );
    }

    #[test]
    fn removals_and_appends_without_swaps_need_no_moves() {
        let reordered = reorder(&keyed(&["a", "b", "c"]), &keyed(&["a", "c"]));
        assert!(reordered.moves.is_none());
        assert_eq!(projected_keys(&reordered), [Some("a"), None, Some("c")]);

        let reordered = reorder(&keyed(&["a", "b"]), &keyed(&["a", "b", "c"]));
        assert!(reordered.moves.is_none());

        let reordered = reorder(&keyed(&["a", "b", "c"]), &keyed(&["b", "c", "d"]));
        assert!(reordered.moves.is_none());
    }

    #[test]
    fn arbitrary_permutations_land_in_order() {
        assert_reorders_to(&["a", "b", "c", "d"], &["d", "c", "b", "a"]);
        assert_reorders_to(&["a", "b", "c", "d", "e"], &["b", "d", "a", "e", "c"]);
        assert_reorders_to(&["a", "b", "c"], &["c", "x", "a"]);
        assert_reorders_to(&["a", "b", "c", "d"], &["e", "d", "f", "a"]);
        assert_reorders_to(&["a"], &["b", "c", "a"]);
        assert_reorders_to(&["a", "b", "c"], &["a", "c", "b"]);
    }

    #[test]
    fn duplicated_keys_degrade_to_unkeyed() {
        let old = keyed(&["x", "x", "x"]);
        let new = keyed(&["x", "x", "x"]);
        let reordered = reorder(&old, &new);
        let duplicates = reordered.duplicate_keys.expect("duplicates reported");
        assert!(duplicates.contains("x"));
        assert!(reordered.moves.is_none());
        assert_eq!(reordered.projected.len(), 3);
    }

    #[test]
    fn duplicates_do_not_hide_other_keys() {
        let old = keyed(&["a", "x", "x", "b"]);
        let new = keyed(&["b", "x", "a", "x"]);
        let reordered = reorder(&old, &new);
        assert_eq!(
            reordered.duplicate_keys.map(|keys| keys.into_iter().collect::<Vec<_>>()),
            Some(vec!["x".to_owned()])
        );
        assert!(reordered.moves.is_some());
    }

    #[test]
    fn mixed_keyed_and_unkeyed_children() {
        let old = vec![item("a"), Node::text("t1"), item("b")];
        let new = vec![item("b"), Node::text("t2"), item("a"), Node::text("t3")];
        let reordered = reorder(&old, &new);
        // "t1" is matched with the first free slot ("t2"); "t3" is appended.
        assert_eq!(reordered.projected.len(), 4);
        assert_eq!(
            reordered.projected[1].as_ref().and_then(Node::content),
            Some("t2")
        );
        assert_eq!(
            reordered.projected[3].as_ref().and_then(Node::content),
            Some("t3")
        );
        assert!(reordered.moves.is_some());
    }
}
