//! A compressed binary trie (PATRICIA style) over [PrefixKey]s.
//!
//! Every node carries the full key of the bit-prefix it stands for, up to
//! two children, and optionally a value. A node without a value only
//! exists where two subtrees branch off, so the number of nodes is at
//! most twice the number of stored keys, whatever the key lengths are.
//!
//! Nodes live in an arena (a `Vec`), and refer to their children by
//! index. The root is always at index 0 and carries the empty key. Values
//! are kept in a second arena, so that nodes stay small and fixed-size.
//!
//! Lookups walk down from the root, comparing the stored key of each
//! visited node against the search key. A node is entered only if its key
//! is a bit-prefix of the search key, which makes longest-prefix matching
//! a matter of remembering the last node with a value on the way down.

// Node ids are only ever minted by `BinaryTrie::alloc_node`, and nodes are
// never removed, so indexing into the arenas can't go out of bounds.
#![allow(clippy::indexing_slicing)]

mod iterators;

use std::num::NonZeroU32;

use log::trace;

use crate::types::errors::FibError;
use crate::types::prefix_key::PrefixKey;

pub use iterators::Iter;

const ROOT: usize = 0;

// The arenas are addressed with u32 ids.
const MAX_NODES: usize = u32::MAX as usize - 1;
const MAX_VALUES: usize = u32::MAX as usize;

//------------ NodeId --------------------------------------------------------

// One-based index of a node in the arena, so that `Option<NodeId>` fits in
// four bytes. The root is never a child, so it doesn't need an id.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct NodeId(NonZeroU32);

impl NodeId {
    fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index + 1)
            .ok()
            .and_then(NonZeroU32::new)
            .map(NodeId)
    }

    pub(crate) fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

//------------ Node ----------------------------------------------------------

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) key: PrefixKey,
    pub(crate) children: [Option<NodeId>; 2],
    pub(crate) value: Option<u32>,
}

impl Node {
    fn new(key: PrefixKey) -> Self {
        Self {
            key,
            children: [None, None],
            value: None,
        }
    }
}

//------------ BinaryTrie ----------------------------------------------------

/// A longest-prefix-match map from [PrefixKey] to `V`.
#[derive(Clone, Debug)]
pub struct BinaryTrie<V> {
    nodes: Vec<Node>,
    values: Vec<V>,
}

impl<V> Default for BinaryTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> BinaryTrie<V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a trie with room for `keys` keys before reallocating.
    pub fn with_capacity(keys: usize) -> Self {
        let mut nodes = Vec::with_capacity(keys.saturating_mul(2) + 1);
        nodes.push(Node::new(PrefixKey::EMPTY));
        Self {
            nodes,
            values: Vec::with_capacity(keys),
        }
    }

    /// The number of stored keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The number of nodes in the arena, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub(crate) fn value(&self, id: u32) -> Option<&V> {
        self.values.get(id as usize)
    }

    fn alloc_node(&mut self, key: PrefixKey) -> Result<NodeId, FibError> {
        let id = NodeId::from_index(self.nodes.len()).ok_or(
            FibError::InternalInconsistency("trie arena exhausted"),
        )?;
        self.nodes.push(Node::new(key));
        Ok(id)
    }

    fn attach_value<F: FnOnce() -> V>(
        &mut self,
        index: usize,
        f: F,
    ) -> (&mut V, bool) {
        let existing = self.nodes[index].value;
        match existing {
            Some(id) => (&mut self.values[id as usize], false),
            None => {
                let id = self.values.len();
                self.values.push(f());
                self.nodes[index].value = Some(id as u32);
                (&mut self.values[id], true)
            }
        }
    }

    /// Return the value stored at exactly `key`, creating it with `f` if
    /// it isn't there yet. The returned flag is true if the value was
    /// created.
    ///
    /// This fails only when the arena has run out of ids, in which case
    /// the trie is left untouched.
    pub fn get_or_insert_with<F: FnOnce() -> V>(
        &mut self,
        key: PrefixKey,
        f: F,
    ) -> Result<(&mut V, bool), FibError> {
        // An insert creates at most two nodes and one value. Check for room
        // first, so that a failing insert doesn't leave half a split.
        if self.nodes.len() + 2 > MAX_NODES
            || self.values.len() + 1 > MAX_VALUES
        {
            return Err(FibError::InternalInconsistency(
                "trie arena exhausted",
            ));
        }

        // Invariant: the key of `cur` is a bit-prefix of `key`.
        let mut cur = ROOT;
        loop {
            let cur_len = self.nodes[cur].key.len();
            if cur_len == key.len() {
                return Ok(self.attach_value(cur, f));
            }

            let bit = key.bit(cur_len);
            let Some(child) = self.nodes[cur].children[bit] else {
                let leaf = self.alloc_node(key)?;
                self.nodes[cur].children[bit] = Some(leaf);
                return Ok(self.attach_value(leaf.index(), f));
            };

            let child_key = self.nodes[child.index()].key;
            let common = child_key.common_prefix_len(&key);
            if common == child_key.len() {
                cur = child.index();
                continue;
            }

            // The child's key runs past the point where it parts ways with
            // `key`, so a node at `common` bits has to be spliced in.
            if common == key.len() {
                trace!("splice {} above {}", key, child_key);
                let mid = self.alloc_node(key)?;
                self.nodes[mid.index()].children[child_key.bit(common)] =
                    Some(child);
                self.nodes[cur].children[bit] = Some(mid);
                return Ok(self.attach_value(mid.index(), f));
            }

            trace!("branch {} and {} at bit {}", child_key, key, common);
            let branch = self.alloc_node(key.truncate(common))?;
            let leaf = self.alloc_node(key)?;
            self.nodes[branch.index()].children[child_key.bit(common)] =
                Some(child);
            self.nodes[branch.index()].children[key.bit(common)] = Some(leaf);
            self.nodes[cur].children[bit] = Some(branch);
            return Ok(self.attach_value(leaf.index(), f));
        }
    }

    fn find_node(&self, key: &PrefixKey) -> Option<usize> {
        let mut cur = ROOT;
        loop {
            let node = &self.nodes[cur];
            if node.key.len() >= key.len() {
                return (node.key == *key).then_some(cur);
            }
            let child = node.children[key.bit(node.key.len())]?;
            if !self.nodes[child.index()].key.is_prefix_of(key) {
                return None;
            }
            cur = child.index();
        }
    }

    /// The value stored at exactly `key`.
    pub fn get(&self, key: &PrefixKey) -> Option<&V> {
        let index = self.find_node(key)?;
        let id = self.nodes[index].value?;
        self.values.get(id as usize)
    }

    pub fn get_mut(&mut self, key: &PrefixKey) -> Option<&mut V> {
        let index = self.find_node(key)?;
        let id = self.nodes[index].value?;
        self.values.get_mut(id as usize)
    }

    pub fn contains_key(&self, key: &PrefixKey) -> bool {
        self.get(key).is_some()
    }

    /// The stored key with the greatest length that is a bit-prefix of
    /// `key` (this includes `key` itself), with its value.
    pub fn longest_match(&self, key: &PrefixKey) -> Option<(PrefixKey, &V)> {
        let mut best = None;
        let mut cur = ROOT;
        loop {
            let node = &self.nodes[cur];
            if let Some(id) = node.value {
                best = Some((node.key, id));
            }
            if node.key.len() >= key.len() {
                break;
            }
            let Some(child) = node.children[key.bit(node.key.len())] else {
                break;
            };
            if !self.nodes[child.index()].key.is_prefix_of(key) {
                break;
            }
            cur = child.index();
        }
        best.map(|(k, id)| (k, &self.values[id as usize]))
    }

    // The topmost node whose key has `prefix` as a bit-prefix.
    fn subtree_root(&self, prefix: &PrefixKey) -> Option<usize> {
        let mut cur = ROOT;
        loop {
            let node = &self.nodes[cur];
            if prefix.is_prefix_of(&node.key) {
                return Some(cur);
            }
            let child = node.children[prefix.bit(node.key.len())]?;
            let child_key = &self.nodes[child.index()].key;
            if !prefix.is_prefix_of(child_key)
                && !child_key.is_prefix_of(prefix)
            {
                return None;
            }
            cur = child.index();
        }
    }

    /// All stored keys with their values, in pre-order: a key comes before
    /// its more-specifics, a 0 bit before a 1 bit.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self, Some(ROOT))
    }

    /// All stored keys that have `prefix` as a bit-prefix (including
    /// `prefix` itself), in the same order as [BinaryTrie::iter].
    pub fn iter_prefix(&self, prefix: &PrefixKey) -> Iter<'_, V> {
        Iter::new(self, self.subtree_root(prefix))
    }

    /// Call `visitor` for every stored key under `prefix`; an empty prefix
    /// visits the whole trie.
    pub fn for_each<F>(&self, prefix: &PrefixKey, mut visitor: F)
    where
        F: FnMut(&PrefixKey, &V),
    {
        for (key, value) in self.iter_prefix(prefix) {
            visitor(&key, value);
        }
    }

    /// Walk the whole arena and verify the structural invariants of the
    /// compressed trie.
    pub fn check_invariants(&self) -> Result<(), FibError> {
        if !self.nodes[ROOT].key.is_empty() {
            return Err(FibError::InternalInconsistency(
                "root node carries a non-empty key",
            ));
        }

        let mut seen_nodes = 0;
        let mut seen_values = 0;
        let mut stack = vec![ROOT];
        while let Some(index) = stack.pop() {
            let node = self.nodes.get(index).ok_or(
                FibError::InternalInconsistency("dangling child reference"),
            )?;
            seen_nodes += 1;

            if let Some(id) = node.value {
                if id as usize >= self.values.len() {
                    return Err(FibError::InternalInconsistency(
                        "dangling value reference",
                    ));
                }
                seen_values += 1;
            } else if index != ROOT
                && node.children.iter().flatten().count() < 2
            {
                return Err(FibError::InternalInconsistency(
                    "inner node without value has less than two children",
                ));
            }

            for (bit, child) in node.children.iter().enumerate() {
                let Some(child) = child else {
                    continue;
                };
                let child_key = self
                    .nodes
                    .get(child.index())
                    .ok_or(FibError::InternalInconsistency(
                        "dangling child reference",
                    ))?
                    .key;
                if child_key.len() <= node.key.len()
                    || !node.key.is_prefix_of(&child_key)
                    || child_key.bit(node.key.len()) != bit
                {
                    return Err(FibError::InternalInconsistency(
                        "child key does not extend its parent key",
                    ));
                }
                stack.push(child.index());
            }
        }

        if seen_nodes != self.nodes.len() || seen_values != self.values.len()
        {
            return Err(FibError::InternalInconsistency(
                "unreachable nodes or values in the arena",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    fn key(s: &str) -> PrefixKey {
        PrefixKey::from_bit_str(s).unwrap()
    }

    #[test]
    fn test_insert_splits_and_splices() -> Result<(), Box<dyn Error>> {
        let mut trie = BinaryTrie::<u32>::new();

        *trie.get_or_insert_with(key("1010"), || 0)?.0 += 1;
        *trie.get_or_insert_with(key("1001"), || 0)?.0 += 2;
        // lands on the branch node that was created by the two above
        *trie.get_or_insert_with(key("10"), || 0)?.0 += 3;
        // spliced in above "1010"
        *trie.get_or_insert_with(key("101"), || 0)?.0 += 4;

        assert_eq!(trie.len(), 4);
        assert_eq!(trie.get(&key("1010")), Some(&1));
        assert_eq!(trie.get(&key("1001")), Some(&2));
        assert_eq!(trie.get(&key("10")), Some(&3));
        assert_eq!(trie.get(&key("101")), Some(&4));
        assert_eq!(trie.get(&key("100")), None);
        assert_eq!(trie.get(&key("1")), None);
        // root, "10", "1010", "1001", "101"
        assert_eq!(trie.node_count(), 5);
        trie.check_invariants()?;
        Ok(())
    }

    #[test]
    fn test_insert_existing_key_reuses_value() -> Result<(), Box<dyn Error>>
    {
        let mut trie = BinaryTrie::<Vec<u8>>::new();
        let (v, created) = trie.get_or_insert_with(key("0110"), Vec::new)?;
        v.push(1);
        assert!(created);
        let (v, created) = trie.get_or_insert_with(key("0110"), Vec::new)?;
        v.push(2);
        assert!(!created);
        assert_eq!(trie.get(&key("0110")), Some(&vec![1, 2]));
        assert_eq!(trie.len(), 1);
        Ok(())
    }

    #[test]
    fn test_longest_match() -> Result<(), Box<dyn Error>> {
        let mut trie = BinaryTrie::<&str>::new();
        trie.get_or_insert_with(key("1"), || "a")?;
        trie.get_or_insert_with(key("1100"), || "b")?;
        trie.get_or_insert_with(key("110011"), || "c")?;

        let full = key("11001111");
        assert_eq!(trie.longest_match(&full), Some((key("110011"), &"c")));
        let other = key("11000000");
        assert_eq!(trie.longest_match(&other), Some((key("1100"), &"b")));
        let far = key("10000000");
        assert_eq!(trie.longest_match(&far), Some((key("1"), &"a")));
        assert_eq!(trie.longest_match(&key("0")), None);
        Ok(())
    }

    #[test]
    fn test_empty_key_matches_everything() -> Result<(), Box<dyn Error>> {
        let mut trie = BinaryTrie::<u8>::new();
        assert_eq!(trie.longest_match(&key("0101")), None);
        trie.get_or_insert_with(PrefixKey::EMPTY, || 7)?;
        assert_eq!(
            trie.longest_match(&key("0101")),
            Some((PrefixKey::EMPTY, &7))
        );
        assert_eq!(trie.node_count(), 1);
        Ok(())
    }

    #[test]
    fn test_pre_order_iteration() -> Result<(), Box<dyn Error>> {
        let mut trie = BinaryTrie::<u8>::new();
        for (i, k) in ["11", "0", "01", "1", "00", "10"].iter().enumerate() {
            trie.get_or_insert_with(key(k), || i as u8)?;
        }
        let keys = trie.iter().map(|(k, _)| k.to_string()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["0", "00", "01", "1", "10", "11"]);

        let under = trie
            .iter_prefix(&key("1"))
            .map(|(k, _)| k.to_string())
            .collect::<Vec<_>>();
        assert_eq!(under, vec!["1", "10", "11"]);
        assert_eq!(trie.iter_prefix(&key("111")).count(), 0);
        Ok(())
    }

    #[test]
    fn test_subtree_below_branch_node() -> Result<(), Box<dyn Error>> {
        let mut trie = BinaryTrie::<u8>::new();
        trie.get_or_insert_with(key("101100"), || 1)?;
        trie.get_or_insert_with(key("101111"), || 2)?;

        // "1011" is a branch node without value, "10" sits above it.
        let mut seen = vec![];
        trie.for_each(&key("10"), |k, v| seen.push((k.to_string(), *v)));
        assert_eq!(
            seen,
            vec![("101100".to_string(), 1), ("101111".to_string(), 2)]
        );
        assert_eq!(trie.iter_prefix(&key("10111")).count(), 1);
        assert_eq!(trie.iter_prefix(&key("100")).count(), 0);
        Ok(())
    }
}
