use crate::trie::BinaryTrie;
use crate::types::prefix_key::PrefixKey;

//------------ Iter ----------------------------------------------------------

// Depth-first, pre-order walk over the arena with an explicit stack. The
// 1-child is pushed before the 0-child, so that the 0-side comes out
// first. Only nodes that carry a value are yielded.
pub struct Iter<'a, V> {
    trie: &'a BinaryTrie<V>,
    stack: Vec<usize>,
}

impl<'a, V> Iter<'a, V> {
    pub(crate) fn new(trie: &'a BinaryTrie<V>, start: Option<usize>) -> Self {
        Self {
            trie,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (PrefixKey, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(index) = self.stack.pop() {
            let Some(node) = self.trie.node(index) else {
                continue;
            };
            for child in node.children.iter().rev().flatten() {
                self.stack.push(child.index());
            }
            if let Some(value) = node.value.and_then(|id| self.trie.value(id))
            {
                return Some((node.key, value));
            }
        }
        None
    }
}
