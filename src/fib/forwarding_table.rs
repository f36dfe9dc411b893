use std::fmt;

use inetnum::addr::Prefix;
use log::trace;

use crate::trie::BinaryTrie;
use crate::types::af::CanonicalAddress;
use crate::types::errors::FibError;
use crate::types::match_options::{MatchType, QueryResult, Route};
use crate::types::next_hop_set::NextHopSet;
use crate::types::prefix_key::{
    encode_address, encode_network, encode_prefix, PrefixKey,
};
use crate::types::stats::Counters;

//------------ ForwardingTable -----------------------------------------------

/// The forwarding table of one near router: a longest-prefix-match map
/// from destination networks to the next hops seen towards them.
///
/// Networks of both address families live in the same trie. IPv4 networks
/// are keyed in the IPv4-mapped part of the IPv6 space, so they can never
/// match an address of the other family.
#[derive(Clone, Debug, Default)]
pub struct ForwardingTable {
    trie: BinaryTrie<NextHopSet>,
    counters: Counters,
}

impl ForwardingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with room for `prefixes` destination networks.
    pub fn with_capacity(prefixes: usize) -> Self {
        Self {
            trie: BinaryTrie::with_capacity(prefixes),
            counters: Counters::default(),
        }
    }

    /// Record that `next_hop` was seen for the network of `network` with
    /// `prefix_len` bits. Host bits in `network` are ignored. A network
    /// seen before keeps its next hops, `next_hop` is added to them if it
    /// wasn't among them already.
    ///
    /// Fails with [FibError::InvalidPrefixLength] if `prefix_len` exceeds
    /// the width of the family of `network`, in which case the table is
    /// not modified.
    pub fn insert(
        &mut self,
        network: impl Into<CanonicalAddress>,
        prefix_len: u8,
        next_hop: impl Into<CanonicalAddress>,
    ) -> Result<(), FibError> {
        let key = encode_network(network, prefix_len)?;
        self.insert_key(key, next_hop)
    }

    pub(crate) fn insert_key(
        &mut self,
        key: PrefixKey,
        next_hop: impl Into<CanonicalAddress>,
    ) -> Result<(), FibError> {
        let (next_hops, created) =
            self.trie.get_or_insert_with(key, NextHopSet::new)?;
        if next_hops.add(next_hop) {
            self.counters.inc_next_hops_count();
        }
        if created {
            trace!("new prefix {}", key.to_prefix());
            self.counters.inc_prefixes_count(key.len());
        }
        Ok(())
    }

    /// The next hops stored for exactly the network of `network` with
    /// `prefix_len` bits, if that network was ever inserted.
    pub fn contains_exact(
        &self,
        network: impl Into<CanonicalAddress>,
        prefix_len: u8,
    ) -> Result<Option<&NextHopSet>, FibError> {
        let key = encode_network(network, prefix_len)?;
        Ok(self.trie.get(&key))
    }

    /// The next hops of the most specific stored network that contains
    /// `destination`.
    pub fn lookup(
        &self,
        destination: impl Into<CanonicalAddress>,
    ) -> Option<&NextHopSet> {
        self.longest_match(destination).map(|r| r.next_hops)
    }

    /// Like [ForwardingTable::lookup], but also returns the prefix that
    /// matched.
    pub fn longest_match(
        &self,
        destination: impl Into<CanonicalAddress>,
    ) -> Option<Route<'_>> {
        let key = encode_address(destination);
        self.trie
            .longest_match(&key)
            .map(|(key, next_hops)| Route { key, next_hops })
    }

    /// Query for a network instead of a single address. An `ExactMatch`
    /// query only returns the network itself, a `LongestMatch` query the
    /// most specific stored network that covers it.
    pub fn match_prefix(
        &self,
        search_pfx: &Prefix,
        match_type: MatchType,
    ) -> Result<QueryResult<'_>, FibError> {
        let key = encode_prefix(search_pfx)?;
        let found = match match_type {
            MatchType::ExactMatch => self.trie.get(&key).map(|v| (key, v)),
            MatchType::LongestMatch => self.trie.longest_match(&key),
            MatchType::EmptyMatch => None,
        };

        Ok(match found {
            Some((found_key, next_hops)) => QueryResult {
                match_type: if found_key == key {
                    MatchType::ExactMatch
                } else {
                    MatchType::LongestMatch
                },
                prefix: Some(found_key.to_prefix()),
                next_hops: Some(next_hops),
            },
            None => QueryResult::empty(),
        })
    }

    /// Visit every stored network under `prefix` (all of them for
    /// [PrefixKey::EMPTY]) in pre-order.
    pub fn for_each<F>(&self, prefix: &PrefixKey, mut visitor: F)
    where
        F: FnMut(Route<'_>),
    {
        self.trie.for_each(prefix, |key, next_hops| {
            visitor(Route {
                key: *key,
                next_hops,
            })
        });
    }

    /// All stored networks with their next hops, in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = Route<'_>> + '_ {
        self.trie
            .iter()
            .map(|(key, next_hops)| Route { key, next_hops })
    }

    /// The number of distinct destination networks.
    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.trie.node_count()
    }

    pub fn stats(&self) -> Counters {
        let mut counters = self.counters.clone();
        counters.set_nodes_count(self.trie.node_count());
        counters
    }

    /// Add all networks and next hops of `other` to self.
    pub fn merge(&mut self, other: &ForwardingTable) -> Result<(), FibError> {
        for route in other.iter() {
            for next_hop in route.next_hops.iter() {
                self.insert_key(route.key, next_hop)?;
            }
        }
        Ok(())
    }

    pub fn check_invariants(&self) -> Result<(), FibError> {
        self.trie.check_invariants()
    }
}

impl<'a> IntoIterator for &'a ForwardingTable {
    type Item = Route<'a>;
    type IntoIter = Box<dyn Iterator<Item = Route<'a>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl fmt::Display for ForwardingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for route in self.iter() {
            writeln!(f, "\t{}", route)?;
        }
        Ok(())
    }
}
