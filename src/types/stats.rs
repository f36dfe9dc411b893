//------------ Types for Statistics -----------------------------------------

use std::fmt;

use crate::types::af::IPV6_BITS;

//------------ Counters -----------------------------------------------------
//
// This is the struct that's part of every forwarding table. Tables are
// written by a single owner, so plain integers will do.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counters {
    // number of nodes in the trie arena, including the root.
    nodes: usize,
    // number of distinct prefixes per key length (0..=128).
    prefixes: [usize; IPV6_BITS as usize + 1],
    // number of (prefix, next hop) pairs.
    next_hops: usize,
}

impl Counters {
    pub fn nodes_count(&self) -> usize {
        self.nodes
    }

    pub(crate) fn set_nodes_count(&mut self, nodes: usize) {
        self.nodes = nodes;
    }

    /// The number of distinct prefixes per key length. IPv4 prefixes are
    /// counted at their key length, i.e. their native length plus 96.
    pub fn prefixes_count(&self) -> &[usize] {
        &self.prefixes
    }

    pub fn prefixes_total(&self) -> usize {
        self.prefixes.iter().sum()
    }

    pub(crate) fn inc_prefixes_count(&mut self, len: u8) {
        if let Some(p) = self.prefixes.get_mut(len as usize) {
            *p += 1;
        }
    }

    pub fn next_hops_count(&self) -> usize {
        self.next_hops
    }

    pub(crate) fn inc_next_hops_count(&mut self) {
        self.next_hops += 1;
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            nodes: 0,
            prefixes: [0; IPV6_BITS as usize + 1],
            next_hops: 0,
        }
    }
}

impl std::ops::AddAssign<&Counters> for Counters {
    fn add_assign(&mut self, rhs: &Counters) {
        self.nodes += rhs.nodes;
        self.next_hops += rhs.next_hops;
        for (l, r) in self.prefixes.iter_mut().zip(rhs.prefixes.iter()) {
            *l += r;
        }
    }
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nodes:\t\t{}", self.nodes)?;
        writeln!(f, "prefixes:\t{}", self.prefixes_total())?;
        writeln!(f, "next hops:\t{}", self.next_hops)?;
        for (len, count) in self.prefixes.iter().enumerate() {
            if *count > 0 {
                writeln!(f, "  /{} (key):\t{}", len, count)?;
            }
        }
        Ok(())
    }
}

//------------ FibStats -----------------------------------------------------

/// Totals over all forwarding tables of a FIB.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FibStats {
    pub tables: usize,
    pub counters: Counters,
}

impl fmt::Display for FibStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "forwarding tables:\t{}", self.tables)?;
        write!(f, "{}", self.counters)
    }
}
