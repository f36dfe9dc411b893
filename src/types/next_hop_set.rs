use std::fmt;

use crate::types::af::CanonicalAddress;

//------------ NextHopSet ----------------------------------------------------

/// The distinct next-hop addresses seen for one destination prefix.
///
/// More than one entry means the near router load-balances (ECMP) towards
/// that prefix. The fan-out is small in practice, so membership is a
/// linear scan over a vector, which also keeps the entries in the order
/// they were first observed. Entries are never removed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NextHopSet(Vec<CanonicalAddress>);

impl NextHopSet {
    pub fn new() -> Self {
        Self(Vec::with_capacity(1))
    }

    /// Add `addr` unless an equal address is already present. Returns
    /// whether the set grew.
    pub fn add(&mut self, addr: impl Into<CanonicalAddress>) -> bool {
        let addr = addr.into();
        if self.contains(addr) {
            return false;
        }
        self.0.push(addr);
        true
    }

    pub fn contains(&self, addr: impl Into<CanonicalAddress>) -> bool {
        let addr = addr.into();
        self.0.iter().any(|a| *a == addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = CanonicalAddress> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add all addresses of `other` to self.
    pub fn extend(&mut self, other: &NextHopSet) {
        for addr in other.iter() {
            self.add(addr);
        }
    }

    pub fn as_slice(&self) -> &[CanonicalAddress] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a NextHopSet {
    type Item = &'a CanonicalAddress;
    type IntoIter = std::slice::Iter<'a, CanonicalAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<A: Into<CanonicalAddress>> FromIterator<A> for NextHopSet {
    fn from_iter<T: IntoIterator<Item = A>>(iter: T) -> Self {
        let mut set = NextHopSet::new();
        for addr in iter {
            set.add(addr);
        }
        set
    }
}

impl fmt::Display for NextHopSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, addr) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", addr)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for NextHopSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}
