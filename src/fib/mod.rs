//! The forwarding information base: one [ForwardingTable] per near
//! router.

pub mod config;
mod forwarding_table;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::export;
use crate::types::af::{CanonicalAddress, IPV6_BITS};
use crate::types::errors::FibError;
use crate::types::prefix_key::encode_network;
use crate::types::stats::FibStats;

pub use config::FibConfig;
pub use forwarding_table::ForwardingTable;

//------------ Fib -----------------------------------------------------------

/// Maps the address of a near router to the forwarding table built from
/// the observations made behind it.
///
/// Tables are created on the first insert for their near address, and
/// are never removed.
#[derive(Clone, Debug, Default)]
pub struct Fib {
    tables: HashMap<CanonicalAddress, ForwardingTable>,
    config: FibConfig,
}

impl Fib {
    pub fn new() -> Self {
        Self::with_config(FibConfig::default())
    }

    pub fn with_config(config: FibConfig) -> Self {
        Self {
            tables: HashMap::with_capacity(config.capacity),
            config,
        }
    }

    pub fn config(&self) -> &FibConfig {
        &self.config
    }

    /// The forwarding table of `near`, if anything was ever inserted for
    /// it. This never creates a table.
    pub fn get(
        &self,
        near: impl Into<CanonicalAddress>,
    ) -> Option<&ForwardingTable> {
        self.tables.get(&near.into())
    }

    /// Record that `next_hop` was seen behind `near` towards the network
    /// of `destination` with `prefix_len` bits.
    ///
    /// The table for `near` is created if it doesn't exist yet. If
    /// `prefix_len` is invalid for `destination` nothing is created and
    /// [FibError::InvalidPrefixLength] is returned.
    pub fn insert(
        &mut self,
        near: impl Into<CanonicalAddress>,
        destination: impl Into<CanonicalAddress>,
        prefix_len: u8,
        next_hop: impl Into<CanonicalAddress>,
    ) -> Result<(), FibError> {
        let key = encode_network(destination, prefix_len)?;
        let near = near.into();
        let table = match self.tables.entry(near) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!("new forwarding table for {}", near);
                entry.insert(ForwardingTable::new())
            }
        };
        table.insert_key(key, next_hop)
    }

    /// [Fib::insert] with the configured default prefix length.
    pub fn insert_default(
        &mut self,
        near: impl Into<CanonicalAddress>,
        destination: impl Into<CanonicalAddress>,
        next_hop: impl Into<CanonicalAddress>,
    ) -> Result<(), FibError> {
        let prefix_len = self.config.default_prefix_len;
        self.insert(near, destination, prefix_len, next_hop)
    }

    /// The number of near addresses.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// All near addresses with their tables, ordered by near address.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (CanonicalAddress, &ForwardingTable)> {
        let mut tables = self
            .tables
            .iter()
            .map(|(near, table)| (*near, table))
            .collect::<Vec<_>>();
        tables.sort_unstable_by_key(|(near, _)| *near);
        tables.into_iter()
    }

    pub fn stats(&self) -> FibStats {
        let mut stats = FibStats {
            tables: self.tables.len(),
            ..Default::default()
        };
        for table in self.tables.values() {
            stats.counters += &table.stats();
        }
        stats
    }

    /// Move all tables of `other` into self. The two FIBs must not share
    /// a near address; if they do, neither is modified and
    /// [FibError::InternalInconsistency] is returned.
    pub fn merge_disjoint(&mut self, other: Fib) -> Result<(), FibError> {
        if other.tables.keys().any(|near| self.tables.contains_key(near)) {
            return Err(FibError::InternalInconsistency(
                "near address owned by more than one shard",
            ));
        }
        self.tables.reserve(other.tables.len());
        self.tables.extend(other.tables);
        Ok(())
    }

    /// The per near address summary, see [export::write_summary]. Fails
    /// with [FibError::InvalidPrefixLength] if `postfix_len` is 128 or
    /// more.
    pub fn to_ip_info(&self, postfix_len: u8) -> Result<String, FibError> {
        if postfix_len >= IPV6_BITS {
            return Err(FibError::InvalidPrefixLength {
                len: postfix_len,
                max: IPV6_BITS - 1,
            });
        }
        let mut buf = Vec::new();
        export::write_summary(self, postfix_len, &mut buf).map_err(|_| {
            FibError::InternalInconsistency("export to memory failed")
        })?;
        into_string(buf)
    }

    /// All (near, prefix, next hop) triples, see [export::write_csv].
    pub fn to_csv(&self) -> Result<String, FibError> {
        let mut buf = Vec::new();
        export::write_csv(self, &mut buf).map_err(|_| {
            FibError::InternalInconsistency("export to memory failed")
        })?;
        into_string(buf)
    }

    /// The human readable dump, the same as the `Display` output.
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
}

fn into_string(buf: Vec<u8>) -> Result<String, FibError> {
    String::from_utf8(buf).map_err(|_| {
        FibError::InternalInconsistency("export produced invalid UTF-8")
    })
}

impl fmt::Display for Fib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (near, table) in self.iter() {
            writeln!(f, "{}:", near)?;
            write!(f, "{}", table)?;
        }
        Ok(())
    }
}
