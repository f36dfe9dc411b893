#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

//! A library that builds Forwarding Information Bases (FIBs) from
//! traceroute link observations.
//!
//! Every observation says that a probe towards some destination went
//! through a *near* router and then through a *far* router. Collected per
//! near router, and keyed by the network of the destination, these
//! observations form a forwarding table: for every destination network the
//! set of next hops that were seen for it. With load balancing in the
//! network that set can hold more than one address.
//!
//! The main data structures are:
//!
//! * [PrefixKey], a bit-string key that puts IPv4 and IPv6 networks in
//!   one 128 bit key space. IPv4 is stored IPv4-mapped, with 96 bits
//!   added to the prefix length, so that the families never overlap.
//! * [ForwardingTable], a compressed binary trie over those keys that
//!   does longest-prefix matching.
//! * [Fib], which maps near router addresses to their forwarding tables.
//!
//! The [ingest] module reads CSV observations into a [Fib] through a
//! bounded queue, and [export] writes a [Fib] out as CSV or text.
//!
//! ```
//! use std::net::Ipv4Addr;
//! use routeinfo::Fib;
//!
//! let mut fib = Fib::new();
//! let near = Ipv4Addr::new(192, 0, 2, 1);
//! fib.insert(near, Ipv4Addr::new(203, 0, 113, 5), 24,
//!            Ipv4Addr::new(198, 51, 100, 9)).unwrap();
//!
//! let next_hops = fib
//!     .get(near)
//!     .and_then(|ft| ft.lookup(Ipv4Addr::new(203, 0, 113, 200)))
//!     .unwrap();
//! assert!(next_hops.contains(Ipv4Addr::new(198, 51, 100, 9)));
//! ```
mod trie;
mod types;

pub mod export;
pub mod fib;
pub mod ingest;

// re-exports
pub use inetnum::addr;

// Public Interfaces on the root of the crate

/// Address and key encoding
pub use types::{
    decode_key, encode_address, encode_network, is_ipv4_mapped,
    CanonicalAddress, PrefixKey,
};

/// The deduplicated next hops of one destination network
pub use types::NextHopSet;

/// Types used to create match queries on a forwarding table
pub use types::match_options::{MatchType, QueryResult, Route};

/// Error types returned by the FIB
pub use types::errors;
pub use types::errors::FibError;

/// Statistics for forwarding tables and FIBs
pub use types::stats;
pub use types::stats::{Counters, FibStats};

pub use fib::{Fib, FibConfig, ForwardingTable};

/// The arena trie the forwarding tables are built on
pub use trie::BinaryTrie;
