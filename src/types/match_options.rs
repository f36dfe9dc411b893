use std::fmt;

use inetnum::addr::Prefix;

use crate::types::next_hop_set::NextHopSet;
use crate::types::prefix_key::PrefixKey;

//------------ MatchType -----------------------------------------------------

/// Option to set the match type for a prefix query on a forwarding table.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MatchType {
    /// Only return the requested prefix, and its next hops, if that exact
    /// prefix is stored.
    ExactMatch,
    /// Return the longest stored prefix that covers the requested prefix
    /// (if any). May match the prefix exactly.
    LongestMatch,
    /// Nothing matched.
    EmptyMatch,
}

impl MatchType {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::EmptyMatch)
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatchType::ExactMatch => write!(f, "exact-match"),
            MatchType::LongestMatch => write!(f, "longest-match"),
            MatchType::EmptyMatch => write!(f, "empty-match"),
        }
    }
}

//------------ Route ---------------------------------------------------------

/// A stored prefix together with its next hops, borrowed from a
/// forwarding table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route<'a> {
    pub key: PrefixKey,
    pub next_hops: &'a NextHopSet,
}

impl Route<'_> {
    /// The prefix in its native family.
    pub fn prefix(&self) -> Prefix {
        self.key.to_prefix()
    }
}

impl fmt::Display for Route<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {}", self.prefix(), self.next_hops)
    }
}

//------------- QueryResult -------------------------------------------------

/// The result of [match_prefix](crate::ForwardingTable::match_prefix).
///
/// `match_type` is the type of match that was actually found, which can be
/// `ExactMatch` for a longest-match query that hit the prefix itself, or
/// `EmptyMatch` when nothing matched.
#[derive(Clone, Debug)]
pub struct QueryResult<'a> {
    pub match_type: MatchType,
    pub prefix: Option<Prefix>,
    pub next_hops: Option<&'a NextHopSet>,
}

impl QueryResult<'_> {
    pub fn empty() -> Self {
        QueryResult {
            match_type: MatchType::EmptyMatch,
            prefix: None,
            next_hops: None,
        }
    }
}

impl fmt::Display for QueryResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let pfx_str = match self.prefix {
            Some(pfx) => format!("{}", pfx),
            None => "".to_string(),
        };
        writeln!(f, "match_type: {}", self.match_type)?;
        writeln!(f, "prefix: {}", pfx_str)?;
        match self.next_hops {
            Some(hops) => writeln!(f, "next_hops: {}", hops),
            None => writeln!(f, "next_hops: {{}}"),
        }
    }
}
