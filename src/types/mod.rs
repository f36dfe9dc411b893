pub(crate) mod af;
pub(crate) mod match_options;
pub(crate) mod next_hop_set;
pub(crate) mod prefix_key;

pub mod errors;
pub mod stats;


pub use af::{is_ipv4_mapped, CanonicalAddress};
pub use next_hop_set::NextHopSet;
pub use prefix_key::{decode_key, encode_address, encode_network, PrefixKey};
