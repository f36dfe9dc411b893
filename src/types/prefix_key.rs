use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use inetnum::addr::Prefix;

use crate::types::af::{
    leading_mask, CanonicalAddress, IPV4_MAPPED_OFFSET, IPV6_BITS,
};
use crate::types::errors::FibError;

//------------ PrefixKey -----------------------------------------------------

// A prefix key is a bit string of 0 to 128 bits, most significant bit
// first, used as the key in the forwarding tables. The bits are kept
// left-aligned in a u128, and all bits past `len` are always zero, so two
// keys are equal iff their bit strings are equal and derived `Eq`/`Hash`
// can be used as is.
//
// IPv4 networks are keyed by their IPv4-mapped address, with the prefix
// length shifted by 96. An IPv4 /24 therefore has a 120 bit key, and can
// never collide with an IPv6 /24.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PrefixKey {
    bits: u128,
    len: u8,
}

impl PrefixKey {
    /// The zero-length key. It is a prefix of every other key.
    pub const EMPTY: PrefixKey = PrefixKey { bits: 0, len: 0 };

    /// Create a key from left-aligned bits and a length in bits. Bits past
    /// `len` are cleared. Fails with [FibError::InvalidKey] if `len`
    /// exceeds 128.
    pub fn new(bits: u128, len: u8) -> Result<Self, FibError> {
        if len > IPV6_BITS {
            return Err(FibError::InvalidKey(len as usize));
        }
        Ok(Self::new_masked(bits, len))
    }

    // `len` must be <= 128.
    pub(crate) fn new_masked(bits: u128, len: u8) -> Self {
        debug_assert!(len <= IPV6_BITS);
        Self {
            bits: bits & leading_mask(len),
            len,
        }
    }

    /// Parse a textual key made of '0' and '1' characters, as produced by
    /// the `Display` impl.
    pub fn from_bit_str(s: &str) -> Result<Self, FibError> {
        if s.len() > IPV6_BITS as usize {
            return Err(FibError::InvalidKey(s.len()));
        }
        let mut bits = 0_u128;
        for (i, c) in s.bytes().enumerate() {
            match c {
                b'0' => {}
                b'1' => bits |= 1 << (IPV6_BITS as usize - 1 - i),
                _ => return Err(FibError::InvalidKey(s.len())),
            }
        }
        Ok(Self::new_masked(bits, s.len() as u8))
    }

    pub fn bits(&self) -> u128 {
        self.bits
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bit at position `pos` (0 is the most significant bit), as 0 or
    /// 1. Positions at or past 128 read as 0.
    pub fn bit(&self, pos: u8) -> usize {
        if pos >= IPV6_BITS {
            return 0;
        }
        ((self.bits >> (IPV6_BITS - 1 - pos)) & 1) as usize
    }

    /// The number of leading bits self and other have in common, capped
    /// by the shorter of the two.
    pub fn common_prefix_len(&self, other: &PrefixKey) -> u8 {
        let diff = (self.bits ^ other.bits).leading_zeros() as u8;
        diff.min(self.len).min(other.len)
    }

    /// Whether self is a (not necessarily strict) bit-prefix of other.
    pub fn is_prefix_of(&self, other: &PrefixKey) -> bool {
        self.len <= other.len && self.common_prefix_len(other) == self.len
    }

    /// The leading `len` bits of self. A `len` longer than self returns
    /// self unchanged.
    pub fn truncate(&self, len: u8) -> Self {
        if len >= self.len {
            return *self;
        }
        Self::new_masked(self.bits, len)
    }

    /// The canonical address this key denotes once right-padded with
    /// zero bits.
    pub fn address(&self) -> CanonicalAddress {
        CanonicalAddress::new(self.bits)
    }

    /// Render the key as a network in its native family: keys of at least
    /// 96 bits that pad to an IPv4-mapped address come out as IPv4 with
    /// 96 subtracted from the length, all others as IPv6.
    //
    // The key masks its host bits and caps its length, and the IPv4 branch
    // only runs for lengths of 96 and up, so `Prefix::new` cannot fail.
    #[allow(clippy::unwrap_used)]
    pub fn to_prefix(&self) -> Prefix {
        let addr = self.address();
        if self.len >= IPV4_MAPPED_OFFSET && addr.is_ipv4_mapped() {
            Prefix::new(addr.into_ipaddr(), self.len - IPV4_MAPPED_OFFSET)
                .unwrap()
        } else {
            let v6 = std::net::Ipv6Addr::from(self.bits);
            Prefix::new(IpAddr::V6(v6), self.len).unwrap()
        }
    }
}

impl FromStr for PrefixKey {
    type Err = FibError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bit_str(s)
    }
}

impl fmt::Display for PrefixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pos in 0..self.len {
            write!(f, "{}", self.bit(pos))?;
        }
        Ok(())
    }
}

impl fmt::Debug for PrefixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrefixKey({} len {})", self.to_prefix(), self.len)
    }
}

impl fmt::Binary for PrefixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0128b} (len {})", self.bits, self.len)
    }
}

//------------ Codec --------------------------------------------------------

/// The full 128 bit key for a single address.
pub fn encode_address(addr: impl Into<CanonicalAddress>) -> PrefixKey {
    PrefixKey::new_masked(addr.into().bits(), IPV6_BITS)
}

/// The key for the network of `addr` with `prefix_len` bits, where
/// `prefix_len` is relative to the native family of `addr`. IPv4(-mapped)
/// networks get 96 bits added to their length.
///
/// Fails with [FibError::InvalidPrefixLength] when `prefix_len` exceeds
/// the native width of `addr`.
pub fn encode_network(
    addr: impl Into<CanonicalAddress>,
    prefix_len: u8,
) -> Result<PrefixKey, FibError> {
    let addr = addr.into();
    let max = addr.native_bits();
    if prefix_len > max {
        return Err(FibError::InvalidPrefixLength {
            len: prefix_len,
            max,
        });
    }
    Ok(PrefixKey::new_masked(
        addr.bits(),
        prefix_len + addr.key_offset(),
    ))
}

/// The address that `key` denotes when right-padded with zeros to 128
/// bits. A [PrefixKey] can not hold more than 128 bits, so use
/// [PrefixKey::from_bit_str] or [PrefixKey::new] to validate keys of
/// external origin.
pub fn decode_key(key: &PrefixKey) -> CanonicalAddress {
    key.address()
}

/// Encode an [inetnum] prefix as a key. IPv4 prefixes get the 96 bit
/// offset, exactly as [encode_network] does for IPv4 addresses.
pub fn encode_prefix(prefix: &Prefix) -> Result<PrefixKey, FibError> {
    encode_network(prefix.addr(), prefix.len())
}
