use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

//------------ Constants ----------------------------------------------------

/// Length of the `::ffff:0:0/96` prefix that IPv4-mapped addresses live
/// under. Every IPv4 prefix length is shifted by this amount in key space.
pub const IPV4_MAPPED_OFFSET: u8 = 96;

// The leading 96 bits of an IPv4-mapped address: 80 zero bits followed by
// 16 one bits.
const IPV4_MAPPED_PREFIX: u128 = 0xffff << 32;
const IPV4_MAPPED_MASK: u128 = u128::MAX << 32;

/// Bit width of an IPv4 address.
pub const IPV4_BITS: u8 = 32;
/// Bit width of an IPv6 address, and of the whole key space.
pub const IPV6_BITS: u8 = 128;

/// Returns a mask with the leading `len` bits set. A `len` of 0 yields an
/// empty mask, anything from 128 up yields all ones.
pub(crate) fn leading_mask(len: u8) -> u128 {
    match len {
        0 => 0,
        l if l >= IPV6_BITS => u128::MAX,
        l => u128::MAX << (IPV6_BITS - l),
    }
}

//------------ CanonicalAddress ---------------------------------------------

/// An IP address normalised into the 128-bit IPv6 space.
///
/// IPv4 addresses are held in their IPv4-mapped form `::ffff:a.b.c.d`, so
/// that one trie can hold prefixes of both families. Whether an address
/// is "really" IPv4 is derived from that pattern, it is not stored
/// separately. As a consequence an IPv6 address written as
/// `::ffff:192.0.2.1` and the IPv4 address `192.0.2.1` are the same
/// canonical address.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalAddress(u128);

impl CanonicalAddress {
    pub const fn new(bits: u128) -> Self {
        Self(bits)
    }

    /// The raw 128 bits, most significant bit first.
    pub const fn bits(self) -> u128 {
        self.0
    }

    /// True iff the leading 80 bits are zero and the next 16 are all
    /// ones, i.e. the address lies in `::ffff:0:0/96`.
    pub fn is_ipv4_mapped(self) -> bool {
        self.0 & IPV4_MAPPED_MASK == IPV4_MAPPED_PREFIX
    }

    /// The width of the address in its native family: 32 for an
    /// IPv4-mapped address, 128 for everything else.
    pub fn native_bits(self) -> u8 {
        if self.is_ipv4_mapped() {
            IPV4_BITS
        } else {
            IPV6_BITS
        }
    }

    /// The amount of bits to add to a native prefix length to get the
    /// length of the prefix in key space.
    pub fn key_offset(self) -> u8 {
        if self.is_ipv4_mapped() {
            IPV4_MAPPED_OFFSET
        } else {
            0
        }
    }

    /// Zero all bits after the first `len` bits of the 128-bit value.
    pub fn truncate_to_len(self, len: u8) -> Self {
        Self(self.0 & leading_mask(len))
    }

    /// Turn self back into a [std::net::IpAddr]. IPv4-mapped addresses
    /// come out as [IpAddr::V4].
    pub fn into_ipaddr(self) -> IpAddr {
        let v6 = Ipv6Addr::from(self.0);
        match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        }
    }
}

impl From<Ipv4Addr> for CanonicalAddress {
    fn from(addr: Ipv4Addr) -> Self {
        Self(u128::from(addr.to_ipv6_mapped()))
    }
}

impl From<Ipv6Addr> for CanonicalAddress {
    fn from(addr: Ipv6Addr) -> Self {
        Self(u128::from(addr))
    }
}

impl From<IpAddr> for CanonicalAddress {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => v4.into(),
            IpAddr::V6(v6) => v6.into(),
        }
    }
}

impl From<u128> for CanonicalAddress {
    fn from(bits: u128) -> Self {
        Self(bits)
    }
}

impl From<CanonicalAddress> for IpAddr {
    fn from(addr: CanonicalAddress) -> Self {
        addr.into_ipaddr()
    }
}

impl FromStr for CanonicalAddress {
    type Err = std::net::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<IpAddr>().map(Self::from)
    }
}

impl fmt::Display for CanonicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_ipaddr())
    }
}

impl fmt::Debug for CanonicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalAddress({})", self.into_ipaddr())
    }
}

impl fmt::Binary for CanonicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0128b}", self.0)
    }
}

/// Free-standing form of [CanonicalAddress::is_ipv4_mapped].
pub fn is_ipv4_mapped(addr: impl Into<CanonicalAddress>) -> bool {
    addr.into().is_ipv4_mapped()
}
