mod common {
    use std::io::Write;

    pub fn init() {
        let _ = env_logger::builder()
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .is_test(true)
            .try_init();
    }
}

use std::error::Error;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use routeinfo::addr::Prefix;
use routeinfo::{
    encode_address, encode_network, FibError, ForwardingTable, MatchType,
    PrefixKey,
};

fn v4(s: &str) -> Ipv4Addr {
    Ipv4Addr::from_str(s).unwrap()
}

fn v6(s: &str) -> Ipv6Addr {
    Ipv6Addr::from_str(s).unwrap()
}

fn mask(len: u8) -> u32 {
    if len == 0 {
        0
    } else {
        u32::MAX << (32 - len)
    }
}

#[test]
fn test_longest_prefix_wins() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let h1 = v4("192.0.2.1");
    let h2 = v4("192.0.2.2");
    let mut table = ForwardingTable::new();
    table.insert(v4("10.0.0.0"), 8, h1)?;
    table.insert(v4("10.1.0.0"), 16, h2)?;

    let hops = table.lookup(v4("10.1.2.3")).ok_or("no match")?;
    assert!(hops.contains(h2));
    assert!(!hops.contains(h1));

    let hops = table.lookup(v4("10.2.0.0")).ok_or("no match")?;
    assert!(hops.contains(h1));
    assert!(!hops.contains(h2));

    let route = table.longest_match(v4("10.1.255.255")).ok_or("no match")?;
    assert_eq!(route.prefix(), Prefix::from_str("10.1.0.0/16")?);

    assert!(table.lookup(v4("11.0.0.1")).is_none());
    table.check_invariants()?;
    Ok(())
}

#[test]
fn test_insertion_order_does_not_matter() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let h1 = v4("192.0.2.1");
    let h2 = v4("192.0.2.2");
    let mut table = ForwardingTable::new();
    table.insert(v4("10.1.0.0"), 16, h2)?;
    table.insert(v4("10.0.0.0"), 8, h1)?;

    assert_eq!(
        table.lookup(v4("10.1.2.3")).map(|h| h.contains(h2)),
        Some(true)
    );
    assert_eq!(
        table.lookup(v4("10.2.0.0")).map(|h| h.contains(h1)),
        Some(true)
    );
    Ok(())
}

#[test]
fn test_same_prefix_accumulates_next_hops() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let mut table = ForwardingTable::new();
    table.insert(v4("203.0.113.5"), 24, v4("198.51.100.9"))?;
    table.insert(v4("203.0.113.77"), 24, v4("198.51.100.10"))?;
    table.insert(v4("203.0.113.200"), 24, v4("198.51.100.9"))?;

    assert_eq!(table.len(), 1);
    let hops = table
        .contains_exact(v4("203.0.113.0"), 24)?
        .ok_or("prefix missing")?;
    assert_eq!(hops.len(), 2);
    assert!(hops.contains(v4("198.51.100.9")));
    assert!(hops.contains(v4("198.51.100.10")));
    assert_eq!(table.stats().next_hops_count(), 2);

    assert!(table.contains_exact(v4("203.0.113.0"), 25)?.is_none());
    assert!(table.contains_exact(v4("203.0.0.0"), 16)?.is_none());
    Ok(())
}

#[test]
fn test_invalid_prefix_length_is_surfaced() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let mut table = ForwardingTable::new();
    let res = table.insert(v4("10.0.0.0"), 33, v4("192.0.2.1"));
    assert_eq!(res, Err(FibError::InvalidPrefixLength { len: 33, max: 32 }));
    assert!(table.is_empty());
    assert_eq!(table.node_count(), 1);

    // an IPv6 network may be longer than 32 bits
    table.insert(v6("2001:db8::"), 64, v6("2001:db8:ffff::1"))?;
    assert_eq!(table.len(), 1);
    Ok(())
}

#[test]
fn test_families_do_not_match_each_other() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let mut table = ForwardingTable::new();
    table.insert(v6("101:100::"), 24, v6("2001:db8::1"))?;

    // 1.1.1.5 has the same leading 24 bits as 0101:0100::/24 in native
    // form, but not in key space
    assert!(table.lookup(v4("1.1.1.5")).is_none());

    table.insert(v4("1.1.1.0"), 24, v4("192.0.2.1"))?;
    assert_eq!(table.len(), 2);
    let v4_hops = table.lookup(v4("1.1.1.5")).ok_or("no v4 match")?;
    assert!(v4_hops.contains(v4("192.0.2.1")));
    let v6_hops = table.lookup(v6("101:1ff::1")).ok_or("no v6 match")?;
    assert!(v6_hops.contains(v6("2001:db8::1")));
    assert!(!v6_hops.contains(v4("192.0.2.1")));

    // an IPv4 default route only covers IPv4
    table.insert(v4("0.0.0.0"), 0, v4("192.0.2.254"))?;
    assert!(table.lookup(v4("8.8.8.8")).is_some());
    assert!(table.lookup(v6("2001:db8::8")).is_none());

    // mapped IPv6 notation is the same address as IPv4
    let mapped = table.lookup(v6("::ffff:1.1.1.9")).ok_or("no match")?;
    assert!(mapped.contains(v4("192.0.2.1")));
    table.check_invariants()?;
    Ok(())
}

#[test]
fn test_match_prefix() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let mut table = ForwardingTable::new();
    table.insert(v4("10.0.0.0"), 8, v4("192.0.2.1"))?;
    table.insert(v4("10.1.0.0"), 16, v4("192.0.2.2"))?;

    let pfx = Prefix::from_str("10.1.0.0/16")?;
    let res = table.match_prefix(&pfx, MatchType::ExactMatch)?;
    assert_eq!(res.match_type, MatchType::ExactMatch);
    assert_eq!(res.prefix, Some(pfx));

    let pfx = Prefix::from_str("10.1.128.0/17")?;
    let res = table.match_prefix(&pfx, MatchType::ExactMatch)?;
    assert!(res.match_type.is_empty());
    assert!(res.next_hops.is_none());

    let res = table.match_prefix(&pfx, MatchType::LongestMatch)?;
    assert_eq!(res.match_type, MatchType::LongestMatch);
    assert_eq!(res.prefix, Some(Prefix::from_str("10.1.0.0/16")?));
    assert_eq!(
        res.next_hops.map(|h| h.contains(v4("192.0.2.2"))),
        Some(true)
    );

    let pfx = Prefix::from_str("10.0.0.0/8")?;
    let res = table.match_prefix(&pfx, MatchType::LongestMatch)?;
    assert_eq!(res.match_type, MatchType::ExactMatch);

    let pfx = Prefix::from_str("11.0.0.0/8")?;
    let res = table.match_prefix(&pfx, MatchType::LongestMatch)?;
    assert!(res.match_type.is_empty());
    Ok(())
}

#[test]
fn test_for_each_under_prefix() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let mut table = ForwardingTable::new();
    for (net, len) in [
        ("10.1.0.0", 16),
        ("10.0.0.0", 8),
        ("10.1.2.0", 24),
        ("10.200.0.0", 16),
        ("172.16.0.0", 12),
    ] {
        table.insert(v4(net), len, v4("192.0.2.1"))?;
    }
    table.insert(v6("2001:db8::"), 32, v6("2001:db8::1"))?;

    let mut all = vec![];
    table.for_each(&PrefixKey::EMPTY, |route| {
        all.push(route.prefix().to_string())
    });
    assert_eq!(
        all,
        vec![
            "10.0.0.0/8",
            "10.1.0.0/16",
            "10.1.2.0/24",
            "10.200.0.0/16",
            "172.16.0.0/12",
            // bit 2 is set in 2001::, and clear in ::ffff:0:0
            "2001:db8::/32",
        ]
    );

    let mut under = vec![];
    let ten_one = encode_network(v4("10.1.0.0"), 16)?;
    table.for_each(&ten_one, |route| under.push(route.prefix().to_string()));
    assert_eq!(under, vec!["10.1.0.0/16", "10.1.2.0/24"]);

    let mut none = 0;
    let other = encode_network(v4("192.168.0.0"), 16)?;
    table.for_each(&other, |_| none += 1);
    assert_eq!(none, 0);
    Ok(())
}

#[test]
fn test_random_networks_match_reference() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let mut rng = StdRng::seed_from_u64(1);
    let mut networks = vec![];
    for i in 0..2000_u32 {
        // short lengths and a narrow address range, so that lots of
        // networks overlap
        let len: u8 = rng.random_range(4..=28);
        let bits: u32 = rng.random_range(0..0x0800_0000_u32) << 4;
        networks.push((Ipv4Addr::from(bits & mask(len)), len, i));
    }

    let mut table = ForwardingTable::new();
    for (net, len, i) in &networks {
        table.insert(*net, *len, Ipv4Addr::from(*i))?;
    }
    table.check_invariants()?;
    assert!(table.node_count() <= 2 * table.len() + 1);

    let mut keys = vec![];
    for (net, len, i) in &networks {
        keys.push((encode_network(*net, *len)?, *i));
    }

    for (net, len, _) in networks.iter().take(500) {
        let host: u32 = rng.random();
        let addr = Ipv4Addr::from(u32::from(*net) | (host & !mask(*len)));
        let addr_key = encode_address(addr);

        // brute force: the longest of all inserted networks that contain
        // the address
        let expected = keys
            .iter()
            .filter(|(k, _)| k.is_prefix_of(&addr_key))
            .map(|(k, _)| *k)
            .max_by_key(|k| k.len())
            .ok_or("address not covered")?;

        let route = table.longest_match(addr).ok_or("no match")?;
        assert_eq!(route.key, expected);
        assert!(route.key.len() >= encode_network(*net, *len)?.len());
        for (k, i) in &keys {
            if *k == expected {
                assert!(route.next_hops.contains(Ipv4Addr::from(*i)));
            }
        }
    }
    Ok(())
}

#[test]
fn test_shuffled_inserts_build_the_same_table() -> Result<(), Box<dyn Error>>
{
    crate::common::init();

    let mut rng = StdRng::seed_from_u64(42);
    let mut triples = vec![];
    for _ in 0..1000 {
        let len: u8 = rng.random_range(8..=24);
        let bits: u32 = rng.random_range(0..0x0100_0000_u32) << 8;
        let hop = Ipv4Addr::from(rng.random_range(0..8_u32));
        triples.push((Ipv4Addr::from(bits & mask(len)), len, hop));
    }

    let mut first = ForwardingTable::new();
    for (net, len, hop) in &triples {
        first.insert(*net, *len, *hop)?;
    }
    triples.shuffle(&mut rng);
    let mut second = ForwardingTable::new();
    for (net, len, hop) in &triples {
        second.insert(*net, *len, *hop)?;
    }

    assert_eq!(first.len(), second.len());
    assert_eq!(first.node_count(), second.node_count());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.key, b.key);
        assert_eq!(a.next_hops.len(), b.next_hops.len());
        for hop in a.next_hops {
            assert!(b.next_hops.contains(*hop));
        }
    }

    for _ in 0..1000 {
        let addr = Ipv4Addr::from(rng.random::<u32>());
        assert_eq!(
            first.longest_match(addr).map(|r| r.key),
            second.longest_match(addr).map(|r| r.key)
        );
    }
    Ok(())
}

#[test]
fn test_merge_tables() -> Result<(), Box<dyn Error>> {
    crate::common::init();

    let mut a = ForwardingTable::new();
    a.insert(v4("10.0.0.0"), 8, v4("192.0.2.1"))?;
    a.insert(v4("10.1.0.0"), 16, v4("192.0.2.1"))?;
    let mut b = ForwardingTable::new();
    b.insert(v4("10.1.0.0"), 16, v4("192.0.2.2"))?;
    b.insert(v4("172.16.0.0"), 12, v4("192.0.2.3"))?;

    a.merge(&b)?;
    assert_eq!(a.len(), 3);
    let hops = a.contains_exact(v4("10.1.0.0"), 16)?.ok_or("missing")?;
    assert_eq!(hops.len(), 2);
    assert_eq!(a.stats().prefixes_total(), 3);
    assert_eq!(a.stats().next_hops_count(), 4);
    // IPv4 prefixes are counted at their key length
    assert_eq!(a.stats().prefixes_count()[96 + 16], 1);
    a.check_invariants()?;
    Ok(())
}
