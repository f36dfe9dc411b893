use std::hint::black_box;
use std::net::Ipv4Addr;

use criterion::{
    criterion_group, criterion_main, BenchmarkId, Criterion, Throughput,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use routeinfo::{Fib, ForwardingTable};

const NEARS: u32 = 64;

// (near, destination, next hop) triples with a lot of /24 reuse, like
// repeated traceroute rounds produce.
fn observations(count: usize) -> Vec<(Ipv4Addr, Ipv4Addr, Ipv4Addr)> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    (0..count)
        .map(|_| {
            let near =
                Ipv4Addr::from(0x0a00_0000 + rng.random_range(0..NEARS));
            let net: u32 = rng.random_range(0..0x0004_0000);
            let host: u32 = rng.random_range(0..256);
            let dst = Ipv4Addr::from(net << 8 | host);
            let hop = Ipv4Addr::from(0x0b00_0000 + rng.random_range(0..4_u32));
            (near, dst, hop)
        })
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("fib_insert");
    for count in [10_000, 100_000] {
        let obs = observations(count);
        group.throughput(Throughput::Elements(count as u64));
        let id = BenchmarkId::from_parameter(count);
        group.bench_with_input(id, &obs, |b, obs| {
            b.iter(|| {
                let mut fib = Fib::new();
                for (near, dst, hop) in obs {
                    fib.insert(*near, *dst, 24, *hop).unwrap();
                }
                black_box(fib.len())
            })
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let obs = observations(100_000);
    let mut table = ForwardingTable::new();
    for (_, dst, hop) in &obs {
        table.insert(*dst, 24, *hop).unwrap();
    }

    let mut group = c.benchmark_group("ft_lookup");
    group.throughput(Throughput::Elements(obs.len() as u64));
    group.bench_function("longest_match", |b| {
        b.iter(|| {
            let mut found = 0_usize;
            for (_, dst, _) in &obs {
                if table.lookup(*dst).is_some() {
                    found += 1;
                }
            }
            black_box(found)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup);
criterion_main!(benches);
