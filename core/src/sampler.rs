//! Picks the addresses a run will probe.
//!
//! No network I/O happens here. The range table is passed in explicitly and the
//! random source is injected so runs can be reproduced in tests.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use cfst_common::network::candidate::Candidate;
use cfst_common::network::range::{AddressRange, subnet_key};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use tracing::debug;

/// Draw budget per requested address in unique mode.
const UNIQUE_ATTEMPT_FACTOR: usize = 5;
/// Extra draws per range in bulk mode, so the shuffled pool exceeds the target.
const BULK_EXTRA_DRAWS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SubnetKey {
    Slash24([u8; 3]),
    Literal(Ipv4Addr),
}

/// Samples up to `count` addresses from `ranges`.
///
/// With `unique` set, every CIDR-derived address comes from a different /24.
pub fn sample<R: Rng + ?Sized>(
    ranges: &[AddressRange],
    count: usize,
    unique: bool,
    rng: &mut R,
) -> Vec<Ipv4Addr> {
    if ranges.is_empty() || count == 0 {
        return Vec::new();
    }

    let addrs = if unique {
        sample_unique(ranges, count, rng)
    } else {
        sample_bulk(ranges, count, rng)
    };

    debug!("Sampled {} of {count} requested addresses", addrs.len());
    addrs
}

/// Attaches `port` to each sampled address.
pub fn with_port(addrs: Vec<Ipv4Addr>, port: u16) -> Vec<Candidate> {
    addrs
        .into_iter()
        .map(|addr| Candidate::new(addr, port))
        .collect()
}

/// A uniformly random host of `range`.
///
/// Network and broadcast addresses are never returned, except for blocks with
/// two or fewer host bits and for literals, which yield their base address.
pub fn random_address<R: Rng + ?Sized>(range: &AddressRange, rng: &mut R) -> Ipv4Addr {
    match range.usable_offsets() {
        Some(offsets) => range.address_at(rng.random_range(offsets)),
        None => range.base(),
    }
}

fn sample_unique<R: Rng + ?Sized>(
    ranges: &[AddressRange],
    count: usize,
    rng: &mut R,
) -> Vec<Ipv4Addr> {
    let max_attempts: usize = count.saturating_mul(UNIQUE_ATTEMPT_FACTOR);
    let mut seen: HashSet<SubnetKey> = HashSet::with_capacity(count);
    let mut addrs: Vec<Ipv4Addr> = Vec::with_capacity(count);
    let mut attempts: usize = 0;

    while addrs.len() < count && attempts < max_attempts {
        attempts += 1;
        let Some(range) = ranges.choose(rng) else {
            break;
        };

        let (addr, key) = match range {
            AddressRange::Single(addr) => (*addr, SubnetKey::Literal(*addr)),
            AddressRange::Cidr(_) => {
                let addr = random_address(range, rng);
                (addr, SubnetKey::Slash24(subnet_key(addr)))
            }
        };

        if seen.insert(key) {
            addrs.push(addr);
        }
    }

    if addrs.len() < count {
        debug!("Unique sampling stopped after {attempts} attempts");
    }
    addrs
}

fn sample_bulk<R: Rng + ?Sized>(ranges: &[AddressRange], count: usize, rng: &mut R) -> Vec<Ipv4Addr> {
    let per_range: usize = count / ranges.len() + BULK_EXTRA_DRAWS;
    let mut addrs: Vec<Ipv4Addr> = Vec::with_capacity(per_range * ranges.len());

    for range in ranges {
        if range.is_single() {
            addrs.push(range.base());
            continue;
        }
        addrs.extend((0..per_range).map(|_| random_address(range, rng)));
    }

    addrs.shuffle(rng);
    addrs.truncate(count);
    addrs
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
