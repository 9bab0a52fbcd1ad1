//! # Address Ranges
//!
//! Defines the pool that candidates are sampled from.
//!
//! A range list entry can be:
//! * A CIDR block (e.g., `104.16.0.0/13`).
//! * A single IPv4 address (e.g., `1.1.1.1`).
//!
//! Lists are plaintext with one entry per line; blank lines and lines starting
//! with `#` are ignored.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use pnet::ipnetwork::Ipv4Network;
use tracing::warn;

use crate::error::RangeError;

/// Published IPv4 blocks of the default edge provider.
pub const DEFAULT_RANGES: &[&str] = &[
    "173.245.48.0/20",
    "103.21.244.0/22",
    "103.22.200.0/22",
    "103.31.4.0/22",
    "141.101.64.0/18",
    "108.162.192.0/18",
    "190.93.240.0/20",
    "188.114.96.0/20",
    "197.234.240.0/22",
    "198.41.128.0/17",
    "162.158.0.0/15",
    "104.16.0.0/13",
    "104.24.0.0/14",
    "172.64.0.0/13",
    "131.0.72.0/22",
];

/// Ranges with this many host bits or fewer are sampled as their network address.
const DEGENERATE_HOST_BITS: u8 = 2;

/// One entry of a range list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressRange {
    /// A CIDR block. Sampling skips the network and broadcast addresses.
    Cidr(Ipv4Network),
    /// A literal address, always sampled as itself.
    Single(Ipv4Addr),
}

impl AddressRange {
    /// First address of the block, or the literal itself.
    pub fn base(&self) -> Ipv4Addr {
        match self {
            AddressRange::Cidr(net) => net.network(),
            AddressRange::Single(addr) => *addr,
        }
    }

    pub fn host_bits(&self) -> u8 {
        match self {
            AddressRange::Cidr(net) => 32 - net.prefix(),
            AddressRange::Single(_) => 0,
        }
    }

    /// Offsets from [`base`](Self::base) that address usable hosts.
    ///
    /// Returns `None` for literals and for blocks too small to have a usable
    /// host between the network and broadcast addresses.
    pub fn usable_offsets(&self) -> Option<RangeInclusive<u32>> {
        let host_bits = self.host_bits();
        if matches!(self, AddressRange::Single(_)) || host_bits <= DEGENERATE_HOST_BITS {
            return None;
        }
        let host_count: u64 = 1u64 << host_bits;
        Some(1..=(host_count - 2) as u32)
    }

    /// Address at `offset` from the base. Wraps instead of overflowing.
    pub fn address_at(&self, offset: u32) -> Ipv4Addr {
        let base: u32 = self.base().into();
        Ipv4Addr::from(base.wrapping_add(offset))
    }

    pub fn is_single(&self) -> bool {
        matches!(self, AddressRange::Single(_))
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressRange::Cidr(net) => write!(f, "{}/{}", net.network(), net.prefix()),
            AddressRange::Single(addr) => write!(f, "{addr}"),
        }
    }
}

impl FromStr for AddressRange {
    type Err = RangeError;

    /// Parses a CIDR block or a single IPv4 address.
    ///
    /// Host bits set in a CIDR entry are ignored (`10.0.0.7/24` is `10.0.0.0/24`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RangeError::Empty);
        }

        if let Some(range) = parse_cidr(s)? {
            return Ok(range);
        }

        parse_single(s)
    }
}

/// The /24-equivalent bucket of an address: its first three octets.
pub fn subnet_key(addr: Ipv4Addr) -> [u8; 3] {
    let [a, b, c, _] = addr.octets();
    [a, b, c]
}

/// The built-in range table, parsed.
pub fn default_ranges() -> Vec<AddressRange> {
    DEFAULT_RANGES
        .iter()
        .filter_map(|entry| entry.parse().ok())
        .collect()
}

/// Result of parsing a plaintext range list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RangeList {
    pub ranges: Vec<AddressRange>,
    /// Lines that were neither comments nor valid entries, with their 1-based line number.
    pub rejected: Vec<(usize, String)>,
}

/// Parses a range list, one entry per line.
pub fn parse_range_list(content: &str) -> RangeList {
    let mut list = RangeList::default();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<AddressRange>() {
            Ok(range) => list.ranges.push(range),
            Err(_) => list.rejected.push((idx + 1, line.to_string())),
        }
    }

    list
}

/// Reads and parses a range file.
pub fn load_range_file(path: &Path) -> anyhow::Result<RangeList> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading range file {}", path.display()))?;
    Ok(parse_range_list(&content))
}

/// Resolves the ranges a run should sample from.
///
/// Falls back to [`default_ranges`] when no file is given, when the file cannot
/// be read, or when it holds no valid entry.
pub fn ranges_or_default(path: Option<&Path>) -> Vec<AddressRange> {
    let Some(path) = path else {
        return default_ranges();
    };

    match load_range_file(path) {
        Ok(list) => {
            for (line_no, line) in &list.rejected {
                warn!("Ignoring invalid range on line {line_no}: {line}");
            }
            if list.ranges.is_empty() {
                warn!("{} has no usable ranges, using the default table", path.display());
                default_ranges()
            } else {
                list.ranges
            }
        }
        Err(e) => {
            warn!("{e:#}, using the default table");
            default_ranges()
        }
    }
}

fn parse_cidr(s: &str) -> Result<Option<AddressRange>, RangeError> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let ipv4_addr = match ip_str.parse::<IpAddr>() {
        Ok(IpAddr::V4(addr)) => addr,
        Ok(IpAddr::V6(_)) => return Err(RangeError::Ipv6(s.to_string())),
        Err(_) => return Err(RangeError::InvalidCidrAddress(s.to_string())),
    };

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|_| RangeError::InvalidPrefix(s.to_string()))?;

    let network = Ipv4Network::new(ipv4_addr, prefix)
        .map_err(|_| RangeError::InvalidPrefix(s.to_string()))?;

    Ok(Some(AddressRange::Cidr(network)))
}

fn parse_single(s: &str) -> Result<AddressRange, RangeError> {
    match s.parse::<IpAddr>() {
        Ok(IpAddr::V4(addr)) => Ok(AddressRange::Single(addr)),
        Ok(IpAddr::V6(_)) => Err(RangeError::Ipv6(s.to_string())),
        Err(_) => Err(RangeError::InvalidAddress(s.to_string())),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
