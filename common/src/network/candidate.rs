//! # Candidate Model
//!
//! Types that carry a sampled endpoint through the pipeline stages:
//! [`Candidate`] → [`ProbeResult`] → [`EnrichedResult`] → [`FinalResult`].

use std::cmp::Ordering;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// A sampled endpoint. Identity never changes after sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate {
    pub address: Ipv4Addr,
    pub port: u16,
}

impl Candidate {
    pub fn new(address: Ipv4Addr, port: u16) -> Self {
        Self { address, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.address, self.port))
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// A candidate that answered the TCP probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeResult {
    pub candidate: Candidate,
    /// Connect time in milliseconds. Zero means unreachable.
    pub tcp_latency_ms: f64,
}

impl ProbeResult {
    pub fn new(candidate: Candidate, tcp_latency_ms: f64) -> Self {
        Self {
            candidate,
            tcp_latency_ms,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.tcp_latency_ms > 0.0
    }
}

/// Point-of-presence label reported by an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PopLabel {
    /// A resolved location code such as `LAX`.
    Known(String),
    /// The endpoint answered but did not report a location.
    #[default]
    Unknown,
    /// The metadata request itself failed.
    ProbeError,
}

impl PopLabel {
    /// Whether the label names an actual location.
    pub fn is_resolved(&self) -> bool {
        matches!(self, PopLabel::Known(label) if !label.is_empty())
    }
}

impl fmt::Display for PopLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopLabel::Known(label) => f.write_str(label),
            PopLabel::Unknown => f.write_str("UNK"),
            PopLabel::ProbeError => f.write_str("ERR"),
        }
    }
}

/// A reachable candidate tagged with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedResult {
    pub probe: ProbeResult,
    pub pop: PopLabel,
}

impl EnrichedResult {
    pub fn new(probe: ProbeResult, pop: PopLabel) -> Self {
        Self { probe, pop }
    }

    pub fn candidate(&self) -> Candidate {
        self.probe.candidate
    }

    pub fn tcp_latency_ms(&self) -> f64 {
        self.probe.tcp_latency_ms
    }
}

impl From<ProbeResult> for EnrichedResult {
    fn from(probe: ProbeResult) -> Self {
        Self::new(probe, PopLabel::Unknown)
    }
}

/// Rank of a tested candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Rated(f64),
    /// The endpoint rejected the test request; no rating was computed.
    RateLimited,
}

impl Score {
    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Rated(value) => Some(*value),
            Score::RateLimited => None,
        }
    }
}

impl PartialOrd for Score {
    /// `RateLimited` sorts below every rating.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Score::Rated(a), Score::Rated(b)) => a.partial_cmp(b),
            (Score::Rated(_), Score::RateLimited) => Some(Ordering::Greater),
            (Score::RateLimited, Score::Rated(_)) => Some(Ordering::Less),
            (Score::RateLimited, Score::RateLimited) => Some(Ordering::Equal),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Rated(value) => write!(f, "{value:.1}"),
            Score::RateLimited => f.write_str("RateLimited"),
        }
    }
}

/// A fully tested candidate, as it appears in the ranked output.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalResult {
    pub candidate: Candidate,
    pub tcp_latency_ms: f64,
    /// Sustained transfer rate in MiB/s.
    pub download_speed: f64,
    pub pop: PopLabel,
    pub score: Score,
}

impl FinalResult {
    pub fn rated(enriched: EnrichedResult, download_speed: f64, score: f64) -> Self {
        Self {
            candidate: enriched.probe.candidate,
            tcp_latency_ms: enriched.probe.tcp_latency_ms,
            download_speed,
            pop: enriched.pop,
            score: Score::Rated(score),
        }
    }

    pub fn rate_limited(enriched: EnrichedResult) -> Self {
        Self {
            candidate: enriched.probe.candidate,
            tcp_latency_ms: enriched.probe.tcp_latency_ms,
            download_speed: 0.0,
            pop: enriched.pop,
            score: Score::RateLimited,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.score, Score::RateLimited)
    }
}

/// Sorts results best-first. Equal scores keep their relative order.
pub fn sort_by_score_desc(results: &mut [FinalResult]) {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
