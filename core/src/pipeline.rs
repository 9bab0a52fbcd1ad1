//! # Measurement Pipeline
//!
//! Sequences the stages of a run:
//!
//! 1. **Sampling** addresses from the configured ranges.
//! 2. **Probing** them for TCP reachability, fastest first.
//! 3. **Resolving** the point-of-presence of every reachable candidate.
//! 4. **Ranking**: for each candidate in latency order, the block check and then
//!    the throughput benchmark, until the result quota or the fast-exit is hit.
//!
//! Stages are fork-join: each one finishes all of its work before the next
//! starts. The ranking loop tests one candidate at a time.

use std::collections::HashSet;
use std::time::Duration;

use cfst_common::config::Settings;
use cfst_common::error::ConfigError;
use cfst_common::network::candidate::{
    Candidate, EnrichedResult, FinalResult, sort_by_score_desc,
};
use cfst_common::network::range::AddressRange;
use rand::Rng;
use tracing::info;

use crate::event::{EventSink, PipelineEvent};
use crate::gate::{self, GateVerdict};
use crate::network::http::PinnedTarget;
use crate::scanner::{self, resolver};
use crate::{benchmark, sampler, scoring};

/// Results at or above the fast threshold that end a run early.
pub const FAST_EXIT_COUNT: usize = 5;

/// The per-candidate tests the ranking loop runs.
pub trait CandidateTester: Sync {
    /// Whether the endpoint rejects the test request.
    fn gate(&self, candidate: &Candidate) -> GateVerdict;
    /// Sustained download speed in MiB/s.
    fn throughput(&self, candidate: &Candidate) -> f64;
}

/// Runs the block check and the benchmark over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTester {
    test: PinnedTarget,
    threads: usize,
    duration: Duration,
}

impl HttpTester {
    pub fn new(test: PinnedTarget, threads: usize, duration: Duration) -> Self {
        Self {
            test,
            threads,
            duration,
        }
    }
}

impl CandidateTester for HttpTester {
    fn gate(&self, candidate: &Candidate) -> GateVerdict {
        gate::check(candidate, &self.test)
    }

    fn throughput(&self, candidate: &Candidate) -> f64 {
        benchmark::measure(candidate, self.threads, self.duration, &self.test).mib_per_sec()
    }
}

/// Stop conditions and blocked-candidate handling for the ranking loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankPolicy {
    /// Stop once this many results were collected.
    pub quota: usize,
    /// Speed (MiB/s) that counts towards the fast-exit.
    pub fast_threshold: f64,
    /// Drop blocked candidates without using up a result slot.
    pub skip_blocked: bool,
}

impl From<&Settings> for RankPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            quota: settings.result_quota,
            fast_threshold: settings.stop_threshold,
            skip_blocked: settings.skip_blocked,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankOutcome {
    /// Best first.
    pub results: Vec<FinalResult>,
    /// Candidates that failed the block check.
    pub blocked: usize,
    pub fast_exit: bool,
}

/// Tests `candidates` in the given order until a stop condition is met.
///
/// The fast-exit counts every qualifying result of the run, not a streak.
pub fn rank(
    candidates: Vec<EnrichedResult>,
    policy: &RankPolicy,
    tester: &dyn CandidateTester,
    sink: &dyn EventSink,
) -> RankOutcome {
    let total: usize = candidates.len();
    let mut results: Vec<FinalResult> = Vec::new();
    let mut blocked: usize = 0;
    let mut fast_count: usize = 0;
    let mut fast_exit: bool = false;

    for (idx, enriched) in candidates.into_iter().enumerate() {
        let candidate = enriched.candidate();
        sink.emit(PipelineEvent::Status(format!(
            "Testing [{}/{total}] {} (Skipped: {blocked})",
            idx + 1,
            candidate.address
        )));

        if tester.gate(&candidate).is_blocked() {
            blocked += 1;
            if policy.skip_blocked {
                continue;
            }
            let result = FinalResult::rate_limited(enriched);
            sink.emit(PipelineEvent::Row(result.clone()));
            results.push(result);
        } else {
            let speed = tester.throughput(&candidate);
            let score = scoring::score(speed, enriched.tcp_latency_ms(), &enriched.pop);
            let result = FinalResult::rated(enriched, speed, score);
            sink.emit(PipelineEvent::Row(result.clone()));
            results.push(result);

            if speed >= policy.fast_threshold {
                fast_count += 1;
                if fast_count >= FAST_EXIT_COUNT {
                    info!("{fast_count} endpoints reached {} MiB/s, stopping", policy.fast_threshold);
                    sink.emit(PipelineEvent::FastExit);
                    fast_exit = true;
                    break;
                }
            }
        }

        if results.len() >= policy.quota {
            break;
        }
    }

    sort_by_score_desc(&mut results);
    RankOutcome {
        results,
        blocked,
        fast_exit,
    }
}

/// A configured run over a fixed set of ranges.
pub struct Pipeline {
    settings: Settings,
    ranges: Vec<AddressRange>,
    trace: PinnedTarget,
    tester: HttpTester,
}

impl Pipeline {
    pub fn new(settings: Settings, ranges: Vec<AddressRange>) -> Result<Self, ConfigError> {
        settings.validate()?;
        let test = PinnedTarget::parse_setting("test URL", &settings.test_url)?;
        let trace = PinnedTarget::parse_setting("trace URL", &settings.trace_url)?;
        let tester = HttpTester::new(
            test,
            settings.download_threads,
            Duration::from_secs(settings.duration_secs),
        );

        Ok(Self {
            settings,
            ranges,
            trace,
            tester,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs every stage and returns the ranked results, best first.
    ///
    /// Exactly one terminal event ([`PipelineEvent::Complete`] or
    /// [`PipelineEvent::Error`]) is emitted.
    pub fn run(&self, sink: &dyn EventSink) -> Vec<FinalResult> {
        self.run_with_rng(&mut rand::rng(), sink)
    }

    pub fn run_with_rng<R: Rng + ?Sized>(&self, rng: &mut R, sink: &dyn EventSink) -> Vec<FinalResult> {
        let cfg = &self.settings;

        sink.emit(PipelineEvent::Status(format!(
            "Generating candidates from {} ranges...",
            self.ranges.len()
        )));
        let mut addrs = sampler::sample(&self.ranges, cfg.max_scan, cfg.unique_subnets, rng);
        let mut seen = HashSet::with_capacity(addrs.len());
        addrs.retain(|addr| seen.insert(*addr));
        let candidates = sampler::with_port(addrs, cfg.port);

        sink.emit(PipelineEvent::Status(format!(
            "Probing {} candidates...",
            candidates.len()
        )));
        let mut reachable = scanner::probe_all(&candidates, cfg.scan_concurrency, sink);
        if reachable.is_empty() {
            sink.emit(PipelineEvent::Error("No reachable endpoints found.".to_string()));
            return Vec::new();
        }
        scanner::sort_by_latency(&mut reachable);

        sink.emit(PipelineEvent::Status(format!(
            "Resolving locations for {} endpoints...",
            reachable.len()
        )));
        let enriched = resolver::resolve_all(reachable, &self.trace, sink);

        sink.emit(PipelineEvent::Status("Running download tests...".to_string()));
        let outcome = rank(enriched, &RankPolicy::from(cfg), &self.tester, sink);
        info!(
            "Ranked {} endpoints ({} blocked)",
            outcome.results.len(),
            outcome.blocked
        );

        if outcome.results.is_empty() {
            sink.emit(PipelineEvent::Error(
                "All tested endpoints were blocked. Wait for the rate limit to clear or use another test URL."
                    .to_string(),
            ));
        } else {
            sink.emit(PipelineEvent::Status("Test complete".to_string()));
            sink.emit(PipelineEvent::Complete {
                results: outcome.results.len(),
            });
        }

        outcome.results
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
