//! Reachability stage: which sampled candidates accept a TCP connection, and how fast.
//!
//! Probes run on a fixed-size pool of scoped OS threads that pull candidates from
//! a shared cursor. The stage returns only after every probe finished.
//!
//! **Shared state:** the number of reachable candidates is unknown up front, so
//! results are appended to a mutex-guarded list. The completion counter is atomic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use cfst_common::network::candidate::{Candidate, ProbeResult};
use tracing::{debug, info};

use crate::event::{EventSink, PipelineEvent};
use crate::network::tcp;

pub mod resolver;

/// Probes every candidate with at most `width` connects in flight.
///
/// Emits [`PipelineEvent::ScanProgress`] after each probe. Unreachable
/// candidates are dropped; the returned list is in completion order.
pub fn probe_all(candidates: &[Candidate], width: usize, sink: &dyn EventSink) -> Vec<ProbeResult> {
    probe_with(candidates, width, sink, tcp::handshake_probe)
}

fn probe_with<F>(
    candidates: &[Candidate],
    width: usize,
    sink: &dyn EventSink,
    probe: F,
) -> Vec<ProbeResult>
where
    F: Fn(Candidate) -> ProbeResult + Sync,
{
    let total: usize = candidates.len();
    if total == 0 {
        return Vec::new();
    }

    let workers: usize = width.clamp(1, total);
    let cursor = AtomicUsize::new(0);
    let done = AtomicUsize::new(0);
    let reachable: Mutex<Vec<ProbeResult>> = Mutex::new(Vec::new());

    info!("Probing {total} candidates with {workers} workers");

    thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| {
                loop {
                    let idx = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(candidate) = candidates.get(idx) else {
                        break;
                    };

                    let result = probe(*candidate);
                    let valid = {
                        let mut list = reachable.lock().unwrap_or_else(PoisonError::into_inner);
                        if result.is_reachable() {
                            debug!("{candidate} answered in {:.1}ms", result.tcp_latency_ms);
                            list.push(result);
                        }
                        list.len()
                    };

                    let done = done.fetch_add(1, Ordering::Relaxed) + 1;
                    sink.emit(PipelineEvent::ScanProgress { done, total, valid });
                }
            });
        }
    });

    let reachable = reachable.into_inner().unwrap_or_else(PoisonError::into_inner);
    info!("{} of {total} candidates are reachable", reachable.len());
    reachable
}

/// Sorts probe results fastest first.
pub fn sort_by_latency(results: &mut [ProbeResult]) {
    results.sort_by(|a, b| a.tcp_latency_ms.total_cmp(&b.tcp_latency_ms));
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
