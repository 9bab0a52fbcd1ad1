//! Point-of-presence lookup for reachable candidates.
//!
//! Every candidate is asked for the provider's trace document, which contains a
//! `colo=XXX` line naming the location that answered. Lookups run on a dedicated
//! pool of [`RESOLVER_WIDTH`] threads. Each worker writes only its own slot of a
//! pre-sized result vector, so the stage needs no locks.

use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cfst_common::network::candidate::{Candidate, EnrichedResult, PopLabel, ProbeResult};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::event::{EventSink, PipelineEvent};
use crate::network::http::{self, ClientOptions, PinnedTarget};

pub const RESOLVER_WIDTH: usize = 20;

const POP_KEY: &str = "colo=";
const LOOKUP_OPTIONS: ClientOptions = ClientOptions {
    connect_timeout: Duration::from_secs(2),
    timeout: Some(Duration::from_secs(3)),
    idle_per_host: 1,
};

/// Tags every probe result with the location reported by `trace`.
///
/// Output order matches input order. Emits [`PipelineEvent::ColoProgress`]
/// after each lookup.
pub fn resolve_all(
    probes: Vec<ProbeResult>,
    trace: &PinnedTarget,
    sink: &dyn EventSink,
) -> Vec<EnrichedResult> {
    resolve_with(probes, RESOLVER_WIDTH, sink, |candidate| {
        lookup_pop(trace, &candidate)
    })
}

fn resolve_with<F>(
    probes: Vec<ProbeResult>,
    width: usize,
    sink: &dyn EventSink,
    lookup: F,
) -> Vec<EnrichedResult>
where
    F: Fn(Candidate) -> PopLabel + Sync,
{
    let total: usize = probes.len();
    let mut slots: Vec<EnrichedResult> = probes.into_iter().map(EnrichedResult::from).collect();
    if total == 0 {
        return slots;
    }

    let done = AtomicUsize::new(0);
    let fill = |slot: &mut EnrichedResult| {
        slot.pop = lookup(slot.candidate());
        let done = done.fetch_add(1, Ordering::Relaxed) + 1;
        sink.emit(PipelineEvent::ColoProgress { done, total });
    };

    info!("Resolving locations for {total} candidates");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(width.max(1))
        .thread_name(|i| format!("cfst-colo-{i}"))
        .build();

    match pool {
        Ok(pool) => pool.install(|| slots.par_iter_mut().with_max_len(1).for_each(fill)),
        Err(e) => {
            warn!("Could not start lookup workers ({e}), resolving sequentially");
            slots.iter_mut().for_each(fill);
        }
    }

    slots
}

/// Asks `candidate` for the trace document and extracts its location.
pub fn lookup_pop(trace: &PinnedTarget, candidate: &Candidate) -> PopLabel {
    let client = match http::pinned_client(trace, candidate, LOOKUP_OPTIONS) {
        Ok(client) => client,
        Err(e) => {
            warn!("Failed to build lookup client for {candidate}: {e}");
            return PopLabel::ProbeError;
        }
    };

    match trace.get(&client, candidate).send() {
        Ok(response) => match find_pop(BufReader::new(response)) {
            Some(label) => PopLabel::Known(label),
            None => PopLabel::Unknown,
        },
        Err(e) => {
            debug!("Location lookup on {candidate} failed: {e}");
            PopLabel::ProbeError
        }
    }
}

/// Scans a trace body line by line; the first `colo=` token wins.
///
/// A read error ends the scan as if the body had ended.
pub fn find_pop<R: BufRead>(mut reader: R) -> Option<String> {
    let mut line: Vec<u8> = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {
                if let Some(label) = extract_pop(&String::from_utf8_lossy(&line)) {
                    return Some(label.to_string());
                }
            }
        }
    }
}

/// The uppercase code following the first `colo=` that has one.
fn extract_pop(line: &str) -> Option<&str> {
    line.match_indices(POP_KEY).find_map(|(idx, _)| {
        let rest = &line[idx + POP_KEY.len()..];
        let len = rest
            .bytes()
            .take_while(|b| b.is_ascii_uppercase())
            .count();
        (len > 0).then(|| &rest[..len])
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
