//! Sustained download throughput of one candidate.
//!
//! `threads` connections download in parallel and add every chunk to a shared
//! counter until the benchmark window has passed. The window is checked between
//! reads, so a slow read can run slightly past it; the measured time is used as-is.

use std::io::Read;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use cfst_common::network::candidate::Candidate;
use reqwest::blocking::Client;
use reqwest::header::CONNECTION;
use tracing::{debug, warn};

use crate::network::http::{self, ClientOptions, PinnedTarget};

pub const CHUNK_SIZE: usize = 64 * 1024;

const MIB: f64 = 1024.0 * 1024.0;
const MIN_ELAPSED: Duration = Duration::from_millis(100);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
/// Added to the window for the whole-request timeout, so a stalled body read
/// cannot hang a worker forever.
const STALL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkReport {
    /// Bytes received across all connections.
    pub bytes: u64,
    /// Wall-clock time from the start of the benchmark until every worker stopped.
    pub elapsed: Duration,
    /// Connections that got a response.
    pub connections: usize,
}

impl BenchmarkReport {
    /// Throughput in MiB/s. Elapsed time is floored at 100ms.
    pub fn mib_per_sec(&self) -> f64 {
        let secs = self.elapsed.max(MIN_ELAPSED).as_secs_f64();
        (self.bytes as f64 / MIB) / secs
    }
}

/// Downloads `test` from `candidate` over `threads` connections for `duration`.
///
/// Failed connections contribute nothing; if none succeed the report carries
/// zero bytes.
pub fn measure(
    candidate: &Candidate,
    threads: usize,
    duration: Duration,
    test: &PinnedTarget,
) -> BenchmarkReport {
    let options = ClientOptions {
        connect_timeout: CONNECT_TIMEOUT,
        timeout: Some(duration + STALL_GRACE),
        idle_per_host: threads,
    };

    let bytes = AtomicU64::new(0);
    let connections = AtomicUsize::new(0);
    let started = Instant::now();

    match http::pinned_client(test, candidate, options) {
        Ok(client) => thread::scope(|s| {
            for _ in 0..threads {
                s.spawn(|| {
                    let worker = Worker {
                        client: &client,
                        candidate,
                        test,
                        started,
                        duration,
                    };
                    worker.run(&bytes, &connections);
                });
            }
        }),
        Err(e) => warn!("Failed to build benchmark client for {candidate}: {e}"),
    }

    let report = BenchmarkReport {
        bytes: bytes.into_inner(),
        elapsed: started.elapsed(),
        connections: connections.into_inner(),
    };
    debug!(
        "{candidate}: {} bytes over {} connections in {:.2}s",
        report.bytes,
        report.connections,
        report.elapsed.as_secs_f64()
    );
    report
}

struct Worker<'a> {
    client: &'a Client,
    candidate: &'a Candidate,
    test: &'a PinnedTarget,
    started: Instant,
    duration: Duration,
}

impl Worker<'_> {
    fn run(&self, bytes: &AtomicU64, connections: &AtomicUsize) {
        let request = self
            .test
            .get(self.client, self.candidate)
            .header(CONNECTION, "keep-alive");

        let mut response = match request.send() {
            Ok(response) => response,
            Err(e) => {
                debug!("Benchmark connection to {} failed: {e}", self.candidate);
                return;
            }
        };
        connections.fetch_add(1, Ordering::Relaxed);

        let mut buf = vec![0u8; CHUNK_SIZE];
        while self.started.elapsed() <= self.duration {
            match response.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    bytes.fetch_add(n as u64, Ordering::Relaxed);
                }
                Err(e) => {
                    debug!("Benchmark read from {} stopped: {e}", self.candidate);
                    break;
                }
            }
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, TcpListener};

    #[test]
    fn elapsed_time_is_floored() {
        let report = BenchmarkReport {
            bytes: 1024 * 1024,
            elapsed: Duration::from_millis(10),
            connections: 1,
        };
        assert!((report.mib_per_sec() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn speed_is_bytes_over_seconds() {
        let report = BenchmarkReport {
            bytes: 50 * 1024 * 1024,
            elapsed: Duration::from_secs(2),
            connections: 4,
        };
        assert!((report.mib_per_sec() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn no_connection_means_zero_speed() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let test = PinnedTarget::parse("http://speed.test/__down?bytes=1000").unwrap();

        let report = measure(
            &Candidate::new(Ipv4Addr::LOCALHOST, port),
            4,
            Duration::from_secs(1),
            &test,
        );

        assert_eq!(report.bytes, 0);
        assert_eq!(report.connections, 0);
        assert_eq!(report.mib_per_sec(), 0.0);
    }
}
