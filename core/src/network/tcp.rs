use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use cfst_common::network::candidate::{Candidate, ProbeResult};

pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(1_000);
pub const RETRY_DELAY: Duration = Duration::from_millis(50);

/// Time to complete one TCP handshake with `addr`, in milliseconds.
///
/// Returns `0.0` when the connect fails or times out.
pub fn handshake_latency(addr: SocketAddr, timeout: Duration) -> f64 {
    let start = Instant::now();
    match TcpStream::connect_timeout(&addr, timeout) {
        Ok(_stream) => {
            let micros = start.elapsed().as_micros() as f64;
            // A sub-microsecond connect must still read as reachable.
            (micros / 1000.0).max(0.001)
        }
        Err(_) => 0.0,
    }
}

/// Probes `candidate`, retrying once after a short pause.
pub fn handshake_probe(candidate: Candidate) -> ProbeResult {
    probe_with(
        candidate,
        |addr| handshake_latency(addr, CONNECT_TIMEOUT),
        thread::sleep,
    )
}

/// At most two `connect` attempts with one `pause(RETRY_DELAY)` between them.
fn probe_with<C, P>(candidate: Candidate, mut connect: C, mut pause: P) -> ProbeResult
where
    C: FnMut(SocketAddr) -> f64,
    P: FnMut(Duration),
{
    let addr = candidate.socket_addr();
    let mut latency = connect(addr);
    if latency <= 0.0 {
        pause(RETRY_DELAY);
        latency = connect(addr);
    }
    ProbeResult::new(candidate, latency)
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
    use std::cell::RefCell;
    use std::net::{Ipv4Addr, TcpListener};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Step {
        Connect,
        Pause(Duration),
    }

    /// Runs `probe_with` against scripted connect latencies and records every step.
    fn scripted(latencies: &[f64]) -> (ProbeResult, Vec<Step>) {
        let steps = RefCell::new(Vec::new());
        let mut answers = latencies.iter().copied();
        let candidate = Candidate::new(Ipv4Addr::new(192, 0, 2, 1), 443);

        let result = probe_with(
            candidate,
            |addr| {
                assert_eq!(addr, candidate.socket_addr());
                steps.borrow_mut().push(Step::Connect);
                answers.next().unwrap_or(0.0)
            },
            |delay| steps.borrow_mut().push(Step::Pause(delay)),
        );
        (result, steps.into_inner())
    }

    #[test]
    fn first_success_needs_no_retry() {
        let (result, steps) = scripted(&[12.5]);
        assert_eq!(result.tcp_latency_ms, 12.5);
        assert_eq!(steps, vec![Step::Connect]);
    }

    #[test]
    fn failure_then_success_is_reachable() {
        let (result, steps) = scripted(&[0.0, 8.0]);
        assert!(result.is_reachable());
        assert_eq!(result.tcp_latency_ms, 8.0);
        assert_eq!(
            steps,
            vec![Step::Connect, Step::Pause(RETRY_DELAY), Step::Connect]
        );
    }

    #[test]
    fn two_failures_give_up_after_exactly_two_attempts() {
        let (result, steps) = scripted(&[0.0, 0.0, 5.0]);
        assert_eq!(result.tcp_latency_ms, 0.0);
        assert_eq!(
            steps,
            vec![Step::Connect, Step::Pause(RETRY_DELAY), Step::Connect]
        );
    }

    #[test]
    fn handshake_probe_should_find_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = handshake_probe(Candidate::new(Ipv4Addr::LOCALHOST, port));
        assert!(result.is_reachable());
    }

    #[test]
    fn handshake_probe_should_report_closed_port_as_unreachable() {
        // Bind then drop to get a port with nothing behind it.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let result = handshake_probe(Candidate::new(Ipv4Addr::LOCALHOST, port));
        assert_eq!(result.tcp_latency_ms, 0.0);
    }

    #[test]
    #[ignore]
    fn handshake_probe_should_find_known_open_port() {
        let result = handshake_probe(Candidate::new(Ipv4Addr::new(1, 1, 1, 1), 443));
        assert!(result.is_reachable());
    }
}
