#![cfg(test)]
use std::net::Ipv4Addr;
use std::time::Duration;

use cfst_common::config::Settings;
use cfst_common::network::candidate::{Candidate, FinalResult, PopLabel, ProbeResult, Score};
use cfst_common::network::range::AddressRange;
use cfst_core::benchmark;
use cfst_core::event::{NullSink, PipelineEvent};
use cfst_core::gate::{self, BlockReason, GateVerdict};
use cfst_core::network::http::PinnedTarget;
use cfst_core::pipeline::Pipeline;
use cfst_core::scanner::{self, resolver};
use tokio::sync::mpsc;

use crate::support::{Reply, TestServer};

const TEST_URL: &str = "http://speed.test/__down?bytes=4000000";
const TRACE_URL: &str = "http://trace.test/cdn-cgi/trace";

fn loopback(port: u16) -> Candidate {
    Candidate::new(Ipv4Addr::LOCALHOST, port)
}

fn settings_for(server: &TestServer) -> Settings {
    Settings {
        port: server.port(),
        max_scan: 4,
        download_threads: 2,
        result_quota: 3,
        duration_secs: 1,
        scan_concurrency: 4,
        test_url: TEST_URL.to_string(),
        trace_url: TRACE_URL.to_string(),
        ..Settings::default()
    }
}

/// Runs the pipeline on a blocking task and collects every event it emitted.
async fn run_pipeline(settings: Settings) -> (Vec<FinalResult>, Vec<PipelineEvent>) {
    let ranges = vec![AddressRange::Single(Ipv4Addr::LOCALHOST)];
    let pipeline = Pipeline::new(settings, ranges).expect("valid settings");
    let (tx, mut rx) = mpsc::unbounded_channel::<PipelineEvent>();

    let worker = tokio::task::spawn_blocking(move || pipeline.run(&tx));

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (worker.await.expect("pipeline task panicked"), events)
}

#[tokio::test]
async fn gate_classifies_live_responses() {
    let server = TestServer::start(|req| match req.path.as_str() {
        "/ok" => Reply::Status(200),
        "/moved" => Reply::Status(302),
        "/limited" => Reply::Status(429),
        _ => Reply::Status(403),
    });
    let candidate = loopback(server.port());

    let verdicts = tokio::task::spawn_blocking(move || {
        ["ok", "moved", "limited", "forbidden"].map(|path| {
            let target = PinnedTarget::parse(&format!("http://speed.test/{path}")).unwrap();
            gate::check(&candidate, &target)
        })
    })
    .await
    .unwrap();

    assert_eq!(
        verdicts,
        [
            GateVerdict::Open,
            GateVerdict::Open,
            GateVerdict::Blocked(BlockReason::Status(429)),
            GateVerdict::Blocked(BlockReason::Status(403)),
        ]
    );
}

#[tokio::test]
async fn requests_carry_the_service_hostname() {
    let server = TestServer::start(|_| Reply::Status(204));
    let candidate = loopback(server.port());

    tokio::task::spawn_blocking(move || {
        let target = PinnedTarget::parse("http://speed.test/__down?bytes=1").unwrap();
        gate::check(&candidate, &target)
    })
    .await
    .unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/__down?bytes=1");
    assert_eq!(requests[0].host.as_deref(), Some("speed.test"));
}

#[tokio::test]
async fn resolver_reads_the_trace_document() {
    let server = TestServer::edge(0, 200);
    let silent = TestServer::start(|_| Reply::Body("fl=1\nloc=XX\n".to_string()));
    let probes = vec![
        ProbeResult::new(loopback(server.port()), 1.0),
        ProbeResult::new(loopback(silent.port()), 2.0),
    ];

    let enriched = tokio::task::spawn_blocking(move || {
        let trace = PinnedTarget::parse(TRACE_URL).unwrap();
        resolver::resolve_all(probes, &trace, &NullSink)
    })
    .await
    .unwrap();

    assert_eq!(enriched[0].pop, PopLabel::Known("TST".to_string()));
    assert_eq!(enriched[1].pop, PopLabel::Unknown);
}

#[tokio::test]
async fn benchmark_counts_downloaded_bytes() {
    let server = TestServer::edge(2 * 1024 * 1024, 200);
    let candidate = loopback(server.port());

    let report = tokio::task::spawn_blocking(move || {
        let test = PinnedTarget::parse(TEST_URL).unwrap();
        benchmark::measure(&candidate, 2, Duration::from_secs(2), &test)
    })
    .await
    .unwrap();

    assert_eq!(report.connections, 2);
    assert_eq!(report.bytes, 4 * 1024 * 1024);
    assert!(report.mib_per_sec() > 0.0);
}

#[tokio::test]
async fn benchmark_stops_at_the_end_of_its_window() {
    let server = TestServer::edge(4 << 30, 200);
    let candidate = loopback(server.port());
    let window = Duration::from_secs(1);

    let report = tokio::task::spawn_blocking(move || {
        let test = PinnedTarget::parse(TEST_URL).unwrap();
        benchmark::measure(&candidate, 2, window, &test)
    })
    .await
    .unwrap();

    assert!(report.bytes > 0);
    assert!(report.bytes < 8 << 30, "workers read the whole body");
    assert!(report.elapsed >= window, "stopped early: {:?}", report.elapsed);
    assert!(
        report.elapsed < window + Duration::from_millis(750),
        "overshot the window: {:?}",
        report.elapsed
    );
}

#[tokio::test]
async fn redirects_are_followed_only_on_the_candidate() {
    let server = TestServer::start(|req| match req.path.as_str() {
        "/hop" => Reply::Redirect("/ok".to_string()),
        "/away" => Reply::Redirect("http://elsewhere.invalid/ok".to_string()),
        "/loop" => Reply::Redirect("/loop".to_string()),
        "/ok" => Reply::Status(200),
        _ => Reply::Status(404),
    });
    let candidate = loopback(server.port());

    let verdicts = tokio::task::spawn_blocking(move || {
        ["hop", "away", "loop"].map(|path| {
            let target = PinnedTarget::parse(&format!("http://speed.test/{path}")).unwrap();
            gate::check(&candidate, &target)
        })
    })
    .await
    .unwrap();

    // "away" stops at the 302 instead of leaving the candidate.
    assert_eq!(
        verdicts,
        [
            GateVerdict::Open,
            GateVerdict::Open,
            GateVerdict::Blocked(BlockReason::Transport),
        ]
    );

    let paths: Vec<String> = server.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths.iter().filter(|p| *p == "/ok").count(), 1);
    assert_eq!(paths.iter().filter(|p| *p == "/away").count(), 1);
}

#[tokio::test]
async fn prober_finds_the_listening_port() {
    let server = TestServer::edge(0, 200);
    let open = loopback(server.port());

    let probes = tokio::task::spawn_blocking(move || scanner::probe_all(&[open], 1, &NullSink))
        .await
        .unwrap();

    assert_eq!(probes.len(), 1);
    assert_eq!(probes[0].candidate, open);
    assert!(probes[0].tcp_latency_ms > 0.0);
}

#[tokio::test]
async fn pipeline_ranks_a_reachable_endpoint() {
    let server = TestServer::edge(1024 * 1024, 200);

    let (results, events) = run_pipeline(settings_for(&server)).await;

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.candidate, loopback(server.port()));
    assert_eq!(result.pop, PopLabel::Known("TST".to_string()));
    assert!(result.download_speed > 0.0);
    assert!(matches!(result.score, Score::Rated(s) if s > 0.0));

    let terminal: Vec<&PipelineEvent> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal, vec![&PipelineEvent::Complete { results: 1 }]);
    assert_eq!(events.last(), Some(&PipelineEvent::Complete { results: 1 }));
    assert!(events.contains(&PipelineEvent::ScanProgress { done: 1, total: 1, valid: 1 }));
    assert!(events.contains(&PipelineEvent::ColoProgress { done: 1, total: 1 }));
    assert!(events.iter().any(|e| matches!(e, PipelineEvent::Row(_))));
}

#[tokio::test]
async fn pipeline_discards_blocked_endpoints() {
    let server = TestServer::edge(0, 429);

    let (results, events) = run_pipeline(settings_for(&server)).await;

    assert!(results.is_empty());
    assert!(!events.iter().any(|e| matches!(e, PipelineEvent::Row(_))));
    match events.last() {
        Some(PipelineEvent::Error(msg)) => assert!(msg.starts_with("All tested endpoints were blocked")),
        other => panic!("expected an error event, got {other:?}"),
    }
}

#[tokio::test]
async fn pipeline_records_blocked_endpoints_when_asked() {
    let server = TestServer::edge(0, 429);
    let settings = Settings {
        skip_blocked: false,
        ..settings_for(&server)
    };

    let (results, events) = run_pipeline(settings).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].is_rate_limited());
    assert_eq!(results[0].download_speed, 0.0);
    assert_eq!(events.last(), Some(&PipelineEvent::Complete { results: 1 }));
}
