use std::sync::Arc;
use upnp_exporter::scanner::fake::{FakeDiscovery, FakeStats};
use upnp_exporter::scanner::{RouterScanner, ScanError, ScannerConfig};

const ROUTERS: [&str; 4] = [
    "http://192.168.1.1:5000/rootDesc.xml",
    "http://192.168.1.2:49000/igddesc.xml",
    "http://10.0.0.1/desc.xml",
    "http://10.0.0.2:1900/gateway.xml",
];

async fn scanner_for(
    discovery: Arc<FakeDiscovery>,
    stats: Arc<FakeStats>,
) -> Result<RouterScanner, ScanError> {
    RouterScanner::new(None, discovery, stats, ScannerConfig::default()).await
}

#[tokio::test]
async fn test_failed_routers_are_left_out() {
    let discovery = ROUTERS
        .iter()
        .fold(FakeDiscovery::new(), |d, router| d.found(router));
    let stats = FakeStats::new()
        .ok(ROUTERS[0], 1, 2, 3, 4)
        .failing(ROUTERS[1], "connection refused")
        .ok(ROUTERS[2], 5, 6, 7, 8);
    // ROUTERS[3] is not scripted at all and fails as unreachable

    let stats = Arc::new(stats);
    let scanner = scanner_for(Arc::new(discovery), stats.clone())
        .await
        .unwrap();

    let snapshot = scanner.report_stats().await;
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.routers(), vec![ROUTERS[0], ROUTERS[2]]);
    assert_eq!(stats.calls(), 4);
}

#[tokio::test]
async fn test_no_reachable_routers_is_empty_snapshot() {
    let discovery = FakeDiscovery::new().found(ROUTERS[0]).found(ROUTERS[1]);
    let scanner = scanner_for(Arc::new(discovery), Arc::new(FakeStats::new()))
        .await
        .unwrap();

    assert!(scanner.report_stats().await.is_empty());
}

#[tokio::test]
async fn test_unresolvable_candidates_are_skipped() {
    let discovery = FakeDiscovery::new()
        .found(ROUTERS[0])
        .unresolvable("http://192.168.1.50:8080/desc.xml", "404 Not Found")
        .found(ROUTERS[1])
        .unresolvable("http://192.168.1.51/desc.xml", "connection reset");

    let scanner = scanner_for(Arc::new(discovery), Arc::new(FakeStats::new()))
        .await
        .unwrap();

    assert_eq!(scanner.list_endpoints(), vec![ROUTERS[0], ROUTERS[1]]);
}

#[tokio::test]
async fn test_discovery_replaces_routers() {
    let discovery = Arc::new(FakeDiscovery::new().found(ROUTERS[0]).found(ROUTERS[1]));
    let scanner = scanner_for(discovery.clone(), Arc::new(FakeStats::new()))
        .await
        .unwrap();

    discovery.answer_with(&[ROUTERS[2]]);
    scanner.discover().await.unwrap();

    assert_eq!(scanner.list_endpoints(), vec![ROUTERS[2]]);
}

#[tokio::test]
async fn test_failed_discovery_leaves_routers_unchanged() {
    let discovery = Arc::new(FakeDiscovery::new().found(ROUTERS[0]));
    let scanner = scanner_for(discovery.clone(), Arc::new(FakeStats::new()))
        .await
        .unwrap();

    discovery.fail_with("failed to discover devices");
    let result = scanner.discover().await;

    assert!(matches!(result, Err(ScanError::Discovery(_))));
    assert_eq!(scanner.list_endpoints(), vec![ROUTERS[0]]);

    discovery.answer_with(&[ROUTERS[1]]);
    scanner.discover().await.unwrap();
    assert_eq!(scanner.list_endpoints(), vec![ROUTERS[1]]);
}

#[tokio::test]
async fn test_repeated_scans_report_same_routers() {
    let discovery = FakeDiscovery::new().found(ROUTERS[0]).found(ROUTERS[2]);
    let stats = Arc::new(FakeStats::new().ok(ROUTERS[0], 1, 1, 1, 1).ok(ROUTERS[2], 2, 2, 2, 2));
    let scanner = scanner_for(Arc::new(discovery), stats.clone())
        .await
        .unwrap();

    let first = scanner.report_stats().await;
    stats.set_stats(upnp_exporter::scanner::RouterStats {
        router: ROUTERS[0].to_string(),
        packets_sent: 100,
        packets_received: 100,
        bytes_sent: 100,
        bytes_received: 100,
    });
    let second = scanner.report_stats().await;

    assert_eq!(first.routers(), second.routers());
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_explicit_router_never_discovers() {
    let discovery = Arc::new(FakeDiscovery::new().found(ROUTERS[1]));
    let scanner = RouterScanner::new(
        Some(ROUTERS[0].parse().unwrap()),
        discovery.clone(),
        Arc::new(FakeStats::new().ok(ROUTERS[0], 1, 2, 3, 4)),
        ScannerConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(scanner.list_endpoints(), vec![ROUTERS[0]]);
    assert_eq!(scanner.report_stats().await.len(), 1);
    assert_eq!(discovery.calls(), 0);
}

#[tokio::test]
async fn test_discovery_failure_fails_construction() {
    let discovery = Arc::new(FakeDiscovery::failing("no network"));
    let result = scanner_for(discovery, Arc::new(FakeStats::new())).await;

    match result {
        Err(ScanError::Discovery(e)) => assert!(e.to_string().contains("no network")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(scanner) => panic!(
            "expected an error, got a scanner with {:?}",
            scanner.list_endpoints()
        ),
    }
}

#[tokio::test]
async fn test_duplicate_endpoints_are_tolerated() {
    let discovery = FakeDiscovery::new().found(ROUTERS[0]).found(ROUTERS[0]);
    let scanner = scanner_for(
        Arc::new(discovery),
        Arc::new(FakeStats::new().ok(ROUTERS[0], 1, 1, 1, 1)),
    )
    .await
    .unwrap();

    let snapshot = scanner.report_stats().await;
    assert_eq!(snapshot.routers(), vec![ROUTERS[0], ROUTERS[0]]);
}
