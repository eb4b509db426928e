use std::sync::Arc;
use std::time::{Duration, Instant};
use upnp_exporter::metrics::{StatsCollector, ROUTER_LABEL};
use upnp_exporter::scanner::fake::{FakeDiscovery, FakeScanner, FakeStats};
use upnp_exporter::scanner::{RouterScanner, RouterStats, ScanSnapshot, ScannerConfig};

const ROUTER: &str = "https://127.0.0.1";

fn one_router() -> ScanSnapshot {
    ScanSnapshot::new(vec![RouterStats {
        router: ROUTER.to_string(),
        packets_sent: 1,
        packets_received: 2,
        bytes_sent: 10,
        bytes_received: 20,
    }])
}

#[tokio::test]
async fn test_collect() {
    let collector = StatsCollector::new(Arc::new(FakeScanner::returning(one_router())));

    let samples = collector.collect().await;
    assert_eq!(samples.len(), 4);

    let expected = [
        ("upnp_stats_sent_packets", 1.0),
        ("upnp_stats_received_packets", 2.0),
        ("upnp_stats_sent_bytes", 10.0),
        ("upnp_stats_received_bytes", 20.0),
    ];
    for (sample, (name, value)) in samples.iter().zip(expected) {
        assert_eq!(sample.name, name);
        assert_eq!(sample.value, value);
        assert_eq!(sample.label(ROUTER_LABEL), Some(ROUTER));
    }
}

#[tokio::test]
async fn test_collect_fail() {
    let scanner = Arc::new(FakeScanner::failing(&format!("unable to scan {ROUTER}")));
    let collector = StatsCollector::new(scanner.clone());

    assert!(collector.collect().await.is_empty());
    assert_eq!(scanner.calls(), 1);
}

#[tokio::test]
async fn test_collect_does_not_block_on_hung_scanner() {
    let collector = StatsCollector::new(Arc::new(FakeScanner::hanging(Duration::from_secs(60))))
        .with_scrape_timeout(Duration::from_millis(100));

    let started = Instant::now();
    let samples = collector.collect().await;

    assert!(samples.is_empty());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_render_only_shows_current_scan() {
    // parsed endpoints gain a trailing slash
    let endpoint = "https://127.0.0.1/";
    let stats = Arc::new(FakeStats::new().ok(endpoint, 1, 2, 10, 20));
    let scanner = RouterScanner::new(
        Some(ROUTER.parse().unwrap()),
        Arc::new(FakeDiscovery::new()),
        stats.clone(),
        ScannerConfig::default(),
    )
    .await
    .unwrap();
    let collector = StatsCollector::new(Arc::new(scanner));

    let output = collector.render().await;
    assert!(output.contains("upnp_stats_sent_packets"));
    assert!(output.contains(r#"router="https://127.0.0.1/""#));

    stats.remove(endpoint);
    let output = collector.render().await;
    assert!(!output.contains("router="));
}

#[tokio::test]
async fn test_render_failed_scan_is_empty() {
    let collector = StatsCollector::new(Arc::new(FakeScanner::failing("scanner gone")));
    assert!(!collector.render().await.contains("router="));
}

#[tokio::test]
async fn test_slow_routers_do_not_empty_the_scrape() {
    let healthy = "http://192.168.1.1:5000/rootDesc.xml";
    let slow = [
        "http://192.168.1.2/desc.xml",
        "http://192.168.1.3/desc.xml",
        "http://192.168.1.4/desc.xml",
    ];

    let discovery = slow
        .iter()
        .fold(FakeDiscovery::new(), |d, router| d.found(router))
        .found(healthy);
    let stats = slow
        .iter()
        .fold(FakeStats::new().ok(healthy, 1, 2, 10, 20), |s, router| {
            s.delayed(router, Duration::from_secs(60))
        });
    let config = ScannerConfig {
        query_timeout: Duration::from_millis(100),
        cycle_timeout: Duration::from_millis(250),
        ..Default::default()
    };
    let scanner = RouterScanner::new(None, Arc::new(discovery), Arc::new(stats), config)
        .await
        .unwrap();
    let collector = StatsCollector::new(Arc::new(scanner))
        .with_scrape_timeout(Duration::from_millis(300));

    let samples = collector.collect().await;

    assert_eq!(samples.len(), 4);
    assert!(samples
        .iter()
        .all(|sample| sample.label(ROUTER_LABEL) == Some(healthy)));
}
