//! Background polling
//!
//! Scans on a fixed interval and records into the collector's gauge store.
//! There is no backoff or jitter. A router missing from a cycle keeps its
//! previous values in the store until it answers again.

use crate::metrics::StatsCollector;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;

pub struct Poller {
    collector: Arc<StatsCollector>,
    interval: Duration,
    rediscover_every: Option<u32>,
}

impl Poller {
    pub fn new(collector: Arc<StatsCollector>, interval: Duration) -> Self {
        Self {
            collector,
            interval,
            rediscover_every: None,
        }
    }

    /// Re-run discovery before every `cycles`-th scan
    pub fn rediscover_every(mut self, cycles: Option<u32>) -> Self {
        self.rediscover_every = cycles.filter(|c| *c > 0);
        self
    }

    /// One scan, recorded into the gauge store. Returns the number of routers
    /// that answered, or `None` if the scan failed.
    pub async fn poll_once(&self) -> Option<usize> {
        match self.collector.scan().await {
            Ok(snapshot) => {
                self.collector.record(&snapshot);
                tracing::debug!(routers = snapshot.len(), "Recorded router stats");
                Some(snapshot.len())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to scan router(s)");
                None
            }
        }
    }

    /// Poll until `shutdown` changes or its sender goes away
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval = ?self.interval, "Polling routers");
        let mut cycle: u64 = 0;

        loop {
            if let Some(every) = self.rediscover_every {
                if cycle > 0 && cycle % u64::from(every) == 0 {
                    self.collector.scanner().refresh().await;
                }
            }

            self.poll_once().await;
            cycle += 1;

            tokio::select! {
                _ = time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!(cycles = cycle, "Poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::fake::{FakeDiscovery, FakeStats};
    use crate::scanner::{RouterScanner, ScannerConfig};

    const ROUTER_A: &str = "http://10.0.0.1/desc.xml";
    const ROUTER_B: &str = "http://10.0.0.2/desc.xml";

    #[tokio::test]
    async fn test_poll_once_records_snapshot() {
        let stats = Arc::new(FakeStats::new().ok(ROUTER_A, 1, 2, 3, 4).ok(ROUTER_B, 5, 6, 7, 8));
        let scanner = RouterScanner::new(
            None,
            Arc::new(FakeDiscovery::new().found(ROUTER_A).found(ROUTER_B)),
            stats.clone(),
            ScannerConfig::default(),
        )
        .await
        .unwrap();
        let collector = Arc::new(StatsCollector::new(Arc::new(scanner)));
        let poller = Poller::new(collector.clone(), Duration::from_secs(30));

        assert_eq!(poller.poll_once().await, Some(2));

        // B stops answering but keeps its last reading
        stats.remove(ROUTER_B);
        assert_eq!(poller.poll_once().await, Some(1));

        let output = collector.render_recorded();
        assert!(output.contains(&format!(r#"upnp_stats_sent_packets{{router="{ROUTER_B}"}} 5"#)));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let scanner = RouterScanner::new(
            None,
            Arc::new(FakeDiscovery::new().found(ROUTER_A)),
            Arc::new(FakeStats::new().ok(ROUTER_A, 1, 1, 1, 1)),
            ScannerConfig::default(),
        )
        .await
        .unwrap();
        let collector = Arc::new(StatsCollector::new(Arc::new(scanner)));
        let poller = Poller::new(collector, Duration::from_secs(3600));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(poller.run(rx));
        tx.send(true).unwrap();

        time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("poller did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_rediscovery_cadence() {
        let discovery = Arc::new(FakeDiscovery::new().found(ROUTER_A));
        let scanner = RouterScanner::new(
            None,
            discovery.clone(),
            Arc::new(FakeStats::new().ok(ROUTER_A, 1, 1, 1, 1)),
            ScannerConfig::default(),
        )
        .await
        .unwrap();
        let collector = Arc::new(StatsCollector::new(Arc::new(scanner)));
        let poller = Poller::new(collector, Duration::from_millis(10)).rediscover_every(Some(2));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(poller.run(rx));
        time::sleep(Duration::from_millis(200)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        // construction plus at least one refresh
        assert!(discovery.calls() >= 2);
    }
}
