use crate::metrics::error::{MetricsError, MetricsResult};
use crate::metrics::recorder::{MetricKind, MetricStore};
use crate::scanner::{NetworkScanner, RouterStats, ScanSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

pub const NAMESPACE: &str = "upnp";
pub const SUBSYSTEM: &str = "stats";
pub const ROUTER_LABEL: &str = "router";

/// Join the non-empty parts with `_`, e.g. `upnp_stats_sent_bytes`
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// The four counters exported per router, in exposition order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    PacketsSent,
    PacketsReceived,
    BytesSent,
    BytesReceived,
}

impl StatKind {
    pub const ALL: [StatKind; 4] = [
        StatKind::PacketsSent,
        StatKind::PacketsReceived,
        StatKind::BytesSent,
        StatKind::BytesReceived,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            StatKind::PacketsSent => "sent_packets",
            StatKind::PacketsReceived => "received_packets",
            StatKind::BytesSent => "sent_bytes",
            StatKind::BytesReceived => "received_bytes",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            StatKind::PacketsSent => "Total number of packets sent by the router",
            StatKind::PacketsReceived => "Total number of packets received by the router",
            StatKind::BytesSent => "Total number of bytes sent by the router",
            StatKind::BytesReceived => "Total number of bytes received by the router",
        }
    }

    pub fn reading(self, stats: &RouterStats) -> u64 {
        match self {
            StatKind::PacketsSent => u64::from(stats.packets_sent),
            StatKind::PacketsReceived => u64::from(stats.packets_received),
            StatKind::BytesSent => stats.bytes_sent,
            StatKind::BytesReceived => stats.bytes_received,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: &'static str,
    pub labels: Vec<&'static str>,
}

/// One value for one router
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub router: String,
    pub value: f64,

    /// The exact counter reading `value` was converted from
    pub reading: u64,
}

impl Sample {
    pub fn label(&self, name: &str) -> Option<&str> {
        (name == ROUTER_LABEL).then_some(self.router.as_str())
    }
}

fn descriptors(names: &[String; 4]) -> Vec<MetricDescriptor> {
    StatKind::ALL
        .iter()
        .zip(names.iter())
        .map(|(kind, name)| MetricDescriptor {
            name: name.clone(),
            help: kind.help(),
            labels: vec![ROUTER_LABEL],
        })
        .collect()
}

/// Turns scanner output into Prometheus samples.
///
/// Pull mode: [`render`](StatsCollector::render) scans on every request and
/// encodes only that scan. Poll mode: [`record`](StatsCollector::record) writes
/// into a gauge store that keeps a router's last value until it is overwritten,
/// so a router that stops answering keeps showing its last reading.
pub struct StatsCollector {
    scanner: Arc<dyn NetworkScanner>,
    names: [String; 4],
    scrape_timeout: Duration,
    gauges: MetricStore,
}

impl StatsCollector {
    pub fn new(scanner: Arc<dyn NetworkScanner>) -> Self {
        let names = StatKind::ALL.map(|kind| fq_name(NAMESPACE, SUBSYSTEM, kind.suffix()));
        let gauges = MetricStore::new(MetricKind::Gauge, &descriptors(&names));

        Self {
            scanner,
            names,
            scrape_timeout: Duration::from_secs(30),
            gauges,
        }
    }

    /// Upper bound on one scan started by a pull
    pub fn with_scrape_timeout(mut self, timeout: Duration) -> Self {
        self.scrape_timeout = timeout;
        self
    }

    pub fn scanner(&self) -> &Arc<dyn NetworkScanner> {
        &self.scanner
    }

    /// The four exported metrics. Does not touch the scanner.
    pub fn describe(&self) -> Vec<MetricDescriptor> {
        descriptors(&self.names)
    }

    /// Run one scan, bounded by the scrape timeout
    pub async fn scan(&self) -> MetricsResult<ScanSnapshot> {
        let snapshot = time::timeout(self.scrape_timeout, self.scanner.report_network_stats())
            .await
            .map_err(|_| MetricsError::ScrapeTimeout(self.scrape_timeout))??;
        Ok(snapshot)
    }

    /// Scan and convert. A failed scan yields no samples at all.
    pub async fn collect(&self) -> Vec<Sample> {
        match self.scan().await {
            Ok(snapshot) => self.samples(&snapshot),
            Err(e) => {
                tracing::error!(error = %e, "Failed to scan router(s)");
                Vec::new()
            }
        }
    }

    /// Four samples per router, in descriptor order
    pub fn samples(&self, snapshot: &ScanSnapshot) -> Vec<Sample> {
        let mut samples = Vec::with_capacity(snapshot.len() * StatKind::ALL.len());
        for stats in snapshot {
            for (kind, name) in StatKind::ALL.iter().zip(self.names.iter()) {
                let reading = kind.reading(stats);
                samples.push(Sample {
                    name: name.clone(),
                    router: stats.router.clone(),
                    value: reading as f64,
                    reading,
                });
            }
        }
        samples
    }

    /// Scan now and encode the result as Prometheus text
    pub async fn render(&self) -> String {
        let samples = self.collect().await;
        let store = MetricStore::new(MetricKind::Counter, &self.describe());
        store.set(&samples);
        store.render()
    }

    /// Overwrite the gauge store with `snapshot`
    pub fn record(&self, snapshot: &ScanSnapshot) {
        self.gauges.set(&self.samples(snapshot));
    }

    /// Encode the gauge store as Prometheus text
    pub fn render_recorded(&self) -> String {
        self.gauges.render()
    }
}
