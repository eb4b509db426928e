//! UPnP exporter
//!
//! Discovers UPnP Internet Gateway Devices, reads their WAN traffic counters
//! and exposes them as Prometheus metrics.

pub mod config;
pub mod metrics;
pub mod poller;
pub mod scanner;
pub mod upnp;

pub use config::{ExporterConfig, ExporterConfigBuilder};
pub use metrics::StatsCollector;
pub use poller::Poller;
pub use scanner::{RouterScanner, ScanSnapshot};
