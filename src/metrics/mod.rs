//! Metrics and observability module
//!
//! Converts router scans into Prometheus metrics:
//! - `upnp_stats_sent_packets`
//! - `upnp_stats_received_packets`
//! - `upnp_stats_sent_bytes`
//! - `upnp_stats_received_bytes`
//!
//! each labeled with the router it was read from.

pub mod collector;
mod error;
pub mod exporter;
pub mod recorder;

pub use collector::{fq_name, MetricDescriptor, Sample, StatKind, StatsCollector, ROUTER_LABEL};
pub use error::{MetricsError, MetricsResult};
pub use exporter::{bind, metrics_router, serve, RoutersResponse, ScrapeMode};
pub use recorder::{MetricKind, MetricStore};
