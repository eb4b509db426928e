//! Capabilities the scanner consumes and the capability it offers.

use async_trait::async_trait;

use crate::scanner::error::ScanResult;
use crate::scanner::types::{DiscoveryResult, RouterEndpoint, RouterStats, ScanSnapshot};
use crate::upnp::UpnpResult;

/// Finds root devices of a given type on the local network.
///
/// An `Err` means the search itself failed. Candidates that answered but could
/// not be resolved come back as [`DiscoveryResult::Failed`].
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    async fn discover_devices(&self, device_type: &str) -> UpnpResult<Vec<DiscoveryResult>>;
}

/// Reads the four traffic counters of one router.
///
/// Implementations must fail the whole call if any counter cannot be read.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn query_stats(&self, endpoint: &RouterEndpoint) -> UpnpResult<RouterStats>;
}

/// What the metrics collector needs from a scanner.
#[async_trait]
pub trait NetworkScanner: Send + Sync {
    async fn report_network_stats(&self) -> ScanResult<ScanSnapshot>;

    fn routers(&self) -> Vec<String>;

    /// Re-run discovery, keeping the current routers if it fails
    async fn refresh(&self) {}
}
