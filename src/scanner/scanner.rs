use crate::scanner::error::{ScanError, ScanResult};
use crate::scanner::ports::{DeviceDiscovery, NetworkScanner, StatsSource};
use crate::scanner::types::{
    DiscoveryResult, RouterEndpoint, RouterStats, ScanSnapshot, ScannerConfig,
    GATEWAY_DEVICE_TYPE,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{self, Instant};

/// Scans UPnP gateways for traffic counters.
///
/// The endpoint list is resolved once, either from an explicit URL or by
/// discovery, and kept for the scanner's lifetime unless [`discover`] or
/// [`refresh`] replaces it.
///
/// [`discover`]: RouterScanner::discover
/// [`refresh`]: RouterScanner::refresh
pub struct RouterScanner {
    discovery: Arc<dyn DeviceDiscovery>,
    stats: Arc<dyn StatsSource>,
    config: ScannerConfig,

    // Swapped whole on rediscovery, never edited in place
    routers: RwLock<Arc<Vec<RouterEndpoint>>>,

    // Serializes scan cycles and discovery passes
    cycle: Mutex<()>,
}

impl RouterScanner {
    /// Create a scanner. With `router` set, only that endpoint is scanned and
    /// discovery is never run; otherwise the network is searched immediately and
    /// a failed search fails construction.
    pub async fn new(
        router: Option<RouterEndpoint>,
        discovery: Arc<dyn DeviceDiscovery>,
        stats: Arc<dyn StatsSource>,
        config: ScannerConfig,
    ) -> ScanResult<Self> {
        let scanner = Self {
            discovery,
            stats,
            config,
            routers: RwLock::new(Arc::new(Vec::new())),
            cycle: Mutex::new(()),
        };

        match router {
            Some(router) => {
                tracing::debug!(router = %router, "Using configured router");
                *scanner.routers.write() = Arc::new(vec![router]);
            }
            None => scanner.discover().await?,
        }

        Ok(scanner)
    }

    /// Search for gateways and replace the endpoint list with what was found.
    ///
    /// Candidates that fail to resolve are skipped. If the search itself fails,
    /// the current list is kept and the error returned.
    pub async fn discover(&self) -> ScanResult<()> {
        let _cycle = self.cycle.lock().await;

        let routers = self.discover_routers().await?;
        tracing::info!(routers = routers.len(), "Router discovery complete");
        *self.routers.write() = Arc::new(routers);

        Ok(())
    }

    /// Background variant of [`discover`](RouterScanner::discover): a failed
    /// search is logged and the current endpoints stay in place.
    pub async fn refresh(&self) {
        if let Err(e) = self.discover().await {
            tracing::warn!(
                error = %e,
                routers = self.routers.read().len(),
                "Unable to rediscover routers, keeping current list"
            );
        }
    }

    async fn discover_routers(&self) -> ScanResult<Vec<RouterEndpoint>> {
        let timeout = self.config.discovery_timeout;
        let devices = time::timeout(
            timeout,
            self.discovery.discover_devices(GATEWAY_DEVICE_TYPE),
        )
        .await
        .map_err(|_| ScanError::DiscoveryTimeout(timeout))?
        .map_err(ScanError::Discovery)?;

        let mut routers = Vec::with_capacity(devices.len());
        for device in devices {
            match device {
                DiscoveryResult::Found { endpoint, root } => {
                    tracing::debug!(
                        router = %endpoint,
                        name = root.friendly_name.as_deref().unwrap_or("-"),
                        "Router found"
                    );
                    routers.push(endpoint);
                }
                DiscoveryResult::Failed { location, error } => {
                    tracing::warn!(
                        location = %location,
                        error = %error,
                        "Failed to discover device, skipping"
                    );
                }
            }
        }

        Ok(routers)
    }

    /// Query every known router once.
    ///
    /// A router that fails or times out is left out of the snapshot; the others
    /// are still queried. The whole pass is bounded by `cycle_timeout`: each
    /// router gets at most an equal share of the time left, so whatever was
    /// read before the deadline is always returned.
    pub async fn report_stats(&self) -> ScanSnapshot {
        let _cycle = self.cycle.lock().await;
        let routers = self.routers.read().clone();
        let deadline = Instant::now() + self.config.cycle_timeout;

        let mut stats = Vec::with_capacity(routers.len());
        for (index, router) in routers.iter().enumerate() {
            let left = routers.len() - index;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(
                    skipped = left,
                    cycle_timeout = ?self.config.cycle_timeout,
                    "Scan cycle out of time, skipping remaining routers"
                );
                break;
            }

            let timeout = self.config.query_timeout.min(remaining / left as u32);
            match self.query_router(router, timeout).await {
                Ok(router_stats) => stats.push(router_stats),
                Err(e) => {
                    tracing::warn!(router = %router, error = %e, "Failed to retrieve router stats")
                }
            }
        }

        ScanSnapshot::new(stats)
    }

    async fn query_router(
        &self,
        router: &RouterEndpoint,
        timeout: Duration,
    ) -> ScanResult<RouterStats> {
        time::timeout(timeout, self.stats.query_stats(router))
            .await
            .map_err(|_| ScanError::StatsTimeout {
                router: router.to_string(),
                timeout,
            })?
            .map_err(|source| ScanError::StatsQuery {
                router: router.to_string(),
                source,
            })
    }

    /// String form of every known endpoint, in scan order
    pub fn list_endpoints(&self) -> Vec<String> {
        self.routers.read().iter().map(|r| r.to_string()).collect()
    }

    pub fn router_count(&self) -> usize {
        self.routers.read().len()
    }
}

#[async_trait]
impl NetworkScanner for RouterScanner {
    async fn report_network_stats(&self) -> ScanResult<ScanSnapshot> {
        Ok(self.report_stats().await)
    }

    fn routers(&self) -> Vec<String> {
        self.list_endpoints()
    }

    async fn refresh(&self) {
        RouterScanner::refresh(self).await
    }
}
