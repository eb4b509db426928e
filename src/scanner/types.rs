use reqwest::Url;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::upnp::UpnpError;

/// Device type searched for when no explicit router is given
pub const GATEWAY_DEVICE_TYPE: &str = "urn:schemas-upnp-org:device:InternetGatewayDevice:1";

/// Address of one gateway: the location of its root device description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouterEndpoint(Url);

impl RouterEndpoint {
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for RouterEndpoint {
    type Err = UpnpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Url::parse(s)
            .map(Self)
            .map_err(|e| UpnpError::InvalidUrl(format!("{s}: {e}")))
    }
}

impl fmt::Display for RouterEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Counters read from one router in one scan cycle.
///
/// Packet counters are 32-bit and wrap on busy links; no wraparound correction
/// is attempted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterStats {
    pub router: String,
    pub packets_sent: u32,
    pub packets_received: u32,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Result of one scan cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSnapshot {
    stats: Vec<RouterStats>,
}

impl ScanSnapshot {
    pub fn new(stats: Vec<RouterStats>) -> Self {
        Self { stats }
    }

    pub fn stats(&self) -> &[RouterStats] {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn routers(&self) -> Vec<&str> {
        self.stats.iter().map(|s| s.router.as_str()).collect()
    }
}

impl IntoIterator for ScanSnapshot {
    type Item = RouterStats;
    type IntoIter = std::vec::IntoIter<RouterStats>;

    fn into_iter(self) -> Self::IntoIter {
        self.stats.into_iter()
    }
}

impl<'a> IntoIterator for &'a ScanSnapshot {
    type Item = &'a RouterStats;
    type IntoIter = std::slice::Iter<'a, RouterStats>;

    fn into_iter(self) -> Self::IntoIter {
        self.stats.iter()
    }
}

/// What a description fetch revealed about a discovered root device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDevice {
    pub location: Url,
    pub url_base: Option<Url>,
    pub device_type: Option<String>,
    pub friendly_name: Option<String>,
}

/// One candidate returned by discovery
#[derive(Debug)]
pub enum DiscoveryResult {
    Found {
        endpoint: RouterEndpoint,
        root: RootDevice,
    },
    Failed {
        location: String,
        error: UpnpError,
    },
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Upper bound for one router's stats query
    pub query_timeout: Duration,

    /// Upper bound for one discovery pass, including description fetches
    pub discovery_timeout: Duration,

    /// Upper bound for one `report_stats` pass over all routers. Routers share
    /// what is left of it, so a run of dead routers cannot starve the rest.
    pub cycle_timeout: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(10),
            discovery_timeout: Duration::from_secs(15),
            cycle_timeout: Duration::from_secs(25),
        }
    }
}
