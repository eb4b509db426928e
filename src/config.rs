use crate::scanner::{RouterEndpoint, ScannerConfig};
use crate::upnp::UpnpConfig;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Headroom for a discovery pass beyond the search window and one fetch
const DISCOVERY_SLACK: Duration = Duration::from_secs(1);

/// Share of the scrape timeout a scan cycle may use
const CYCLE_SHARE: f64 = 0.8;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid router URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid duration {0:?}: expected e.g. 30s, 500ms, 2m")]
    InvalidDuration(String),
}

/// Exporter configuration
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Address the HTTP listener binds to
    pub listen_addr: SocketAddr,

    /// Path for metrics endpoint (default: "/metrics")
    pub metrics_path: String,

    /// Scan only this router instead of discovering
    pub router: Option<RouterEndpoint>,

    /// Poll on this interval instead of scanning on each scrape
    pub poll_interval: Option<Duration>,

    /// Re-run discovery every N poll cycles
    pub rediscover_every: Option<u32>,

    pub scanner: ScannerConfig,
    pub upnp: UpnpConfig,

    /// Upper bound for a scan triggered by a scrape
    pub scrape_timeout: Duration,

    /// How long in-flight requests may take to finish on shutdown
    pub shutdown_grace: Duration,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            metrics_path: "/metrics".to_string(),
            router: None,
            poll_interval: None,
            rediscover_every: None,
            scanner: ScannerConfig::default(),
            upnp: UpnpConfig::default(),
            scrape_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

impl ExporterConfig {
    pub fn builder() -> ExporterConfigBuilder {
        ExporterConfigBuilder::new()
    }
}

/// Builder for exporter configuration
pub struct ExporterConfigBuilder {
    config: ExporterConfig,
}

impl ExporterConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ExporterConfig::default(),
        }
    }

    /// Listen on all interfaces at `port`
    pub fn port(mut self, port: u16) -> Self {
        self.config.listen_addr.set_port(port);
        self
    }

    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.config.metrics_path = path.into();
        self
    }

    pub fn router_url(mut self, url: Option<&str>) -> Result<Self, ConfigError> {
        self.config.router = match url.filter(|u| !u.is_empty()) {
            Some(url) => Some(
                url.parse()
                    .map_err(|_| ConfigError::InvalidUrl(url.to_string()))?,
            ),
            None => None,
        };
        Ok(self)
    }

    pub fn poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn rediscover_every(mut self, cycles: Option<u32>) -> Self {
        self.config.rediscover_every = cycles.filter(|c| *c > 0);
        self
    }

    /// Timeout for one router query and for each HTTP request inside it
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.config.scanner.query_timeout = timeout;
        self.config.upnp.request_timeout = timeout;
        self
    }

    pub fn search_window(mut self, window: Duration) -> Self {
        self.config.upnp.search_window = window;
        self
    }

    pub fn scrape_timeout(mut self, timeout: Duration) -> Self {
        self.config.scrape_timeout = timeout;
        self
    }

    /// Finish the configuration. Scanner budgets are derived from the
    /// request, search and scrape timeouts: a discovery pass outlasts the
    /// search window plus one description fetch, and a scan cycle ends before
    /// the scrape that started it times out.
    pub fn build(mut self) -> ExporterConfig {
        let upnp = &self.config.upnp;
        self.config.scanner.discovery_timeout =
            upnp.search_window + upnp.request_timeout + DISCOVERY_SLACK;
        self.config.scanner.cycle_timeout = self.config.scrape_timeout.mul_f64(CYCLE_SHARE);
        self.config
    }
}

impl Default for ExporterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `30s`, `500ms`, `2m`, `1h` or a bare number of seconds
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    let invalid = || ConfigError::InvalidDuration(value.to_string());

    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: u64 = number.parse().map_err(|_| invalid())?;

    let secs = |factor: u64| {
        number
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(invalid)
    };

    match unit {
        "" | "s" => Ok(Duration::from_secs(number)),
        "ms" => Ok(Duration::from_millis(number)),
        "m" => secs(60),
        "h" => secs(3600),
        _ => Err(invalid()),
    }
}
