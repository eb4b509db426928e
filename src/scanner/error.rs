use crate::upnp::UpnpError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Router discovery failed: {0}")]
    Discovery(#[source] UpnpError),

    #[error("Router discovery timed out after {0:?}")]
    DiscoveryTimeout(std::time::Duration),

    #[error("Failed to retrieve stats for {router}: {source}")]
    StatsQuery {
        router: String,
        #[source]
        source: UpnpError,
    },

    #[error("Stats query for {router} timed out after {timeout:?}")]
    StatsTimeout {
        router: String,
        timeout: std::time::Duration,
    },

    #[error("Scanner unavailable: {0}")]
    Unavailable(String),
}

pub type ScanResult<T> = Result<T, ScanError>;
