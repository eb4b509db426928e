use crate::scanner::ScanError;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Failed to scan router(s): {0}")]
    Collection(#[from] ScanError),

    #[error("Scan did not finish within {0:?}")]
    ScrapeTimeout(Duration),

    #[error("Failed to bind metrics listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Metrics server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Graceful shutdown did not finish within {0:?}")]
    ShutdownTimeout(Duration),
}

pub type MetricsResult<T> = Result<T, MetricsError>;
