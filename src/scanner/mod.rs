//! Router scanner
//!
//! Resolves the set of gateways to watch and reads their traffic counters,
//! keeping one unreachable router from affecting the rest.

mod error;
pub mod fake;
mod ports;
mod scanner;
mod types;

pub use error::{ScanError, ScanResult};
pub use ports::{DeviceDiscovery, NetworkScanner, StatsSource};
pub use scanner::RouterScanner;
pub use types::{
    DiscoveryResult, RootDevice, RouterEndpoint, RouterStats, ScanSnapshot, ScannerConfig,
    GATEWAY_DEVICE_TYPE,
};
