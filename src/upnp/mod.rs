//! Network-backed discovery and stats ports
//!
//! Speaks just enough UPnP to find Internet Gateway Devices (SSDP M-SEARCH,
//! device description) and read their WAN traffic counters over SOAP.

mod description;
mod error;
mod igd;
mod ssdp;
mod xml;

pub use description::{DeviceDescription, ServiceEntry, UpnpConfig};
pub use error::{UpnpError, UpnpResult};
pub use igd::{IgdStatsClient, WAN_COMMON_INTERFACE_CONFIG};
pub use ssdp::{parse_search_response, search_request, SearchResponse, SsdpDiscovery};
