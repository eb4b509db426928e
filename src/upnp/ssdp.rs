use crate::scanner::{DeviceDiscovery, DiscoveryResult, RouterEndpoint};
use crate::upnp::description::{DeviceDescription, UpnpConfig};
use crate::upnp::error::{UpnpError, UpnpResult};
use async_trait::async_trait;
use futures::future;
use reqwest::{Client, Url};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use tokio::net::UdpSocket;
use tokio::time::{self, Instant};

pub const SSDP_MULTICAST_ADDR: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 1900);

/// Seconds a device may wait before answering a search
const SEARCH_MX: u64 = 2;

/// Discovers root devices with an SSDP M-SEARCH, then fetches each
/// responder's description.
pub struct SsdpDiscovery {
    client: Client,
    config: UpnpConfig,
}

/// Headers of interest from one search response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub location: String,
    pub search_target: Option<String>,
    pub usn: Option<String>,
}

impl SsdpDiscovery {
    pub fn new(config: UpnpConfig) -> UpnpResult<Self> {
        Ok(Self {
            client: config.http_client()?,
            config,
        })
    }

    fn bind_socket() -> UpnpResult<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_multicast_ttl_v4(2)?;
        socket.set_nonblocking(true)?;
        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        socket.bind(&bind_addr.into())?;

        Ok(UdpSocket::from_std(socket.into())?)
    }

    /// Send one search and collect the distinct locations that answered
    pub async fn search(&self, device_type: &str) -> UpnpResult<Vec<String>> {
        let socket = Self::bind_socket()?;
        let request = search_request(device_type, SEARCH_MX);
        socket
            .send_to(request.as_bytes(), SocketAddr::V4(SSDP_MULTICAST_ADDR))
            .await?;

        let deadline = Instant::now() + self.config.search_window;
        let mut locations: Vec<String> = Vec::new();
        let mut buf = [0u8; 2048];

        loop {
            let (len, from) = match time::timeout_at(deadline, socket.recv_from(&mut buf)).await {
                Ok(received) => received?,
                Err(_) => break,
            };

            let datagram = String::from_utf8_lossy(&buf[..len]);
            match parse_search_response(&datagram) {
                Some(response) => {
                    if !locations.contains(&response.location) {
                        tracing::debug!(
                            from = %from,
                            location = %response.location,
                            usn = response.usn.as_deref().unwrap_or("-"),
                            "SSDP response"
                        );
                        locations.push(response.location);
                    }
                }
                None => tracing::debug!(from = %from, "Ignoring malformed SSDP datagram"),
            }
        }

        if locations.is_empty() {
            return Err(UpnpError::NoDevices(device_type.to_string()));
        }

        Ok(locations)
    }

    /// Fetch every candidate's description concurrently, keeping candidate
    /// order. Each fetch is bounded by the request timeout on its own.
    pub async fn resolve_all(&self, locations: Vec<String>) -> Vec<DiscoveryResult> {
        future::join_all(locations.into_iter().map(|location| self.resolve(location))).await
    }

    async fn resolve(&self, location: String) -> DiscoveryResult {
        let url = match Url::parse(&location) {
            Ok(url) => url,
            Err(e) => {
                return DiscoveryResult::Failed {
                    error: UpnpError::InvalidUrl(format!("{location}: {e}")),
                    location,
                }
            }
        };

        let timeout = self.config.request_timeout;
        match time::timeout(timeout, DeviceDescription::fetch(&self.client, &url)).await {
            Ok(Ok(description)) => DiscoveryResult::Found {
                endpoint: RouterEndpoint::new(url),
                root: description.root_device(),
            },
            Ok(Err(error)) => DiscoveryResult::Failed { location, error },
            Err(_) => DiscoveryResult::Failed {
                error: UpnpError::Timeout {
                    what: format!("description fetch from {location}"),
                    after: timeout,
                },
                location,
            },
        }
    }
}

#[async_trait]
impl DeviceDiscovery for SsdpDiscovery {
    async fn discover_devices(&self, device_type: &str) -> UpnpResult<Vec<DiscoveryResult>> {
        let locations = self.search(device_type).await?;
        Ok(self.resolve_all(locations).await)
    }
}

pub fn search_request(device_type: &str, mx: u64) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {SSDP_MULTICAST_ADDR}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {mx}\r\n\
         ST: {device_type}\r\n\
         \r\n"
    )
}

/// Parse an SSDP `HTTP/1.1 200 OK` answer. Returns `None` for anything else
/// (other devices' NOTIFY chatter, answers without a location).
pub fn parse_search_response(datagram: &str) -> Option<SearchResponse> {
    let mut lines = datagram.lines();
    let status = lines.next()?;
    if !status.starts_with("HTTP/") || !status.contains(" 200") {
        return None;
    }

    let mut location = None;
    let mut search_target = None;
    let mut usn = None;

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match name.trim().to_ascii_uppercase().as_str() {
            "LOCATION" => location = Some(value),
            "ST" => search_target = Some(value),
            "USN" => usn = Some(value),
            _ => {}
        }
    }

    Some(SearchResponse {
        location: location.filter(|l| !l.is_empty())?,
        search_target,
        usn,
    })
}
