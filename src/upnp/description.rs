use crate::scanner::RootDevice;
use crate::upnp::error::{UpnpError, UpnpResult};
use crate::upnp::xml;
use reqwest::{Client, Url};
use std::time::Duration;

/// Settings shared by the network-backed ports
#[derive(Debug, Clone)]
pub struct UpnpConfig {
    /// Timeout for each HTTP request (description fetch or SOAP call)
    pub request_timeout: Duration,

    /// How long to collect SSDP answers after sending a search
    pub search_window: Duration,
}

impl Default for UpnpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            search_window: Duration::from_secs(3),
        }
    }
}

impl UpnpConfig {
    pub fn http_client(&self) -> UpnpResult<Client> {
        Ok(Client::builder().timeout(self.request_timeout).build()?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub service_type: String,
    pub control_url: String,
}

/// The parts of a root device description this exporter uses
#[derive(Debug, Clone)]
pub struct DeviceDescription {
    pub location: Url,
    pub url_base: Option<Url>,
    pub device_type: Option<String>,
    pub friendly_name: Option<String>,
    pub services: Vec<ServiceEntry>,
}

impl DeviceDescription {
    pub fn parse(body: &str, location: &Url) -> UpnpResult<Self> {
        let device =
            xml::element(body, "device").ok_or_else(|| UpnpError::MissingElement("device".into()))?;

        let url_base = match xml::element(body, "URLBase").filter(|b| !b.is_empty()) {
            Some(base) => Some(
                Url::parse(&xml::unescape(base))
                    .map_err(|e| UpnpError::InvalidUrl(format!("URLBase {base}: {e}")))?,
            ),
            None => None,
        };

        let services = xml::elements(body, "service")
            .into_iter()
            .filter_map(|service| {
                Some(ServiceEntry {
                    service_type: xml::element(service, "serviceType")?.to_string(),
                    control_url: xml::unescape(xml::element(service, "controlURL")?),
                })
            })
            .collect();

        Ok(Self {
            location: location.clone(),
            url_base,
            device_type: xml::element(device, "deviceType").map(str::to_string),
            friendly_name: xml::element(device, "friendlyName").map(xml::unescape),
            services,
        })
    }

    /// Fetch and parse the description served at `location`
    pub async fn fetch(client: &Client, location: &Url) -> UpnpResult<Self> {
        let response = client.get(location.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpnpError::Transport(format!(
                "description fetch from {location} returned {status}"
            )));
        }

        let body = response.text().await?;
        Self::parse(&body, location)
    }

    pub fn services_of_type(&self, service_type: &str) -> Vec<&ServiceEntry> {
        self.services
            .iter()
            .filter(|s| s.service_type == service_type)
            .collect()
    }

    /// Control URL of `service`, resolved against URLBase or the location
    pub fn control_url(&self, service: &ServiceEntry) -> UpnpResult<Url> {
        let base = self.url_base.as_ref().unwrap_or(&self.location);
        base.join(&service.control_url)
            .map_err(|e| UpnpError::InvalidUrl(format!("{}: {e}", service.control_url)))
    }

    pub fn root_device(&self) -> RootDevice {
        RootDevice {
            location: self.location.clone(),
            url_base: self.url_base.clone(),
            device_type: self.device_type.clone(),
            friendly_name: self.friendly_name.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) const SAMPLE_DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <URLBase>http://192.168.178.1:49000</URLBase>
  <device>
    <deviceType>urn:schemas-upnp-org:device:InternetGatewayDevice:1</deviceType>
    <friendlyName>FRITZ!Box 7530</friendlyName>
    <serviceList>
      <service>
        <serviceType>urn:schemas-any-com:service:Any:1</serviceType>
        <controlURL>/igdupnp/control/any</controlURL>
      </service>
    </serviceList>
    <deviceList>
      <device>
        <deviceType>urn:schemas-upnp-org:device:WANDevice:1</deviceType>
        <serviceList>
          <service>
            <serviceType>urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1</serviceType>
            <serviceId>urn:upnp-org:serviceId:WANCommonIFC1</serviceId>
            <controlURL>/igdupnp/control/WANCommonIFC1</controlURL>
            <SCPDURL>/igdicfgSCPD.xml</SCPDURL>
          </service>
        </serviceList>
      </device>
    </deviceList>
  </device>
</root>"#;
