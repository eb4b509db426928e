use crate::scanner::{RouterEndpoint, RouterStats, StatsSource};
use crate::upnp::description::{DeviceDescription, UpnpConfig};
use crate::upnp::error::{UpnpError, UpnpResult};
use crate::upnp::xml;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::str::FromStr;

pub const WAN_COMMON_INTERFACE_CONFIG: &str =
    "urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1";

/// Reads traffic counters from the `WANCommonInterfaceConfig:1` service of an
/// Internet Gateway Device.
pub struct IgdStatsClient {
    client: Client,
}

impl IgdStatsClient {
    pub fn new(config: &UpnpConfig) -> UpnpResult<Self> {
        Ok(Self {
            client: config.http_client()?,
        })
    }

    async fn control_url(&self, endpoint: &RouterEndpoint) -> UpnpResult<Url> {
        let description = DeviceDescription::fetch(&self.client, endpoint.url()).await?;
        let services = description.services_of_type(WAN_COMMON_INTERFACE_CONFIG);

        let Some(service) = services.first() else {
            return Err(UpnpError::NoService(endpoint.to_string()));
        };
        if services.len() > 1 {
            tracing::warn!(
                router = %endpoint,
                services = services.len(),
                "Router yielded several WANCommonInterfaceConfig services, using the first one"
            );
        }

        description.control_url(service)
    }

    /// Invoke one argument-less action and return the text of `field`
    async fn call_action(&self, control_url: &Url, action: &str, field: &str) -> UpnpResult<String> {
        let response = self
            .client
            .post(control_url.clone())
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .header("SOAPAction", format!("\"{WAN_COMMON_INTERFACE_CONFIG}#{action}\""))
            .body(soap_envelope(action))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpnpError::Soap {
                action: action.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        xml::element(&body, field)
            .map(str::to_string)
            .ok_or_else(|| UpnpError::MissingElement(field.to_string()))
    }

    async fn counter<T: FromStr>(&self, control_url: &Url, action: &str, field: &str) -> UpnpResult<T> {
        let value = self.call_action(control_url, action, field).await?;
        parse_counter(field, &value)
    }
}

#[async_trait]
impl StatsSource for IgdStatsClient {
    async fn query_stats(&self, endpoint: &RouterEndpoint) -> UpnpResult<RouterStats> {
        let control_url = self.control_url(endpoint).await?;

        let packets_received = self
            .counter(&control_url, "GetTotalPacketsReceived", "NewTotalPacketsReceived")
            .await?;
        let packets_sent = self
            .counter(&control_url, "GetTotalPacketsSent", "NewTotalPacketsSent")
            .await?;
        let bytes_received = self
            .counter(&control_url, "GetTotalBytesReceived", "NewTotalBytesReceived")
            .await?;
        let bytes_sent = self
            .counter(&control_url, "GetTotalBytesSent", "NewTotalBytesSent")
            .await?;

        Ok(RouterStats {
            router: endpoint.to_string(),
            packets_sent,
            packets_received,
            bytes_sent,
            bytes_received,
        })
    }
}

pub fn soap_envelope(action: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
<s:Body><u:{action} xmlns:u="{WAN_COMMON_INTERFACE_CONFIG}"></u:{action}></s:Body>
</s:Envelope>"#
    )
}

fn parse_counter<T: FromStr>(field: &str, value: &str) -> UpnpResult<T> {
    value.trim().parse().map_err(|_| UpnpError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upnp::description::SAMPLE_DESCRIPTION;

    #[test]
    fn test_soap_envelope() {
        let envelope = soap_envelope("GetTotalBytesSent");
        assert!(envelope.contains(
            r#"<u:GetTotalBytesSent xmlns:u="urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1">"#
        ));
        assert!(envelope.contains("</u:GetTotalBytesSent>"));
    }

    #[test]
    fn test_parse_counter_from_response() {
        let body = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
<s:Body>
<u:GetTotalBytesReceivedResponse xmlns:u="urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1">
<NewTotalBytesReceived>5368709120</NewTotalBytesReceived>
</u:GetTotalBytesReceivedResponse>
</s:Body>
</s:Envelope>"#;

        let value = xml::element(body, "NewTotalBytesReceived").unwrap();
        let bytes: u64 = parse_counter("NewTotalBytesReceived", value).unwrap();
        assert_eq!(bytes, 5_368_709_120);
    }

    #[test]
    fn test_packet_counter_rejects_overflow() {
        let result = parse_counter::<u32>("NewTotalPacketsSent", "5368709120");
        assert!(matches!(result, Err(UpnpError::InvalidValue { .. })));
    }

    #[test]
    fn test_finds_wan_common_interface_config() {
        let location = Url::parse("http://192.168.178.1:49000/igddesc.xml").unwrap();
        let description = DeviceDescription::parse(SAMPLE_DESCRIPTION, &location).unwrap();
        assert_eq!(description.services_of_type(WAN_COMMON_INTERFACE_CONFIG).len(), 1);
    }
}
