//! Internet routers and their subnets

use crate::client::{SakuraClient, flexible_id};
use async_trait::async_trait;
use reqwest::Method;
use sakuraform_cloud::SharedParentApi;
use sakuraform_cloud::model::{InternetRecord, SubnetRecord, SubnetSpec, SubnetUpdate};
use serde::Deserialize;
use serde_json::json;

type CloudResult<T> = sakuraform_cloud::Result<T>;

/// Internet routers of one zone
pub struct InternetApi {
    client: SakuraClient,
}

impl InternetApi {
    pub fn new(client: SakuraClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SharedParentApi for InternetApi {
    async fn add_subnet(&self, internet_id: &str, spec: &SubnetSpec) -> CloudResult<String> {
        let body = json!({
            "NetworkMaskLen": spec.netmask,
            "NextHop": spec.next_hop,
        });
        let response: SubnetEnvelope = self
            .client
            .post(&format!("internet/{}/subnet", internet_id), &body)
            .await?;
        Ok(response.subnet.id)
    }

    async fn update_subnet(
        &self,
        internet_id: &str,
        subnet_id: &str,
        update: &SubnetUpdate,
    ) -> CloudResult<()> {
        let body = json!({ "NextHop": update.next_hop });
        self.client
            .send(
                Method::PUT,
                &format!("internet/{}/subnet/{}", internet_id, subnet_id),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    async fn delete_subnet(&self, internet_id: &str, subnet_id: &str) -> CloudResult<()> {
        self.client
            .send::<()>(
                Method::DELETE,
                &format!("internet/{}/subnet/{}", internet_id, subnet_id),
                None,
            )
            .await?;
        Ok(())
    }

    async fn read_subnet(&self, subnet_id: &str) -> CloudResult<SubnetRecord> {
        let response: SubnetEnvelope = self.client.get(&format!("subnet/{}", subnet_id)).await?;
        Ok(response.subnet.into())
    }

    async fn read_internet(&self, internet_id: &str) -> CloudResult<InternetRecord> {
        let response: InternetEnvelope = self
            .client
            .get(&format!("internet/{}", internet_id))
            .await?;
        Ok(response.internet.into())
    }

    async fn update_bandwidth(&self, internet_id: &str, band_width_mbps: u32) -> CloudResult<String> {
        let body = json!({ "Internet": { "BandWidthMbps": band_width_mbps } });
        let response: InternetEnvelope = self
            .client
            .put(&format!("internet/{}/bandwidth", internet_id), &body)
            .await?;
        Ok(response.internet.id)
    }

    async fn delete_internet(&self, internet_id: &str) -> CloudResult<()> {
        self.client
            .send::<()>(Method::DELETE, &format!("internet/{}", internet_id), None)
            .await?;
        Ok(())
    }
}

// API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SubnetEnvelope {
    subnet: SubnetDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SubnetDto {
    #[serde(rename = "ID", deserialize_with = "flexible_id")]
    id: String,
    #[serde(default)]
    network_address: String,
    #[serde(default)]
    network_mask_len: u8,
    #[serde(default)]
    next_hop: Option<String>,
    #[serde(rename = "IPAddresses", default)]
    ip_addresses: Vec<IpAddressDto>,
    #[serde(default)]
    internet: Option<RefDto>,
}

#[derive(Debug, Deserialize)]
struct IpAddressDto {
    #[serde(rename = "IPAddress")]
    ip_address: String,
}

#[derive(Debug, Deserialize)]
struct RefDto {
    #[serde(rename = "ID", deserialize_with = "flexible_id")]
    id: String,
}

impl From<SubnetDto> for SubnetRecord {
    fn from(dto: SubnetDto) -> Self {
        Self {
            id: dto.id,
            internet_id: dto.internet.map(|r| r.id).unwrap_or_default(),
            network_address: dto.network_address,
            netmask: dto.network_mask_len,
            next_hop: dto.next_hop.filter(|hop| !hop.is_empty()),
            ip_addresses: dto.ip_addresses.into_iter().map(|ip| ip.ip_address).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InternetEnvelope {
    internet: InternetDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InternetDto {
    #[serde(rename = "ID", deserialize_with = "flexible_id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    band_width_mbps: u32,
    #[serde(default)]
    switch: Option<SwitchDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SwitchDto {
    #[serde(default)]
    subnets: Vec<RefDto>,
}

impl From<InternetDto> for InternetRecord {
    fn from(dto: InternetDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            band_width_mbps: dto.band_width_mbps,
            subnet_ids: dto
                .switch
                .map(|s| s.subnets.into_iter().map(|r| r.id).collect())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subnet_dto_into_record() {
        let envelope: SubnetEnvelope = serde_json::from_value(json!({
            "Subnet": {
                "ID": "113700000010",
                "NetworkAddress": "203.0.113.16",
                "NetworkMaskLen": 28,
                "NextHop": "203.0.113.2",
                "IPAddresses": [
                    { "IPAddress": "203.0.113.17" },
                    { "IPAddress": "203.0.113.18" }
                ],
                "Internet": { "ID": 113700000009u64 }
            }
        }))
        .unwrap();

        let record: SubnetRecord = envelope.subnet.into();
        assert_eq!(record.internet_id, "113700000009");
        assert_eq!(record.netmask, 28);
        assert_eq!(record.next_hop.as_deref(), Some("203.0.113.2"));
        assert_eq!(record.ip_addresses.len(), 2);
    }

    #[test]
    fn test_empty_next_hop_is_none() {
        let dto: SubnetDto = serde_json::from_value(json!({
            "ID": "113700000011",
            "NextHop": ""
        }))
        .unwrap();

        let record: SubnetRecord = dto.into();
        assert!(record.next_hop.is_none());
        assert!(record.internet_id.is_empty());
    }

    #[test]
    fn test_internet_dto_lists_subnets() {
        let envelope: InternetEnvelope = serde_json::from_value(json!({
            "Internet": {
                "ID": "113700000009",
                "Name": "router01",
                "BandWidthMbps": 100,
                "Switch": { "Subnets": [ { "ID": "113700000010" } ] }
            }
        }))
        .unwrap();

        let record: InternetRecord = envelope.internet.into();
        assert_eq!(record.band_width_mbps, 100);
        assert_eq!(record.subnet_ids, vec!["113700000010".to_string()]);
    }
}
