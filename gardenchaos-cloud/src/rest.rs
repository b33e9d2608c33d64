//! Thin generic REST client satisfying [`CloudAdapter`] for any of the six
//! supported providers. Real cloud SDKs are out of scope (each provider's
//! actual control-plane API is an external collaborator); this client talks
//! to a configured base URL with a bearer credential, the same shape
//! `OrchestratorClient` in the teacher's `mitigation-node` uses for its own
//! external collaborator.

use std::time::Duration;

use async_trait::async_trait;
use gardenchaos_common::{retry::retry_with_backoff, CommonError, Result, Secret};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::adapter::{self, CloudAdapter};
use crate::associations;
use crate::tagging::{original_associations_tag_name, zone_tag_name};
use crate::types::{BlockingArtifact, CloudProviderKind, Filters, Instance, Network, NetworkFailureMode};

#[derive(Debug, Clone)]
pub struct RestCloudAdapterConfig {
    pub kind: CloudProviderKind,
    pub base_url: String,
    pub credential: Secret<String>,
}

pub struct RestCloudAdapter {
    kind: CloudProviderKind,
    base_url: String,
    credential: Secret<String>,
    http_client: Client,
}

#[derive(Debug, Serialize)]
struct InstanceQuery<'a> {
    zone: &'a str,
    filters: &'a Filters,
}

#[derive(Debug, Deserialize)]
struct InstanceRecord {
    id: String,
    state: String,
    launch_time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default = "default_lifecycle")]
    lifecycle: String,
}

fn default_lifecycle() -> String {
    "normal".to_string()
}

#[derive(Debug, Serialize)]
struct InstanceActionRequest<'a> {
    ids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct NetworkRecord {
    id: String,
    current_association: String,
}

#[derive(Debug, Serialize)]
struct AssociateRequest<'a> {
    resource: &'a str,
    artifact_name: &'a str,
    prior: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct AssociateResponse {
    prior_association: String,
}

#[derive(Debug, Serialize)]
struct RestoreRequest<'a> {
    resource: &'a str,
    prior: &'a str,
}

#[derive(Debug, Serialize)]
struct BlockRequest<'a> {
    zone: &'a str,
    filters: &'a Filters,
    mode: &'static str,
    tag_name: &'a str,
}

#[derive(Debug, Serialize)]
struct PersistAssociationsRequest<'a> {
    name: &'a str,
    tag_name: &'a str,
    associations: &'a str,
}

#[derive(Debug, Deserialize, Serialize)]
struct BlockResponse {
    name: String,
    #[serde(default)]
    original_associations: String,
}

impl RestCloudAdapter {
    pub fn new(config: RestCloudAdapterConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CommonError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { kind: config.kind, base_url: config.base_url, credential: config.credential, http_client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{path}", self.base_url.trim_end_matches('/'), self.kind.as_str())
    }

    fn is_throttling_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}

#[async_trait]
impl CloudAdapter for RestCloudAdapter {
    fn kind(&self) -> CloudProviderKind {
        self.kind
    }

    async fn list_instances(&self, zone: &str, filters: &Filters) -> Result<Vec<Instance>> {
        let records: Vec<InstanceRecord> = retry_with_backoff(
            "list_instances",
            || async {
                let response = self
                    .http_client
                    .get(self.url("instances"))
                    .bearer_auth(self.credential.expose_secret())
                    .query(&InstanceQuery { zone, filters })
                    .send()
                    .await
                    .map_err(|e| CommonError::Other(e.to_string()))?;
                if Self::is_throttling_status(response.status()) {
                    return Err(CommonError::Timeout(format!("{} throttled list_instances", self.kind.as_str())));
                }
                response.json().await.map_err(|e| CommonError::Serialization(e.to_string()))
            },
            |err| matches!(err, CommonError::Timeout(_)),
        )
        .await?;

        Ok(records
            .into_iter()
            .map(|r| Instance { id: r.id, state: r.state, launch_time: r.launch_time, lifecycle: r.lifecycle })
            .collect())
    }

    async fn terminate_instances(&self, ids: &[String]) -> Result<()> {
        self.http_client
            .post(self.url("instances/terminate"))
            .bearer_auth(self.credential.expose_secret())
            .json(&InstanceActionRequest { ids })
            .send()
            .await
            .map_err(|e| CommonError::Other(e.to_string()))?;
        Ok(())
    }

    async fn restart_instances(&self, ids: &[String]) -> Result<()> {
        self.http_client
            .post(self.url("instances/restart"))
            .bearer_auth(self.credential.expose_secret())
            .json(&InstanceActionRequest { ids })
            .send()
            .await
            .map_err(|e| CommonError::Other(e.to_string()))?;
        Ok(())
    }

    async fn list_networks(&self, zone: &str, filters: &Filters) -> Result<Vec<Network>> {
        let records: Vec<NetworkRecord> = retry_with_backoff(
            "list_networks",
            || async {
                let response = self
                    .http_client
                    .get(self.url("networks"))
                    .bearer_auth(self.credential.expose_secret())
                    .query(&InstanceQuery { zone, filters })
                    .send()
                    .await
                    .map_err(|e| CommonError::Other(e.to_string()))?;
                if Self::is_throttling_status(response.status()) {
                    return Err(CommonError::Timeout(format!("{} throttled list_networks", self.kind.as_str())));
                }
                response.json().await.map_err(|e| CommonError::Serialization(e.to_string()))
            },
            |err| matches!(err, CommonError::Timeout(_)),
        )
        .await?;

        Ok(records.into_iter().map(|r| Network { id: r.id, current_association: r.current_association }).collect())
    }

    async fn associate(&self, resource: &str, artifact: &BlockingArtifact, prior: Option<&str>) -> Result<String> {
        let response: AssociateResponse = self
            .http_client
            .post(self.url("network/associate"))
            .bearer_auth(self.credential.expose_secret())
            .json(&AssociateRequest { resource, artifact_name: &artifact.name, prior })
            .send()
            .await
            .map_err(|e| CommonError::Other(e.to_string()))?
            .json()
            .await
            .map_err(|e| CommonError::Serialization(e.to_string()))?;
        Ok(response.prior_association)
    }

    async fn restore(&self, resource: &str, prior: &str) -> Result<()> {
        self.http_client
            .post(self.url("network/restore"))
            .bearer_auth(self.credential.expose_secret())
            .json(&RestoreRequest { resource, prior })
            .send()
            .await
            .map_err(|e| CommonError::Other(e.to_string()))?;
        Ok(())
    }

    async fn create_blocking_artifact(&self, zone: &str, filters: &Filters, mode: NetworkFailureMode) -> Result<BlockingArtifact> {
        let tag_name = zone_tag_name(zone, &format!("{filters:?}-{}", mode.as_str()));
        let created: BlockResponse = self
            .http_client
            .post(self.url("network/block"))
            .bearer_auth(self.credential.expose_secret())
            .json(&BlockRequest { zone, filters, mode: mode.as_str(), tag_name: &tag_name })
            .send()
            .await
            .map_err(|e| CommonError::Other(e.to_string()))?
            .json()
            .await
            .map_err(|e| CommonError::Serialization(e.to_string()))?;

        let artifact = BlockingArtifact { name: created.name, zone: zone.to_string(), original_associations: String::new() };
        let prior = adapter::divert_resources(self, zone, filters, &artifact).await?;
        let encoded = associations::encode_for_kind(self.kind, &prior)?;

        self.http_client
            .post(self.url("network/block/associations"))
            .bearer_auth(self.credential.expose_secret())
            .json(&PersistAssociationsRequest {
                name: &artifact.name,
                tag_name: original_associations_tag_name(self.kind),
                associations: &encoded,
            })
            .send()
            .await
            .map_err(|e| CommonError::Other(e.to_string()))?;

        Ok(BlockingArtifact { original_associations: encoded, ..artifact })
    }

    async fn delete_blocking_artifact(&self, zone: &str, filters: &Filters) -> Result<()> {
        let lookup = self
            .http_client
            .get(self.url("network/block"))
            .bearer_auth(self.credential.expose_secret())
            .query(&[("zone", zone)])
            .send()
            .await
            .map_err(|e| CommonError::Other(e.to_string()))?;
        if lookup.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let block: BlockResponse = lookup.json().await.map_err(|e| CommonError::Serialization(e.to_string()))?;

        match associations::decode_for_kind(self.kind, &block.original_associations) {
            Ok(original) => adapter::restore_resources(self, &original).await,
            Err(err) => tracing::error!(%err, artifact = %block.name, "failed to read original associations during rollback"),
        }

        self.http_client
            .post(self.url("network/unblock"))
            .bearer_auth(self.credential.expose_secret())
            .json(&InstanceQuery { zone, filters })
            .send()
            .await
            .map_err(|e| CommonError::Other(e.to_string()))?;
        Ok(())
    }

    async fn find_blocking_artifact(&self, zone: &str, filters: &Filters, mode: NetworkFailureMode) -> Result<Option<BlockingArtifact>> {
        let response = self
            .http_client
            .get(self.url("network/block"))
            .bearer_auth(self.credential.expose_secret())
            .query(&[("zone", zone), ("mode", mode.as_str())])
            .send()
            .await
            .map_err(|e| CommonError::Other(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let _ = filters;
        let block: BlockResponse = response.json().await.map_err(|e| CommonError::Serialization(e.to_string()))?;
        Ok(Some(BlockingArtifact { name: block.name, zone: zone.to_string(), original_associations: block.original_associations }))
    }
}
