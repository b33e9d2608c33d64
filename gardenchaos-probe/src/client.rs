//! The Kubernetes contract (spec.md §6): apply/delete arbitrary manifests,
//! list pods/nodes/leases, and list the heartbeat custom resources. One
//! implementation, `KubeClient`, wraps `kube::Client` the way
//! `inaneverb-fckloud/crates/kubem/src/manager.rs`'s `Manager` wraps it for
//! node-address management — a thin typed `Api<T>` per resource kind, no
//! hand-rolled REST calls.

use std::collections::BTreeMap;

use async_trait::async_trait;
use gardenchaos_common::{CommonError, Result};
use k8s_openapi::api::core::v1::{Node, Pod, Secret};
use kube::api::{Patch, PatchParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::types::{AcknowledgedHeartbeat, Heartbeat};

#[async_trait]
pub trait KubernetesClient: Send + Sync {
    /// Server-side applies an arbitrary typed manifest, field-managed under
    /// `gardenchaos`.
    async fn apply<T>(&self, namespace: Option<&str>, resource: &T) -> Result<()>
    where
        T: kube::Resource + Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static,
        T::DynamicType: Default;

    async fn delete<T>(&self, namespace: Option<&str>, name: &str) -> Result<()>
    where
        T: kube::Resource + Clone + DeserializeOwned + std::fmt::Debug + Send + Sync + 'static,
        T::DynamicType: Default;

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>>;

    async fn list_nodes(&self) -> Result<Vec<Node>>;

    async fn list_heartbeats(&self, namespace: &str) -> Result<Vec<Heartbeat>>;

    async fn list_acknowledged_heartbeats(&self, namespace: &str) -> Result<Vec<AcknowledgedHeartbeat>>;

    /// Fetches an arbitrary custom resource by group/version/kind as raw
    /// JSON, for callers (e.g. the Gardener Resolver) that read CRDs they
    /// don't own a typed schema for — the same role `Box(garden.client(...)
    /// .get_namespaced_custom_object(...))`'s dynamic attribute access
    /// plays in the original.
    async fn get_raw(&self, group: &str, version: &str, kind: &str, namespace: Option<&str>, name: &str) -> Result<Value>;

    /// Reads a `Secret`'s data, already base64-decoded into UTF-8 strings
    /// (assumes text-valued secrets, true for every credential this
    /// workspace reads).
    async fn get_secret_data(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, String>>;
}

pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    pub async fn try_new() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| CommonError::Other(format!("failed to connect to Kubernetes: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KubernetesClient for KubeClient {
    async fn apply<T>(&self, namespace: Option<&str>, resource: &T) -> Result<()>
    where
        T: kube::Resource + Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static,
        T::DynamicType: Default,
    {
        let api: Api<T> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let name = resource
            .meta()
            .name
            .clone()
            .ok_or_else(|| CommonError::Validation("resource has no name".to_string()))?;
        api.patch(&name, &PatchParams::apply("gardenchaos").force(), &Patch::Apply(resource))
            .await
            .map_err(|e| CommonError::Other(format!("failed to apply {name}: {e}")))?;
        Ok(())
    }

    async fn delete<T>(&self, namespace: Option<&str>, name: &str) -> Result<()>
    where
        T: kube::Resource + Clone + DeserializeOwned + std::fmt::Debug + Send + Sync + 'static,
        T::DynamicType: Default,
    {
        let api: Api<T> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        match api.delete(name, &Default::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(()),
            Err(e) => Err(CommonError::Other(format!("failed to delete {name}: {e}"))),
        }
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = kube::api::ListParams::default().labels(label_selector);
        let list = api.list(&params).await.map_err(|e| CommonError::Other(format!("failed to list pods: {e}")))?;
        Ok(list.items)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let list = api
            .list(&kube::api::ListParams::default())
            .await
            .map_err(|e| CommonError::Other(format!("failed to list nodes: {e}")))?;
        Ok(list.items)
    }

    async fn list_heartbeats(&self, namespace: &str) -> Result<Vec<Heartbeat>> {
        let api: Api<Heartbeat> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&kube::api::ListParams::default())
            .await
            .map_err(|e| CommonError::Other(format!("failed to list heartbeats: {e}")))?;
        Ok(list.items)
    }

    async fn list_acknowledged_heartbeats(&self, namespace: &str) -> Result<Vec<AcknowledgedHeartbeat>> {
        let api: Api<AcknowledgedHeartbeat> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&kube::api::ListParams::default())
            .await
            .map_err(|e| CommonError::Other(format!("failed to list acknowledged heartbeats: {e}")))?;
        Ok(list.items)
    }

    async fn get_raw(&self, group: &str, version: &str, kind: &str, namespace: Option<&str>, name: &str) -> Result<Value> {
        let gvk = GroupVersionKind::gvk(group, version, kind);
        let resource = ApiResource::from_gvk(&gvk);
        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        };
        let object = api
            .get(name)
            .await
            .map_err(|e| CommonError::Other(format!("failed to get {kind}/{name}: {e}")))?;
        serde_json::to_value(object.data).map_err(|e| CommonError::Serialization(e.to_string()))
    }

    async fn get_secret_data(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, String>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get(name)
            .await
            .map_err(|e| CommonError::Other(format!("failed to get secret {name}: {e}")))?;
        let mut decoded = BTreeMap::new();
        for (key, value) in secret.data.unwrap_or_default() {
            let text = String::from_utf8(value.0)
                .map_err(|e| CommonError::Other(format!("secret {name}/{key} is not valid UTF-8: {e}")))?;
            decoded.insert(key, text);
        }
        Ok(decoded)
    }
}
