//! Deploys and tears down the probe pipeline's cluster-side resources.
//!
//! Grounded on `chaosgarden/k8s/probe/__init__.py`'s `deploy`/`undeploy`
//! pair: undeploy always runs first (stale resources from a crashed prior
//! run must not linger) and every apply is best-effort in the sense that a
//! missing dependent resource is not fatal by itself — the caller decides
//! whether a failed step aborts the run.
//!
//! `KubernetesClient::apply`/`delete` are generic over the resource type,
//! which makes the trait itself not object-safe — so this module is
//! generic over `K: KubernetesClient` rather than taking a `dyn` reference.

use gardenchaos_common::Result;
use tracing::info;

use crate::client::KubernetesClient;
use crate::manifests;

pub struct ProbeDeployment {
    pub namespace: String,
    pub image: String,
    pub zone_count: usize,
    pub webhook_cert_pem: Vec<u8>,
    pub webhook_key_pem: Vec<u8>,
    pub webhook_ca_bundle: Vec<u8>,
    pub cleanup_after_seconds: i64,
}

/// Removes every resource this pipeline could have left behind, in reverse
/// dependency order. Each delete is idempotent (404 is success), so a
/// partial or repeated teardown is safe.
pub async fn undeploy<K: KubernetesClient>(client: &K, namespace: &str) -> Result<()> {
    info!(namespace, "tearing down probe pipeline resources");
    client.delete::<k8s_openapi::api::batch::v1::Job>(Some(namespace), "gardenchaos-probe-cleanup").await?;
    client.delete::<k8s_openapi::api::apps::v1::Deployment>(Some(namespace), "gardenchaos-probe").await?;
    client
        .delete::<k8s_openapi::api::admissionregistration::v1::MutatingWebhookConfiguration>(
            None,
            "gardenchaos-probe-webhook",
        )
        .await?;
    client.delete::<k8s_openapi::api::core::v1::Secret>(Some(namespace), "gardenchaos-probe-webhook-tls").await?;
    client.delete::<k8s_openapi::api::core::v1::Service>(Some(namespace), "gardenchaos-probe-webhook").await?;
    client
        .delete::<k8s_openapi::api::rbac::v1::ClusterRoleBinding>(None, "gardenchaos-probe")
        .await?;
    client.delete::<k8s_openapi::api::rbac::v1::ClusterRole>(None, "gardenchaos-probe").await?;
    client.delete::<k8s_openapi::api::core::v1::ServiceAccount>(Some(namespace), "gardenchaos-probe").await?;
    Ok(())
}

/// Applies every resource the probe pipeline needs, in dependency order:
/// namespace and RBAC first, then the serving surfaces, then the workload.
pub async fn deploy<K: KubernetesClient>(client: &K, spec: &ProbeDeployment) -> Result<()> {
    undeploy(client, &spec.namespace).await?;

    info!(namespace = %spec.namespace, zone_count = spec.zone_count, "deploying probe pipeline resources");
    client.apply(None, &manifests::namespace(&spec.namespace)).await?;
    client.apply(Some(&spec.namespace), &manifests::service_account(&spec.namespace)).await?;
    client.apply(None, &manifests::cluster_role()).await?;
    client.apply(None, &manifests::cluster_role_binding(&spec.namespace)).await?;
    client.apply(Some(&spec.namespace), &manifests::service(&spec.namespace)).await?;
    client
        .apply(
            Some(&spec.namespace),
            &manifests::tls_secret(&spec.namespace, &spec.webhook_cert_pem, &spec.webhook_key_pem),
        )
        .await?;
    client
        .apply(None, &manifests::mutating_webhook_configuration(&spec.namespace, &spec.webhook_ca_bundle))
        .await?;
    client
        .apply(Some(&spec.namespace), &manifests::deployment(&spec.namespace, &spec.image, spec.zone_count))
        .await?;
    client
        .apply(
            Some(&spec.namespace),
            &manifests::suicidal_job(&spec.namespace, &spec.image, spec.cleanup_after_seconds),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::{Node, Pod};

    use super::*;
    use crate::types::{AcknowledgedHeartbeat, Heartbeat};

    #[derive(Clone, Default)]
    struct CountingClient {
        applies: Arc<AtomicUsize>,
        deletes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl KubernetesClient for CountingClient {
        async fn apply<T>(&self, _namespace: Option<&str>, _resource: &T) -> Result<()>
        where
            T: kube::Resource + serde::Serialize + serde::de::DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static,
            T::DynamicType: Default,
        {
            self.applies.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete<T>(&self, _namespace: Option<&str>, _name: &str) -> Result<()>
        where
            T: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug + Send + Sync + 'static,
            T::DynamicType: Default,
        {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn list_pods(&self, _namespace: &str, _label_selector: &str) -> Result<Vec<Pod>> {
            Ok(vec![])
        }

        async fn list_nodes(&self) -> Result<Vec<Node>> {
            Ok(vec![])
        }

        async fn list_heartbeats(&self, _namespace: &str) -> Result<Vec<Heartbeat>> {
            Ok(vec![])
        }

        async fn list_acknowledged_heartbeats(&self, _namespace: &str) -> Result<Vec<AcknowledgedHeartbeat>> {
            Ok(vec![])
        }

        async fn get_raw(
            &self,
            _group: &str,
            _version: &str,
            _kind: &str,
            _namespace: Option<&str>,
            _name: &str,
        ) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }

        async fn get_secret_data(&self, _namespace: &str, _name: &str) -> Result<std::collections::BTreeMap<String, String>> {
            Ok(std::collections::BTreeMap::new())
        }
    }

    #[tokio::test]
    async fn deploy_tears_down_before_applying() {
        let client = CountingClient::default();
        let spec = ProbeDeployment {
            namespace: "gardenchaos".to_string(),
            image: "probe:latest".to_string(),
            zone_count: 2,
            webhook_cert_pem: vec![1, 2, 3],
            webhook_key_pem: vec![4, 5, 6],
            webhook_ca_bundle: vec![7, 8, 9],
            cleanup_after_seconds: 3600,
        };
        deploy(&client, &spec).await.unwrap();
        assert_eq!(client.deletes.load(Ordering::SeqCst), 8);
        assert_eq!(client.applies.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn undeploy_is_idempotent_with_a_fresh_client() {
        let client = CountingClient::default();
        undeploy(&client, "gardenchaos").await.unwrap();
        undeploy(&client, "gardenchaos").await.unwrap();
        assert_eq!(client.deletes.load(Ordering::SeqCst), 16);
    }
}
