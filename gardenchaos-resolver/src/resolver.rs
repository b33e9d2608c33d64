//! The Gardener resolver contract (spec.md §6): reads Project/Shoot/Seed/
//! SecretBinding custom resources off the garden cluster and turns a
//! caller's zone/target request into concrete selectors, a shoot
//! kubeconfig, or cloud-provider filters and credentials. Ported from
//! `chaosgarden/garden/actions.py`'s `resolve_pod_simulation`/
//! `resolve_cloud_provider_simulation`.
//!
//! Grounded on the same `KubernetesClient` trait the Probe Pipeline uses
//! (spec.md §6: "the garden cluster is just another Kubernetes cluster").

use gardenchaos_cloud::{CloudProviderKind, Filters};
use gardenchaos_common::{CommonError, Result, Secret};
use gardenchaos_probe::KubernetesClient;
use serde_json::Value;
use tracing::debug;

use crate::json::{opt_str_at, str_at};
use crate::types::{GardenConfig, ProviderCredentials, ResolvedCloudSimulation, ResolvedPodSimulation, Target, ZoneSelector};
use crate::zones::{resolve_zone, resolve_zones, supplement_selector};

const GARDENER_GROUP: &str = "core.gardener.cloud";
const GARDENER_VERSION: &str = "v1beta1";

pub struct GardenerResolver<K: KubernetesClient> {
    client: K,
}

impl<K: KubernetesClient> GardenerResolver<K> {
    pub fn new(client: K) -> Self {
        Self { client }
    }

    async fn get_project(&self, name: &str) -> Result<Value> {
        self.client.get_raw(GARDENER_GROUP, GARDENER_VERSION, "projects", None, name).await
    }

    async fn get_shoot(&self, namespace: &str, name: &str) -> Result<Value> {
        self.client.get_raw(GARDENER_GROUP, GARDENER_VERSION, "shoots", Some(namespace), name).await
    }

    async fn get_seed(&self, name: &str) -> Result<Value> {
        self.client.get_raw(GARDENER_GROUP, GARDENER_VERSION, "seeds", None, name).await
    }

    async fn get_secret_binding(&self, namespace: &str, name: &str) -> Result<Value> {
        self.client.get_raw(GARDENER_GROUP, GARDENER_VERSION, "secretbindings", Some(namespace), name).await
    }

    /// Fetches the shoot-cluster kubeconfig the Gardener convention
    /// stores as `<shoot-name>.kubeconfig` in the project's namespace.
    async fn get_kubeconfig(&self, project_namespace: &str, shoot_name: &str) -> Result<String> {
        let secret_name = format!("{shoot_name}.kubeconfig");
        let mut data = self.client.get_secret_data(project_namespace, &secret_name).await?;
        data.remove("kubeconfig")
            .ok_or_else(|| CommonError::Validation(format!("secret {secret_name} has no kubeconfig key")))
    }

    fn worker_zones(shoot: &Value) -> Vec<Vec<String>> {
        let workers = shoot
            .get("spec")
            .and_then(|s| s.get("provider"))
            .and_then(|p| p.get("workers"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        workers
            .into_iter()
            .map(|worker| {
                worker
                    .get("zones")
                    .and_then(Value::as_array)
                    .map(|zones| zones.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Resolves the selectors and kubeconfig a pod-failure simulation
    /// needs for one of the three Gardener-specific scopes.
    pub async fn resolve_pod_simulation(
        &self,
        target: Target,
        zone: Option<ZoneSelector>,
        ignore_daemon_sets: bool,
        mut selectors: ResolvedPodSimulation,
        garden: &GardenConfig,
    ) -> Result<ResolvedPodSimulation> {
        let project = self.get_project(&garden.project).await?;
        let project_namespace = str_at(&project, &["spec", "namespace"])?;
        let shoot = self.get_shoot(&project_namespace, &garden.shoot).await?;

        let (kubeconfig, resolved_zone) = if target == Target::ControlPlane {
            let seed_name = str_at(&shoot, &["spec", "seedName"])?;
            match self.get_shoot("garden", &seed_name).await {
                Ok(seed_shoot) => {
                    let kubeconfig = self.get_kubeconfig("garden", &seed_name).await?;
                    let zones = resolve_zones(&Self::worker_zones(&seed_shoot));
                    let resolved = match zone {
                        Some(z) => Some(resolve_zone(&z, &zones)?),
                        None => None,
                    };
                    (kubeconfig, resolved)
                }
                Err(e) => {
                    debug!(error = %e, seed_name, "seed has no managed shoot, falling back to seed secret reference");
                    let seed = self.get_seed(&seed_name).await?;
                    let secret_name = str_at(&seed, &["spec", "secretRef", "name"])?;
                    let secret_namespace = str_at(&seed, &["spec", "secretRef", "namespace"])?;
                    let mut data = self.client.get_secret_data(&secret_namespace, &secret_name).await?;
                    let kubeconfig = data
                        .remove("kubeconfig")
                        .ok_or_else(|| CommonError::Validation("seed secret has no kubeconfig key".to_string()))?;
                    // zone cannot be resolved/validated without the seed's own shoot spec
                    (kubeconfig, None)
                }
            }
        } else {
            let kubeconfig = self.get_kubeconfig(&project_namespace, &garden.shoot).await?;
            let zones = resolve_zones(&Self::worker_zones(&shoot));
            let resolved = match zone {
                Some(z) => Some(resolve_zone(&z, &zones)?),
                None => None,
            };
            (kubeconfig, resolved)
        };

        if let Some(zone) = resolved_zone {
            selectors.node_label_selector =
                Some(supplement_selector(&format!("topology.kubernetes.io/zone={zone}"), selectors.node_label_selector.as_deref()));
        }
        if ignore_daemon_sets {
            selectors.pod_owner_selector =
                Some(supplement_selector("kind!=DaemonSet", selectors.pod_owner_selector.as_deref()));
        }
        match target {
            Target::ControlPlane => {
                let technical_id = str_at(&shoot, &["status", "technicalID"])?;
                selectors.pod_label_selector = Some(supplement_selector(
                    "gardener.cloud/role in (controlplane,vpa)",
                    selectors.pod_label_selector.as_deref(),
                ));
                selectors.pod_metadata_selector = Some(supplement_selector(
                    &format!("namespace={technical_id}"),
                    selectors.pod_metadata_selector.as_deref(),
                ));
            }
            Target::SystemComponents => {
                selectors.pod_label_selector = Some(supplement_selector(
                    "resources.gardener.cloud/managed-by=gardener",
                    selectors.pod_label_selector.as_deref(),
                ));
                selectors.pod_metadata_selector =
                    Some(supplement_selector("namespace=kube-system", selectors.pod_metadata_selector.as_deref()));
            }
            Target::Workers => {}
        }

        selectors.kubeconfig_yaml = kubeconfig;
        Ok(selectors)
    }

    /// Resolves the cloud provider, zone, instance/network filters, and
    /// credentials a cloud-provider compute/network failure simulation
    /// needs, from the shoot's `SecretBinding`.
    pub async fn resolve_cloud_provider_simulation(
        &self,
        zone: ZoneSelector,
        garden: &GardenConfig,
    ) -> Result<ResolvedCloudSimulation> {
        let project = self.get_project(&garden.project).await?;
        let project_namespace = str_at(&project, &["spec", "namespace"])?;
        let shoot = self.get_shoot(&project_namespace, &garden.shoot).await?;
        let secret_binding_name = str_at(&shoot, &["spec", "secretBindingName"])?;
        let secret_binding = self.get_secret_binding(&project_namespace, &secret_binding_name).await?;
        let secret_ref_name = str_at(&secret_binding, &["secretRef", "name"])?;
        let secret_ref_namespace = str_at(&secret_binding, &["secretRef", "namespace"])?;
        let credentials_raw = self.client.get_secret_data(&secret_ref_namespace, &secret_ref_name).await?;

        let provider_type = str_at(&shoot, &["spec", "provider", "type"])?;
        let technical_id = str_at(&shoot, &["status", "technicalID"])?;
        let zones = resolve_zones(&Self::worker_zones(&shoot));
        let resolved_zone = resolve_zone(&zone, &zones)?;
        let region = opt_str_at(&shoot, &["spec", "region"]);

        let require_cred = |key: &str| -> Result<String> {
            credentials_raw
                .get(key)
                .cloned()
                .ok_or_else(|| CommonError::Validation(format!("secret binding credential is missing {key}")))
        };

        let (provider, filters, credentials) = match provider_type.as_str() {
            "aws" => (
                CloudProviderKind::Aws,
                Filters {
                    instances: vec![std::collections::HashMap::from([(
                        "tag-key".to_string(),
                        format!("kubernetes.io/cluster/{technical_id}"),
                    )])],
                    ..Default::default()
                },
                ProviderCredentials::Aws {
                    access_key_id: Secret::new(require_cred("accessKeyID")?),
                    secret_access_key: Secret::new(require_cred("secretAccessKey")?),
                },
            ),
            "azure" => (
                CloudProviderKind::Azure,
                Filters::default(),
                ProviderCredentials::Azure {
                    cloud: credentials_raw.get("cloud").cloned().unwrap_or_else(|| "AZURE_PUBLIC_CLOUD".to_string()),
                    client_id: Secret::new(require_cred("clientID")?),
                    client_secret: Secret::new(require_cred("clientSecret")?),
                    tenant_id: Secret::new(require_cred("tenantID")?),
                },
            ),
            "gcp" => (
                CloudProviderKind::Gcp,
                Filters::default(),
                ProviderCredentials::Gcp { service_account_json: Secret::new(require_cred("serviceaccount.json")?) },
            ),
            "openstack" => (
                CloudProviderKind::OpenStack,
                Filters::default(),
                ProviderCredentials::OpenStack {
                    auth_url: require_cred("authURL")?,
                    user_domain_name: require_cred("domainName")?,
                    username: Secret::new(require_cred("username")?),
                    password: Secret::new(require_cred("password")?),
                    project_domain_name: require_cred("domainName")?,
                    project_name: require_cred("tenantName")?,
                },
            ),
            other => {
                return Err(CommonError::Validation(format!("cloud provider {other} unknown/not supported")));
            }
        };

        Ok(ResolvedCloudSimulation { provider, zone: resolved_zone, filters, region, technical_id, credentials })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::{Node, Pod};
    use std::collections::BTreeMap;

    struct FakeClient {
        objects: BTreeMap<(String, Option<String>), Value>,
        secrets: BTreeMap<(String, String), BTreeMap<String, String>>,
    }

    #[async_trait]
    impl KubernetesClient for FakeClient {
        async fn apply<T>(&self, _namespace: Option<&str>, _resource: &T) -> Result<()>
        where
            T: kube::Resource + serde::Serialize + serde::de::DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static,
            T::DynamicType: Default,
        {
            Ok(())
        }

        async fn delete<T>(&self, _namespace: Option<&str>, _name: &str) -> Result<()>
        where
            T: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug + Send + Sync + 'static,
            T::DynamicType: Default,
        {
            Ok(())
        }

        async fn list_pods(&self, _namespace: &str, _label_selector: &str) -> Result<Vec<Pod>> {
            Ok(vec![])
        }

        async fn list_nodes(&self) -> Result<Vec<Node>> {
            Ok(vec![])
        }

        async fn list_heartbeats(&self, _namespace: &str) -> Result<Vec<gardenchaos_probe::Heartbeat>> {
            Ok(vec![])
        }

        async fn list_acknowledged_heartbeats(&self, _namespace: &str) -> Result<Vec<gardenchaos_probe::AcknowledgedHeartbeat>> {
            Ok(vec![])
        }

        async fn get_raw(&self, _group: &str, _version: &str, kind: &str, namespace: Option<&str>, name: &str) -> Result<Value> {
            self.objects
                .get(&(format!("{kind}/{name}"), namespace.map(str::to_string)))
                .cloned()
                .ok_or_else(|| CommonError::Other(format!("no such object {kind}/{name}")))
        }

        async fn get_secret_data(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, String>> {
            self.secrets
                .get(&(namespace.to_string(), name.to_string()))
                .cloned()
                .ok_or_else(|| CommonError::Other(format!("no such secret {namespace}/{name}")))
        }
    }

    fn aws_fixture() -> FakeClient {
        let mut objects = BTreeMap::new();
        objects.insert(
            ("projects/my-project".to_string(), None),
            serde_json::json!({"spec": {"namespace": "garden-my-project"}}),
        );
        objects.insert(
            ("shoots/my-shoot".to_string(), Some("garden-my-project".to_string())),
            serde_json::json!({
                "spec": {
                    "provider": {"type": "aws", "workers": [{"zones": ["eu1", "eu2"]}]},
                    "region": "eu-west-1",
                    "secretBindingName": "my-secret-binding"
                },
                "status": {"technicalID": "shoot--core--my-shoot"}
            }),
        );
        objects.insert(
            ("secretbindings/my-secret-binding".to_string(), Some("garden-my-project".to_string())),
            serde_json::json!({"secretRef": {"name": "aws-credentials", "namespace": "garden-my-project"}}),
        );
        let mut secrets = BTreeMap::new();
        secrets.insert(
            ("garden-my-project".to_string(), "aws-credentials".to_string()),
            BTreeMap::from([
                ("accessKeyID".to_string(), "AKIA...".to_string()),
                ("secretAccessKey".to_string(), "shh".to_string()),
            ]),
        );
        FakeClient { objects, secrets }
    }

    #[tokio::test]
    async fn resolves_aws_cloud_provider_simulation() {
        let resolver = GardenerResolver::new(aws_fixture());
        let garden = GardenConfig { project: "my-project".to_string(), shoot: "my-shoot".to_string() };
        let resolved = resolver.resolve_cloud_provider_simulation(ZoneSelector::Index(0), &garden).await.unwrap();
        assert_eq!(resolved.provider, CloudProviderKind::Aws);
        assert_eq!(resolved.zone, "eu1");
        assert_eq!(resolved.technical_id, "shoot--core--my-shoot");
        assert!(matches!(resolved.credentials, ProviderCredentials::Aws { .. }));
    }

    #[tokio::test]
    async fn unknown_cloud_provider_is_rejected() {
        let mut fixture = aws_fixture();
        fixture.objects.insert(
            ("shoots/my-shoot".to_string(), Some("garden-my-project".to_string())),
            serde_json::json!({
                "spec": {"provider": {"type": "made-up", "workers": [{"zones": ["eu1"]}]}, "secretBindingName": "my-secret-binding"},
                "status": {"technicalID": "shoot--core--my-shoot"}
            }),
        );
        let resolver = GardenerResolver::new(fixture);
        let garden = GardenConfig { project: "my-project".to_string(), shoot: "my-shoot".to_string() };
        let result = resolver.resolve_cloud_provider_simulation(ZoneSelector::Index(0), &garden).await;
        assert!(result.is_err());
    }
}
