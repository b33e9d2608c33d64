//! Supplemental data model grounded in `chaosgarden/garden/actions.py`:
//! the Gardener pod-failure scope and per-cloud-provider credential
//! shapes that spec.md's distillation of the generic "Gardener resolver
//! contract" dropped.

use gardenchaos_common::Secret;

/// Which pod population a pod-failure simulation targets, layered on top
/// of the generic compute/network Disruption Target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Control-plane pods in the seed's `shoot.status.technicalID`
    /// namespace (`gardener.cloud/role in (controlplane,vpa)`).
    ControlPlane,
    /// Shoot-cluster system components (`resources.gardener.cloud/
    /// managed-by=gardener`, `kube-system` namespace).
    SystemComponents,
    /// Worker-node pods with no supplemental pod selector beyond zone.
    Workers,
}

/// A zone named either by index into the shoot's sorted zone list, or
/// directly by name — mirrors the original's `Union[int, str]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneSelector {
    Index(usize),
    Name(String),
}

/// Identifies which garden-cluster project/shoot a resolver call scopes
/// to, the Rust shape of `configuration.garden.{project,shoot}`.
#[derive(Debug, Clone)]
pub struct GardenConfig {
    pub project: String,
    pub shoot: String,
}

/// The selectors and kubeconfig a pod-failure simulation needs, resolved
/// against the garden cluster.
#[derive(Debug, Clone, Default)]
pub struct ResolvedPodSimulation {
    pub node_label_selector: Option<String>,
    pub pod_label_selector: Option<String>,
    pub pod_metadata_selector: Option<String>,
    pub pod_owner_selector: Option<String>,
    pub kubeconfig_yaml: String,
}

/// Per-provider credential shapes extracted from the shoot's
/// `SecretBinding`, grounded on `resolve_cloud_provider_simulation`'s
/// per-provider `secrets` dict.
#[derive(Clone)]
pub enum ProviderCredentials {
    Aws { access_key_id: Secret<String>, secret_access_key: Secret<String> },
    Azure { cloud: String, client_id: Secret<String>, client_secret: Secret<String>, tenant_id: Secret<String> },
    Gcp { service_account_json: Secret<String> },
    OpenStack {
        auth_url: String,
        user_domain_name: String,
        username: Secret<String>,
        password: Secret<String>,
        project_domain_name: String,
        project_name: String,
    },
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ProviderCredentials::Aws { .. } => "Aws",
            ProviderCredentials::Azure { .. } => "Azure",
            ProviderCredentials::Gcp { .. } => "Gcp",
            ProviderCredentials::OpenStack { .. } => "OpenStack",
        };
        write!(f, "ProviderCredentials::{kind}(<redacted>)")
    }
}

/// Everything a cloud-provider compute/network failure simulation needs,
/// resolved against the garden cluster: which provider, which zone, the
/// provider-specific instance/network filters, and credentials.
#[derive(Debug, Clone)]
pub struct ResolvedCloudSimulation {
    pub provider: gardenchaos_cloud::CloudProviderKind,
    pub zone: String,
    pub filters: gardenchaos_cloud::Filters,
    pub region: Option<String>,
    pub technical_id: String,
    pub credentials: ProviderCredentials,
}
