//! Provider-agnostic shapes shared by every `CloudAdapter` implementation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudProviderKind {
    Aws,
    Azure,
    Gcp,
    AlibabaCloud,
    OpenStack,
    VSphere,
}

impl CloudProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProviderKind::Aws => "aws",
            CloudProviderKind::Azure => "azure",
            CloudProviderKind::Gcp => "gcp",
            CloudProviderKind::AlibabaCloud => "alicloud",
            CloudProviderKind::OpenStack => "openstack",
            CloudProviderKind::VSphere => "vsphere",
        }
    }

    /// The AWS/OpenStack/GCP/AlibabaCloud family tags the blocking artifact
    /// with a semicolon-joined `id:id` association string; Azure/vSphere
    /// tag with a JSON object instead.
    pub fn uses_semicolon_associations(&self) -> bool {
        matches!(self, CloudProviderKind::Aws | CloudProviderKind::OpenStack | CloudProviderKind::Gcp)
    }

    /// Azure/GCP/vSphere can have their original network associations drift
    /// back (e.g. a controller reattaching a NIC to its original security
    /// group) while a network failure simulation is still running, so the
    /// orchestrator must re-apply the blocking association every tick
    /// instead of only at setup time.
    pub fn reassociates_mid_run(&self) -> bool {
        matches!(self, CloudProviderKind::Azure | CloudProviderKind::Gcp | CloudProviderKind::VSphere)
    }
}

/// Filters used to scope which compute instances or network resources a
/// simulation targets, mirroring the `filters` dict threaded through every
/// `chaosgarden` provider action (instances/vpcs/subnets keys, each a list
/// of provider-specific key/value matchers).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filters {
    pub instances: Vec<HashMap<String, String>>,
    pub networks: Vec<HashMap<String, String>>,
    pub subnets: Vec<HashMap<String, String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeFailureMode {
    Terminate,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailureMode {
    Total,
    Ingress,
    Egress,
}

impl NetworkFailureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkFailureMode::Total => "total",
            NetworkFailureMode::Ingress => "ingress",
            NetworkFailureMode::Egress => "egress",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    pub state: String,
    pub launch_time: Option<chrono::DateTime<chrono::Utc>>,
    pub lifecycle: String,
}

/// A network resource (subnet / NIC / VM port, depending on the provider)
/// eligible to have its ACL/security-group/firewall association
/// substituted for the duration of a network failure simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub id: String,
    pub current_association: String,
}

/// A provider-side resource (security group / network ACL / firewall rule /
/// security policy) created to block traffic, plus whatever original
/// associations it displaced so they can be restored on rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingArtifact {
    pub name: String,
    pub zone: String,
    pub original_associations: String,
}
