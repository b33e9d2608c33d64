//! Custom resource types written by the in-cluster probe pods and read back
//! by the collection half of this crate.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A raw heartbeat written by a probe pod (e.g. `api-probe-eu1-1700000000`)
/// reporting whether the target it checks was reachable at that instant.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "chaos.gardener.cloud",
    version = "v1",
    kind = "Heartbeat",
    plural = "heartbeats",
    namespaced
)]
pub struct HeartbeatSpec {
    pub probe: String,
    pub zone: String,
    pub timestamp: i64,
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// A heartbeat that required explicit acknowledgement before being
/// considered delivered (the web-hook probe's challenge/response flow).
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "chaos.gardener.cloud",
    version = "v1",
    kind = "AcknowledgedHeartbeat",
    plural = "acknowledgedheartbeats",
    namespaced
)]
pub struct AcknowledgedHeartbeatSpec {
    pub probe: String,
    pub zone: String,
    pub timestamp: i64,
    pub ready: bool,
    pub acknowledged: bool,
}
