use std::collections::HashMap;
use std::time::Duration;

use gardenchaos_cloud::CloudProviderKind;
use serde::{Deserialize, Serialize};

/// Top-level Failure Orchestrator configuration, loaded via
/// `gardenchaos_common::config::load_layered`. There is deliberately no CLI
/// flag parsing here — every run of this binary is driven entirely by its
/// layered TOML configuration (base file + `.local.toml` overlay + env
/// overrides), matching the rest of the ambient stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Which cloud this orchestrator instance drives.
    pub provider: CloudProviderKind,
    pub rest: RestConfig,
    pub compute: ComputeFailureConfig,
    pub network: NetworkFailureConfig,
    pub run: RunConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Prometheus exporter configuration, matching the teacher's
/// `MetricsConfig` shape (`enabled` + `listen_addr`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: false, listen_addr: "0.0.0.0:9090".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestConfig {
    pub base_url: String,
    pub credential_env_var: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationKind {
    Compute,
    Network,
}

/// Describes the single simulation this orchestrator process runs for its
/// lifetime. Production deployments run one orchestrator instance per
/// `(zone, simulation)` pair, matching spec.md §1's "each simulation run is
/// independent" framing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub kind: SimulationKind,
    pub zone: String,
    #[serde(default)]
    pub instance_filters: Vec<HashMap<String, String>>,
    #[serde(default)]
    pub network_filters: Vec<HashMap<String, String>>,
    /// `compute`-only: "terminate" or "restart".
    #[serde(default)]
    pub compute_mode: Option<String>,
    /// `network`-only: "total", "ingress" or "egress".
    #[serde(default)]
    pub network_mode: Option<String>,
    #[serde(default)]
    pub min_runtime_secs: u64,
    #[serde(default)]
    pub max_runtime_secs: u64,
    /// Zero means "run until cancelled".
    #[serde(default)]
    pub duration_secs: u64,
}

/// Matches `ASSUMED_COMPUTE_TERMINATION_TIME_IN_SECONDS` /
/// `ASSUMED_COMPUTE_RESTART_TIME_IN_SECONDS` in `chaosgarden/aws/actions.py`
/// — exposed as configuration rather than hardcoded, per spec's own design
/// note that these assumptions should be tunable per environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeFailureConfig {
    #[serde(with = "humantime_secs")]
    pub termination_backoff: Duration,
    #[serde(with = "humantime_secs")]
    pub restart_backoff: Duration,
    pub scan_interval_secs: u64,
}

impl Default for ComputeFailureConfig {
    fn default() -> Self {
        Self {
            termination_backoff: Duration::from_secs(20),
            restart_backoff: Duration::from_secs(20),
            scan_interval_secs: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkFailureConfig {
    pub hold_interval_secs: u64,
}

impl Default for NetworkFailureConfig {
    fn default() -> Self {
        Self { hold_interval_secs: 2 }
    }
}

mod humantime_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
