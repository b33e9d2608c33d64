use serde::{Deserialize, Serialize};

/// Top-level Probe Pipeline configuration, loaded via
/// `gardenchaos_common::config::load_layered`. Like the Failure
/// Orchestrator, this binary takes no CLI flags; it is a composition root
/// meant to be pointed at a single `(namespace, probe, zone)` by its
/// layered configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub namespace: String,
    pub probe: String,
    pub zone: String,
    pub target_url: String,
    pub interval_secs: u64,
    pub request_timeout_secs: u64,
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
        Self { enabled: false, listen_addr: "0.0.0.0:9091".to_string() }
    }
}
