//! Health Probe Pipeline: deploys in-cluster probe/webhook resources,
//! emits external heartbeats against them, and collects/assesses the
//! result. See spec.md §4.6–§4.8.

pub mod client;
pub mod collect;
pub mod config;
pub mod deploy;
pub mod manifests;
pub mod types;

pub use client::{KubeClient, KubernetesClient};
pub use collect::{collect_heartbeat_metrics, collect_webhook_metrics, run_api_probe, ApiProbeConfig, LocalProbeStats};
pub use deploy::{deploy, undeploy, ProbeDeployment};
pub use types::{AcknowledgedHeartbeat, AcknowledgedHeartbeatSpec, Heartbeat, HeartbeatSpec};
