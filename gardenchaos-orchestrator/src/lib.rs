//! Failure Orchestrator: compute and network failure simulation loops
//! driving any [`gardenchaos_cloud::CloudAdapter`]. See spec.md §4.5.

pub mod compute;
pub mod config;
pub mod network;

pub use compute::run_compute_failure_simulation;
pub use config::OrchestratorConfig;
pub use network::{rollback_network_failure_simulation, run_network_failure_simulation, NetworkFailureState};
