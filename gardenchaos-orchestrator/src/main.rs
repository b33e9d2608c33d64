use std::sync::Arc;
use std::time::Duration;

use gardenchaos_cloud::{CloudAdapter, ComputeFailureMode, Filters, NetworkFailureMode, RestCloudAdapter, RestCloudAdapterConfig};
use gardenchaos_common::{CommonError, Secret};
use gardenchaos_core::TaskRegistry;
use gardenchaos_orchestrator::config::{OrchestratorConfig, SimulationKind};
use gardenchaos_orchestrator::{run_compute_failure_simulation, run_network_failure_simulation};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gardenchaos_common::logging::init("gardenchaos_orchestrator");
    gardenchaos_core::registry::install_signal_handlers();

    let config_name = gardenchaos_common::config::config_name("GARDENCHAOS_ORCHESTRATOR_CONFIG", "orchestrator");
    let config: OrchestratorConfig = gardenchaos_common::config::load_layered(&config_name)?;

    if config.metrics.enabled {
        let listen_addr = config.metrics.listen_addr.parse().map_err(|e| anyhow::anyhow!("invalid metrics listen_addr: {e}"))?;
        gardenchaos_common::metrics::install_exporter(listen_addr).map_err(anyhow_from_common)?;
        gardenchaos_common::metrics::describe_orchestrator_metrics();
    }

    let credential = Secret::<String>::from_env(&config.rest.credential_env_var)
        .map_err(|e| anyhow::anyhow!("missing cloud credential: {e}"))?;
    let adapter: Arc<dyn CloudAdapter> = Arc::new(RestCloudAdapter::new(RestCloudAdapterConfig {
        kind: config.provider,
        base_url: config.rest.base_url.clone(),
        credential,
    })?);

    let filters = Filters {
        instances: config.run.instance_filters.clone(),
        networks: config.run.network_filters.clone(),
        subnets: Vec::new(),
    };
    let duration = Duration::from_secs(config.run.duration_secs);
    let cancel = TaskRegistry::global().global_cancel_token();

    match config.run.kind {
        SimulationKind::Compute => {
            let mode = match config.run.compute_mode.as_deref() {
                Some("restart") => ComputeFailureMode::Restart,
                _ => ComputeFailureMode::Terminate,
            };
            run_compute_failure_simulation(
                adapter,
                &config.compute,
                mode,
                Duration::from_secs(config.run.min_runtime_secs),
                Duration::from_secs(config.run.max_runtime_secs),
                &config.run.zone,
                filters,
                duration,
                cancel,
            )
            .await
            .map_err(anyhow_from_common)?;
        }
        SimulationKind::Network => {
            let mode = match config.run.network_mode.as_deref() {
                Some("ingress") => NetworkFailureMode::Ingress,
                Some("egress") => NetworkFailureMode::Egress,
                _ => NetworkFailureMode::Total,
            };
            run_network_failure_simulation(adapter, &config.network, mode, &config.run.zone, filters, duration, cancel)
                .await
                .map_err(anyhow_from_common)?;
        }
    }

    TaskRegistry::global().cancel_all().await;
    Ok(())
}

fn anyhow_from_common(err: CommonError) -> anyhow::Error {
    anyhow::anyhow!(err.to_string())
}
