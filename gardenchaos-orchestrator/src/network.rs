//! Network failure simulation loop, ported from
//! `chaosgarden/aws/actions.py::run_network_failure_simulation`/
//! `rollback_network_failure_simulation` and the Azure/GCP/vSphere variants
//! (rollback-first, then setup, then hold-and-reassert, then rollback).

use std::sync::Arc;
use std::time::Duration;

use gardenchaos_cloud::{CloudAdapter, Filters, NetworkFailureMode};
use gardenchaos_common::Result;
use gardenchaos_core::{CancelToken, Terminator};

use crate::config::NetworkFailureConfig;

/// Explicit states of one network failure simulation run, driving the
/// rollback-first/setup/hold/rollback sequence described in spec.md §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailureState {
    Idle,
    Holding,
    RollingBack,
}

/// Runs a network failure simulation against `zone`/`filters` for
/// `duration` (zero means "until cancelled"), unconditionally rolling back
/// any left-over blocking artifact from a previous hard-aborted run first.
/// While holding, providers that can reassociate mid-run
/// ([`CloudAdapter::reassociates_mid_run`]) have their blocking association
/// re-applied every tick, since an external controller can otherwise
/// silently restore the original association underneath us.
pub async fn run_network_failure_simulation(
    adapter: Arc<dyn CloudAdapter>,
    config: &NetworkFailureConfig,
    mode: NetworkFailureMode,
    zone: &str,
    filters: Filters,
    duration: Duration,
    cancel: CancelToken,
) -> Result<()> {
    let mut state = NetworkFailureState::Idle;

    rollback_network_failure_simulation(adapter.as_ref(), zone, &filters).await?;

    tracing::info!(zone, mode = mode.as_str(), "partitioning network traffic");
    metrics::counter!("disruptions_started_total", 1);
    let artifact = match adapter.create_blocking_artifact(zone, &filters, mode).await {
        Ok(artifact) => {
            metrics::counter!("disruptions_completed_total", 1);
            artifact
        }
        Err(err) => {
            metrics::counter!("disruptions_failed_total", 1);
            return Err(err);
        }
    };
    state = NetworkFailureState::Holding;
    metrics::gauge!("active_simulation_running", 1.0);

    let terminator = Terminator::new(duration, cancel, "network-failure-simulation");
    while !terminator.is_terminated() {
        if adapter.reassociates_mid_run() {
            if let Err(err) = adapter.reassert_blocking_artifact(&artifact).await {
                tracing::error!(%err, "virtual machine blocking failed");
            }
        }
        tokio::time::sleep(Duration::from_secs(config.hold_interval_secs)).await;
    }

    state = NetworkFailureState::RollingBack;
    tracing::info!(zone, mode = mode.as_str(), ?state, "unpartitioning network traffic");
    metrics::gauge!("active_simulation_running", 0.0);
    rollback_network_failure_simulation(adapter.as_ref(), zone, &filters).await?;
    Ok(())
}

/// Restores original associations and deletes the blocking artifact, if
/// one exists. Safe to call unconditionally: this is exactly how the
/// Python original guards against a hard-aborted previous run leaving a
/// dangling block in place.
pub async fn rollback_network_failure_simulation(adapter: &dyn CloudAdapter, zone: &str, filters: &Filters) -> Result<()> {
    let outcome = adapter.delete_blocking_artifact(zone, filters).await;
    match &outcome {
        Ok(()) => metrics::counter!("rollbacks_performed_total", 1),
        Err(_) => metrics::counter!("rollbacks_failed_total", 1),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use gardenchaos_cloud::{CloudProviderKind, MockCloudAdapter};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn rollback_first_then_setup_then_rollback_on_expiry() {
        let adapter = Arc::new(MockCloudAdapter::new(CloudProviderKind::Aws));
        let config = NetworkFailureConfig { hold_interval_secs: 0 };

        run_network_failure_simulation(
            adapter.clone(),
            &config,
            NetworkFailureMode::Total,
            "z0",
            Filters::default(),
            Duration::from_millis(30),
            CancelToken::never(),
        )
        .await
        .unwrap();

        assert_eq!(adapter.calls.artifacts_created.load(Ordering::Relaxed), 1);
        assert_eq!(adapter.calls.artifacts_deleted.load(Ordering::Relaxed), 1);
        assert!(adapter
            .find_blocking_artifact("z0", &Filters::default(), NetworkFailureMode::Total)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn leftover_artifact_from_prior_run_is_rolled_back_first() {
        let adapter = Arc::new(MockCloudAdapter::new(CloudProviderKind::Aws));
        adapter.create_blocking_artifact("z0", &Filters::default(), NetworkFailureMode::Total).await.unwrap();
        assert_eq!(adapter.calls.artifacts_created.load(Ordering::Relaxed), 1);

        let config = NetworkFailureConfig { hold_interval_secs: 0 };
        run_network_failure_simulation(
            adapter.clone(),
            &config,
            NetworkFailureMode::Total,
            "z0",
            Filters::default(),
            Duration::from_millis(20),
            CancelToken::never(),
        )
        .await
        .unwrap();

        assert_eq!(adapter.calls.artifacts_deleted.load(Ordering::Relaxed), 2);
    }
}
