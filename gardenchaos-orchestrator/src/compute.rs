//! Compute failure simulation loop, ported from
//! `chaosgarden/aws/actions.py::run_compute_failure_simulation` and its
//! per-provider siblings, generalized over [`CloudAdapter`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gardenchaos_cloud::{default_compute_eligible, CloudAdapter, ComputeFailureMode, Filters};
use gardenchaos_common::Result;
use gardenchaos_core::{CancelToken, Terminator};
use rand::Rng;

use crate::config::ComputeFailureConfig;

fn jitter(min_runtime: Duration, max_runtime: Duration) -> Duration {
    let max_runtime = max_runtime.max(min_runtime);
    if max_runtime == min_runtime {
        return min_runtime;
    }
    let secs = rand::thread_rng().gen_range(min_runtime.as_secs()..=max_runtime.as_secs());
    Duration::from_secs(secs)
}

/// Continuously terminates or restarts instances matching `zone`/`filters`
/// in a cloud-agnostic way, scheduling each instance's next action between
/// `min_runtime` and `max_runtime` after it first becomes eligible (or,
/// once acted on, after a provider-specific backoff to guard against a
/// silently-failed terminate/restart call).
///
/// Every instance gets at least one action scheduled within `max_runtime +
/// restart_backoff` seconds of becoming eligible, even if `launch_time` is
/// unknown — the schedule is seeded from "now" in that case.
pub async fn run_compute_failure_simulation(
    adapter: Arc<dyn CloudAdapter>,
    config: &ComputeFailureConfig,
    mode: ComputeFailureMode,
    min_runtime: Duration,
    max_runtime: Duration,
    zone: &str,
    filters: Filters,
    duration: Duration,
    cancel: CancelToken,
) -> Result<()> {
    let max_runtime = max_runtime.max(min_runtime);
    let mut schedule_by_id: HashMap<String, DateTime<Utc>> = HashMap::new();
    let terminator = Terminator::new(duration, cancel, "compute-failure-simulation");

    tracing::info!(zone, mode = ?mode, "messing up instances continuously until terminated");
    metrics::gauge!("active_simulation_running", 1.0);
    while !terminator.is_terminated() {
        match adapter.list_instances(zone, &filters).await {
            Ok(instances) => {
                let mut to_act = Vec::new();
                let now = Utc::now();
                for instance in instances {
                    if !default_compute_eligible(&instance.state, mode) {
                        continue;
                    }
                    let scheduled_at = *schedule_by_id.entry(instance.id.clone()).or_insert_with(|| {
                        let base = instance.launch_time.unwrap_or(now);
                        base + chrono::Duration::from_std(jitter(min_runtime, max_runtime)).unwrap_or_default()
                    });
                    if now > scheduled_at {
                        let reschedule_after = match mode {
                            ComputeFailureMode::Terminate => config.termination_backoff,
                            ComputeFailureMode::Restart => config.restart_backoff + jitter(min_runtime, max_runtime),
                        };
                        schedule_by_id.insert(
                            instance.id.clone(),
                            now + chrono::Duration::from_std(reschedule_after).unwrap_or_default(),
                        );
                        tracing::info!(instance_id = %instance.id, ?mode, "scheduled instance action");
                        to_act.push(instance.id);
                    }
                }
                if !to_act.is_empty() {
                    metrics::counter!("disruptions_started_total", to_act.len() as u64);
                    let outcome = match mode {
                        ComputeFailureMode::Terminate => adapter.terminate_instances(&to_act).await,
                        ComputeFailureMode::Restart => adapter.restart_instances(&to_act).await,
                    };
                    match outcome {
                        Ok(()) => metrics::counter!("disruptions_completed_total", to_act.len() as u64),
                        Err(err) => {
                            metrics::counter!("disruptions_failed_total", to_act.len() as u64);
                            tracing::error!(?mode, %err, "instances failed to act on");
                        }
                    }
                }
            }
            Err(err) => tracing::error!(%err, "failed to list instances"),
        }
        tokio::time::sleep(Duration::from_secs(config.scan_interval_secs)).await;
    }
    metrics::gauge!("active_simulation_running", 0.0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gardenchaos_cloud::{CloudProviderKind, Instance, MockCloudAdapter};

    #[tokio::test]
    async fn terminates_matching_instances_within_a_bounded_run() {
        let adapter = Arc::new(MockCloudAdapter::new(CloudProviderKind::Aws));
        adapter.seed_instance(
            Instance { id: "i-1".into(), state: "running".into(), launch_time: None, lifecycle: "normal".into() },
            "z0",
        );
        let config = ComputeFailureConfig { scan_interval_secs: 0, ..ComputeFailureConfig::default() };

        run_compute_failure_simulation(
            adapter.clone(),
            &config,
            ComputeFailureMode::Terminate,
            Duration::from_secs(0),
            Duration::from_secs(0),
            "z0",
            Filters::default(),
            Duration::from_millis(50),
            CancelToken::never(),
        )
        .await
        .unwrap();

        let instances = adapter.list_instances("z0", &Filters::default()).await.unwrap();
        assert_eq!(instances[0].state, "terminated");
    }

    #[test]
    fn jitter_is_bounded() {
        let d = jitter(Duration::from_secs(5), Duration::from_secs(10));
        assert!(d >= Duration::from_secs(5) && d <= Duration::from_secs(10));
    }

    #[test]
    fn jitter_handles_equal_bounds() {
        assert_eq!(jitter(Duration::from_secs(3), Duration::from_secs(3)), Duration::from_secs(3));
    }
}
