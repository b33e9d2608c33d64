//! External heartbeat emission and collection, grounded on
//! `chaosgarden/k8s/probe/resources/probe_pod.py`'s polling loop (hit a
//! target, record a `Heartbeat` custom resource stamped with the outcome)
//! and `chaosgarden/k8s/probe/__init__.py`'s teardown-time assessment
//! (list every heartbeat, run it through `Metrics`, report violations).

use std::time::Duration;

use gardenchaos_common::Result;
use gardenchaos_core::CancelToken;
use gardenchaos_heartbeat::{HeartbeatState, Metrics, MetricsForZoneCollection, RawHeartbeat, Thresholds};
use tracing::{debug, warn};

use crate::client::KubernetesClient;
use crate::types::HeartbeatSpec;

pub struct ApiProbeConfig {
    pub namespace: String,
    pub probe: String,
    pub zone: String,
    pub target_url: String,
    pub interval: Duration,
    pub request_timeout: Duration,
}

/// Local bookkeeping the probe pod keeps for itself: how many polls it
/// attempted and how many heartbeat writes it couldn't get onto the API
/// server at all (as opposed to a `NotReady` result it wrote successfully).
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalProbeStats {
    pub attempts: u64,
    pub failed_writes: u64,
}

/// Polls `target_url` on `interval` until `cancel` fires, writing one
/// `Heartbeat` custom resource per tick whether the poll succeeded or not.
/// A failure to reach the API server to write the heartbeat (not the same
/// as the poll itself failing) is only tracked locally — it cannot, by
/// definition, show up as a missing custom resource in a way the reader
/// can distinguish from a pod that was never scheduled.
pub async fn run_api_probe<K: KubernetesClient>(
    client: &K,
    http: &reqwest::Client,
    config: &ApiProbeConfig,
    cancel: CancelToken,
) -> Result<LocalProbeStats> {
    let mut stats = LocalProbeStats::default();
    let mut ticker = tokio::time::interval(config.interval);

    while !cancel.is_cancelled() {
        ticker.tick().await;
        if cancel.is_cancelled() {
            break;
        }
        stats.attempts += 1;

        let ready = match tokio::time::timeout(config.request_timeout, http.get(&config.target_url).send()).await {
            Ok(Ok(response)) => response.status().is_success(),
            Ok(Err(e)) => {
                debug!(error = %e, "api probe request failed");
                false
            }
            Err(_) => {
                debug!("api probe request timed out");
                false
            }
        };

        let timestamp = now_unix();
        let name = format!("{}-probe-{}-{}", config.probe, config.zone, timestamp);
        let heartbeat = crate::types::Heartbeat::new(
            &name,
            HeartbeatSpec { probe: config.probe.clone(), zone: config.zone.clone(), timestamp, ready, payload: None },
        );
        if let Err(e) = client.apply(Some(&config.namespace), &heartbeat).await {
            warn!(error = %e, name, "failed to write heartbeat");
            stats.failed_writes += 1;
        }
    }
    Ok(stats)
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Lists every `Heartbeat` custom resource in `namespace` and feeds it
/// through [`Metrics`], returning the computed metrics and any threshold
/// violations for the `[from_timestamp, to_timestamp]` window.
///
/// `local_stats`, when given, is this probe's own `(probe, zone,
/// LocalProbeStats)`: a local write failure never produces a `Heartbeat`
/// custom resource at all, so it cannot show up in `heartbeats` above. We
/// fold `failed_writes` into that probe/zone's `heartbeats_sent` count so
/// it surfaces as a data-loss violation instead of silently vanishing,
/// matching `chaosgarden/k8s/probes.py::generate_metrics`'s
/// `record_heartbeats_sent(len(successful) + len(failed))`.
pub async fn collect_heartbeat_metrics<K: KubernetesClient>(
    client: &K,
    namespace: &str,
    from_timestamp: i64,
    to_timestamp: i64,
    thresholds: &Thresholds,
    local_stats: Option<(&str, &str, LocalProbeStats)>,
) -> Result<(Metrics, Vec<String>)> {
    let heartbeats = client.list_heartbeats(namespace).await?;
    let raw: Vec<RawHeartbeat> = heartbeats
        .into_iter()
        .filter_map(|hb| {
            let name = hb.metadata.name?;
            Some(RawHeartbeat { name, ready: hb.spec.ready, payload: hb.spec.payload })
        })
        .collect();
    let mut metrics = Metrics::new(&raw, from_timestamp, to_timestamp);
    if let Some((probe, zone, stats)) = local_stats {
        if stats.failed_writes > 0 {
            let zone_metrics = metrics.get_metrics_for_probe(probe).get_metrics_for_zone(zone);
            let sent = zone_metrics.heartbeats_received() + stats.failed_writes as i64;
            zone_metrics.record_heartbeats_sent(sent);
        }
    }
    let violations = metrics.assess(thresholds);
    Ok((metrics, violations))
}

/// The web-hook probe's data-loss check is special: a `Heartbeat` custom
/// resource records that a challenge was *sent*, an `AcknowledgedHeartbeat`
/// records that it was *received and acknowledged*. Everything else about
/// gap/downtime accounting is identical to a regular probe.
pub async fn collect_webhook_metrics<K: KubernetesClient>(
    client: &K,
    namespace: &str,
    from_timestamp: i64,
    to_timestamp: i64,
    thresholds: &Thresholds,
) -> Result<Vec<String>> {
    let sent = client.list_heartbeats(namespace).await?;
    let acknowledged = client.list_acknowledged_heartbeats(namespace).await?;

    let mut collection = MetricsForZoneCollection::new("web-hook");
    let mut sent_by_zone: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
    for hb in &sent {
        if hb.spec.probe != "web-hook" {
            continue;
        }
        *sent_by_zone.entry(hb.spec.zone.clone()).or_insert(0) += 1;
    }

    // The acknowledged-heartbeat series is what drives gap/downtime
    // accounting: whether a challenge got a timely acknowledgement is the
    // web-hook probe's actual readiness signal.
    let mut zones_with_acks: std::collections::HashSet<String> = std::collections::HashSet::new();
    for ack in &acknowledged {
        if ack.spec.probe != "web-hook" {
            continue;
        }
        zones_with_acks.insert(ack.spec.zone.clone());
        let state = if ack.spec.acknowledged { HeartbeatState::Ready } else { HeartbeatState::NotReady };
        collection.get_metrics_for_zone(&ack.spec.zone).record_heartbeat(ack.spec.timestamp, state, None);
    }
    for (zone, count) in &sent_by_zone {
        let zone_metrics = collection.get_metrics_for_zone(zone);
        // A zone that never received a single acknowledgement would leave
        // an empty series, which `compute` can't operate on — record it as
        // entirely down from the start of the window instead.
        if !zones_with_acks.contains(zone) {
            zone_metrics.record_heartbeat(from_timestamp, HeartbeatState::NotReady, None);
        }
        zone_metrics.record_heartbeats_sent(*count);
    }

    collection.compute(from_timestamp, to_timestamp);
    Ok(collection.assess(thresholds))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::{Node, Pod};

    use super::*;
    use crate::types::AcknowledgedHeartbeat;

    #[test]
    fn local_probe_stats_default_is_zero() {
        let stats = LocalProbeStats::default();
        assert_eq!(stats.attempts, 0);
        assert_eq!(stats.failed_writes, 0);
    }

    #[derive(Default)]
    struct EmptyClient;

    #[async_trait]
    impl KubernetesClient for EmptyClient {
        async fn apply<T>(&self, _namespace: Option<&str>, _resource: &T) -> Result<()>
        where
            T: kube::Resource + serde::Serialize + serde::de::DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static,
            T::DynamicType: Default,
        {
            Ok(())
        }

        async fn delete<T>(&self, _namespace: Option<&str>, _name: &str) -> Result<()>
        where
            T: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug + Send + Sync + 'static,
            T::DynamicType: Default,
        {
            Ok(())
        }

        async fn list_pods(&self, _namespace: &str, _label_selector: &str) -> Result<Vec<Pod>> {
            Ok(vec![])
        }

        async fn list_nodes(&self) -> Result<Vec<Node>> {
            Ok(vec![])
        }

        async fn list_heartbeats(&self, _namespace: &str) -> Result<Vec<crate::types::Heartbeat>> {
            Ok(vec![])
        }

        async fn list_acknowledged_heartbeats(&self, _namespace: &str) -> Result<Vec<AcknowledgedHeartbeat>> {
            Ok(vec![])
        }

        async fn get_raw(&self, _group: &str, _version: &str, _kind: &str, _namespace: Option<&str>, _name: &str) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }

        async fn get_secret_data(&self, _namespace: &str, _name: &str) -> Result<std::collections::BTreeMap<String, String>> {
            Ok(std::collections::BTreeMap::new())
        }
    }

    #[tokio::test]
    async fn failed_local_writes_surface_as_a_data_loss_violation() {
        // A probe pod that wrote zero heartbeats locally because every
        // write to the API server failed would otherwise vanish from the
        // assessment entirely: no Heartbeat custom resource ever existed
        // to count against it.
        let client = EmptyClient;
        let stats = LocalProbeStats { attempts: 3, failed_writes: 3 };
        let (_metrics, violations) =
            collect_heartbeat_metrics(&client, "gardenchaos", 0, 100, &Thresholds::default(), Some(("api", "z0", stats)))
                .await
                .unwrap();
        assert!(violations.iter().any(|v| v.contains("Data loss detected")));
    }

    #[tokio::test]
    async fn no_local_write_failures_means_no_merge_and_no_spurious_violation() {
        let client = EmptyClient;
        let stats = LocalProbeStats { attempts: 3, failed_writes: 0 };
        let (_metrics, violations) =
            collect_heartbeat_metrics(&client, "gardenchaos", 0, 100, &Thresholds::default(), Some(("api", "z0", stats)))
                .await
                .unwrap();
        assert!(violations.is_empty());
    }
}
