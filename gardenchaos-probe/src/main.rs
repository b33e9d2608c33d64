use std::time::Duration;

use gardenchaos_core::TaskRegistry;
use gardenchaos_heartbeat::Thresholds;
use gardenchaos_probe::config::ProbeConfig;
use gardenchaos_probe::{collect_heartbeat_metrics, collect_webhook_metrics, run_api_probe, ApiProbeConfig, KubeClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gardenchaos_common::logging::init("gardenchaos_probe");
    gardenchaos_core::registry::install_signal_handlers();

    let config_name = gardenchaos_common::config::config_name("GARDENCHAOS_PROBE_CONFIG", "probe");
    let config: ProbeConfig = gardenchaos_common::config::load_layered(&config_name)?;

    if config.metrics.enabled {
        let listen_addr = config.metrics.listen_addr.parse().map_err(|e| anyhow::anyhow!("invalid metrics listen_addr: {e}"))?;
        gardenchaos_common::metrics::install_exporter(listen_addr)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        gardenchaos_common::metrics::describe_probe_metrics();
    }

    let client = KubeClient::try_new().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let http = reqwest::Client::new();
    let cancel = TaskRegistry::global().global_cancel_token();

    let from_timestamp = chrono::Utc::now().timestamp();
    let probe_config = ApiProbeConfig {
        namespace: config.namespace.clone(),
        probe: config.probe.clone(),
        zone: config.zone.clone(),
        target_url: config.target_url.clone(),
        interval: Duration::from_secs(config.interval_secs),
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    };
    let stats = run_api_probe(&client, &http, &probe_config, cancel).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
    tracing::info!(attempts = stats.attempts, failed_writes = stats.failed_writes, "probe loop ended");

    let to_timestamp = chrono::Utc::now().timestamp();
    let thresholds = Thresholds::default();
    let (_heartbeat_metrics, heartbeat_violations) = collect_heartbeat_metrics(
        &client,
        &config.namespace,
        from_timestamp,
        to_timestamp,
        &thresholds,
        Some((config.probe.as_str(), config.zone.as_str(), stats)),
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    if !heartbeat_violations.is_empty() {
        metrics::counter!("heartbeat_violations_total", heartbeat_violations.len() as u64);
        for violation in &heartbeat_violations {
            tracing::warn!(%violation, "heartbeat threshold violation");
        }
    }

    let webhook_violations = collect_webhook_metrics(&client, &config.namespace, from_timestamp, to_timestamp, &thresholds)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    if !webhook_violations.is_empty() {
        metrics::counter!("webhook_violations_total", webhook_violations.len() as u64);
        for violation in &webhook_violations {
            tracing::warn!(%violation, "web-hook threshold violation");
        }
    }

    TaskRegistry::global().cancel_all().await;
    Ok(())
}
