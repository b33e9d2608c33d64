//! Prometheus metrics ambient stack, grounded on
//! `mitigation-node/src/main.rs`'s `initialize_metrics`/`start_metrics_server`
//! pair: a binary describes its counters/gauges once at startup, installs
//! the process-wide recorder, and every call site that matters updates a
//! metric inline via the global `metrics` macros. Unlike the teacher's
//! per-binary copy of this plumbing, it lives here once since every
//! gardenchaos binary wants the same recorder wiring, just different
//! metric names.

use std::net::SocketAddr;

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{CommonError, Result};

/// Installs the process-wide Prometheus recorder and starts serving
/// `/metrics` on `listen_addr`. Call once per process, before any
/// `metrics::counter!`/`gauge!` use; a second call returns an error the
/// same way a second `PrometheusBuilder::install` does.
pub fn install_exporter(listen_addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .install()
        .map_err(|e| CommonError::Other(format!("failed to install prometheus exporter: {e}")))
}

/// Registers descriptions for the metrics `gardenchaos-orchestrator` emits
/// while running a compute or network failure simulation.
pub fn describe_orchestrator_metrics() {
    describe_counter!(
        "disruptions_started_total",
        "Disruption actions (terminate, restart, block, unblock) started"
    );
    describe_counter!("disruptions_completed_total", "Disruption actions that completed without error");
    describe_counter!("disruptions_failed_total", "Disruption actions that returned an error");
    describe_counter!("rollbacks_performed_total", "Rollback actions performed after a disruption or on cancellation");
    describe_counter!("rollbacks_failed_total", "Rollback actions that failed");
    describe_gauge!("active_simulation_running", "Whether a failure simulation is currently running (1) or not (0)");
}

/// Registers descriptions for the metrics `gardenchaos-probe` emits while
/// collecting heartbeats and assessing threshold policy violations.
pub fn describe_probe_metrics() {
    describe_counter!("heartbeats_recorded_total", "Heartbeats written by the API probe loop");
    describe_counter!("heartbeat_write_failures_total", "API probe heartbeat writes that failed");
    describe_counter!("heartbeat_violations_total", "Zones assessed as violating the API probe threshold policy");
    describe_counter!("webhook_violations_total", "Zones assessed as violating the mutating-webhook threshold policy");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_exporter_rejects_a_second_install_on_the_same_process() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let first = install_exporter(addr);
        assert!(first.is_ok());
        let second = install_exporter(addr);
        assert!(second.is_err());
    }
}
