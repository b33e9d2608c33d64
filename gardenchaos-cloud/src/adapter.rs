//! The Cloud Provider Adapter trait: the one seam every Failure Orchestrator
//! loop talks through, so it never has to know which of the six supported
//! clouds it's driving.

use std::collections::BTreeMap;

use async_trait::async_trait;
use gardenchaos_common::Result;

use crate::types::{BlockingArtifact, CloudProviderKind, ComputeFailureMode, Filters, Instance, Network, NetworkFailureMode};

#[async_trait]
pub trait CloudAdapter: Send + Sync {
    fn kind(&self) -> CloudProviderKind;

    fn reassociates_mid_run(&self) -> bool {
        self.kind().reassociates_mid_run()
    }

    /// Lists compute instances in `zone` matching `filters`, for both the
    /// impact-assessment report and the compute failure loop's scan.
    async fn list_instances(&self, zone: &str, filters: &Filters) -> Result<Vec<Instance>>;

    async fn terminate_instances(&self, ids: &[String]) -> Result<()>;

    async fn restart_instances(&self, ids: &[String]) -> Result<()>;

    /// Lists network resources (subnets / NICs / VM ports) in `zone`
    /// matching `filters` — every resource a network failure simulation
    /// diverts onto its blocking artifact.
    async fn list_networks(&self, zone: &str, filters: &Filters) -> Result<Vec<Network>>;

    /// Substitutes `resource`'s current network-policy association for
    /// `artifact`'s, returning the association it displaced so the caller
    /// can persist it for rollback.
    ///
    /// `prior`, when given, is the value already on record as the true
    /// original association (set on a reassert call after the initial
    /// setup, so a provider that reassociates mid-run doesn't mistake its
    /// own already-substituted state, or a drifted-back original, for a
    /// fresh "prior" reading). When `None`, the resource's
    /// `current_association` at call time is taken as the prior value.
    async fn associate(&self, resource: &str, artifact: &BlockingArtifact, prior: Option<&str>) -> Result<String>;

    /// Restores `resource`'s network-policy association to `prior`.
    async fn restore(&self, resource: &str, prior: &str) -> Result<()>;

    /// Creates (or, if one already exists for this `(zone, filters, mode)`
    /// triple, returns) the blocking artifact, diverts every matching
    /// network resource onto it via [`Self::associate`], and persists the
    /// displaced associations on the artifact itself so a later process
    /// can read them back after a crash (spec.md's crash-recovery
    /// invariant).
    async fn create_blocking_artifact(
        &self,
        zone: &str,
        filters: &Filters,
        mode: NetworkFailureMode,
    ) -> Result<BlockingArtifact>;

    /// Re-applies the blocking association. A no-op for providers that
    /// don't reassociate mid-run; required for Azure/GCP/vSphere, where an
    /// external controller can silently restore the original association
    /// while a simulation is still in its "Hold" phase.
    async fn reassert_blocking_artifact(&self, artifact: &BlockingArtifact) -> Result<()> {
        let _ = artifact;
        Ok(())
    }

    /// Reads back the original-associations mapping recorded on whatever
    /// blocking artifact exists for `(zone, filters)`, restores every
    /// resource it names to its prior binding (best-effort: a failure on
    /// one resource is logged and does not stop the others), and deletes
    /// the artifact. Idempotent: calling it when no blocking artifact
    /// exists for this `(zone, filters)` pair is a no-op, matching
    /// `rollback_network_failure_simulation`'s "rollback any left-overs"
    /// semantics (called unconditionally at the start of every network
    /// failure simulation run).
    async fn delete_blocking_artifact(&self, zone: &str, filters: &Filters) -> Result<()>;

    async fn find_blocking_artifact(&self, zone: &str, filters: &Filters, mode: NetworkFailureMode) -> Result<Option<BlockingArtifact>>;
}

/// Diverts every network resource matching `filters` in `zone` onto
/// `artifact`, returning the `resource id -> prior association` map the
/// artifact's original-associations record is built from. Shared by every
/// `CloudAdapter` implementation's `create_blocking_artifact`.
pub async fn divert_resources(
    adapter: &dyn CloudAdapter,
    zone: &str,
    filters: &Filters,
    artifact: &BlockingArtifact,
) -> Result<BTreeMap<String, String>> {
    let networks = adapter.list_networks(zone, filters).await?;
    let mut prior = BTreeMap::new();
    for network in networks {
        let original = adapter.associate(&network.id, artifact, None).await?;
        prior.insert(network.id, original);
    }
    Ok(prior)
}

/// Re-applies `artifact`'s association to every resource in
/// `original_associations`, passing the already-known prior value through
/// so a reassert never mistakes the current (blocked) state for a new
/// original reading.
pub async fn reassert_resources(adapter: &dyn CloudAdapter, artifact: &BlockingArtifact, original_associations: &BTreeMap<String, String>) {
    for (resource, prior) in original_associations {
        if let Err(err) = adapter.associate(resource, artifact, Some(prior.as_str())).await {
            tracing::error!(%err, resource, "failed to reassert blocking association");
        }
    }
}

/// Restores every resource in `original_associations` to its prior
/// binding, best-effort: a failure on one resource is logged and does not
/// stop the loop (spec.md §4.4/§4.9 — leaving the remainder diverted is
/// still better than aborting rollback outright).
pub async fn restore_resources(adapter: &dyn CloudAdapter, original_associations: &BTreeMap<String, String>) {
    for (resource, prior) in original_associations {
        if let Err(err) = adapter.restore(resource, prior).await {
            tracing::error!(%err, resource, "failed to restore resource to its prior association");
        }
    }
}

pub fn default_compute_eligible(state: &str, mode: ComputeFailureMode) -> bool {
    let state = state.to_lowercase();
    match mode {
        ComputeFailureMode::Terminate => !matches!(state.as_str(), "shutting-down" | "terminated"),
        ComputeFailureMode::Restart => state == "running",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminate_mode_skips_already_terminating_instances() {
        assert!(default_compute_eligible("running", ComputeFailureMode::Terminate));
        assert!(!default_compute_eligible("shutting-down", ComputeFailureMode::Terminate));
        assert!(!default_compute_eligible("terminated", ComputeFailureMode::Terminate));
    }

    #[test]
    fn restart_mode_only_targets_running_instances() {
        assert!(default_compute_eligible("running", ComputeFailureMode::Restart));
        assert!(!default_compute_eligible("stopped", ComputeFailureMode::Restart));
    }
}
