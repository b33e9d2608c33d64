//! In-memory `CloudAdapter` for orchestrator tests, modeled on
//! `mitigation-node`'s pattern of keeping a `DashMap`-backed in-memory
//! client alongside the real `reqwest`-based one.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use gardenchaos_common::{CommonError, Result};

use crate::adapter::{self, CloudAdapter};
use crate::associations;
use crate::tagging::zone_tag_name;
use crate::types::{BlockingArtifact, CloudProviderKind, Filters, Instance, Network, NetworkFailureMode};

#[derive(Debug, Clone)]
pub struct MockInstance {
    pub instance: Instance,
    pub zone: String,
}

#[derive(Debug, Clone)]
pub struct MockNetwork {
    pub network: Network,
    pub zone: String,
}

/// Records every terminate/restart/create/delete call so tests can assert
/// on call counts (e.g. the crash-recovery invariant: a second orchestrator
/// run against the same mock state must not double-create a blocking
/// artifact).
#[derive(Debug, Default)]
pub struct MockCallCounts {
    pub terminations: AtomicU64,
    pub restarts: AtomicU64,
    pub artifacts_created: AtomicU64,
    pub artifacts_deleted: AtomicU64,
    pub associations: AtomicU64,
    pub restorations: AtomicU64,
}

pub struct MockCloudAdapter {
    kind: CloudProviderKind,
    instances: DashMap<String, MockInstance>,
    networks: DashMap<String, MockNetwork>,
    artifacts: DashMap<(String, String), BlockingArtifact>,
    pub calls: Arc<MockCallCounts>,
}

impl MockCloudAdapter {
    pub fn new(kind: CloudProviderKind) -> Self {
        Self {
            kind,
            instances: DashMap::new(),
            networks: DashMap::new(),
            artifacts: DashMap::new(),
            calls: Arc::new(MockCallCounts::default()),
        }
    }

    pub fn seed_instance(&self, instance: Instance, zone: &str) {
        self.instances.insert(instance.id.clone(), MockInstance { instance, zone: zone.to_string() });
    }

    /// Seeds a network resource with its pre-simulation association, so
    /// tests can assert it comes back unchanged after a rollback.
    pub fn seed_network(&self, id: &str, zone: &str, current_association: &str) {
        self.networks.insert(
            id.to_string(),
            MockNetwork { network: Network { id: id.to_string(), current_association: current_association.to_string() }, zone: zone.to_string() },
        );
    }

    /// Reads a seeded network resource's current association back out, for
    /// tests to assert on after associate/restore.
    pub fn network_association(&self, id: &str) -> Option<String> {
        self.networks.get(id).map(|entry| entry.network.current_association.clone())
    }

    fn artifact_key(zone: &str, filters: &Filters) -> (String, String) {
        (zone.to_string(), format!("{filters:?}"))
    }
}

#[async_trait]
impl CloudAdapter for MockCloudAdapter {
    fn kind(&self) -> CloudProviderKind {
        self.kind
    }

    async fn list_instances(&self, zone: &str, _filters: &Filters) -> Result<Vec<Instance>> {
        Ok(self
            .instances
            .iter()
            .filter(|entry| entry.zone == zone)
            .map(|entry| entry.instance.clone())
            .collect())
    }

    async fn terminate_instances(&self, ids: &[String]) -> Result<()> {
        for id in ids {
            if let Some(mut entry) = self.instances.get_mut(id) {
                entry.instance.state = "terminated".to_string();
            }
        }
        self.calls.terminations.fetch_add(ids.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn restart_instances(&self, ids: &[String]) -> Result<()> {
        for id in ids {
            if let Some(mut entry) = self.instances.get_mut(id) {
                entry.instance.state = "running".to_string();
            }
        }
        self.calls.restarts.fetch_add(ids.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn list_networks(&self, zone: &str, _filters: &Filters) -> Result<Vec<Network>> {
        Ok(self.networks.iter().filter(|entry| entry.zone == zone).map(|entry| entry.network.clone()).collect())
    }

    async fn associate(&self, resource: &str, artifact: &BlockingArtifact, prior: Option<&str>) -> Result<String> {
        let mut entry = self
            .networks
            .get_mut(resource)
            .ok_or_else(|| CommonError::Other(format!("unknown network resource: {resource}")))?;
        let original = match prior {
            Some(prior) => prior.to_string(),
            None => entry.network.current_association.clone(),
        };
        entry.network.current_association = artifact.name.clone();
        self.calls.associations.fetch_add(1, Ordering::Relaxed);
        Ok(original)
    }

    async fn restore(&self, resource: &str, prior: &str) -> Result<()> {
        if let Some(mut entry) = self.networks.get_mut(resource) {
            entry.network.current_association = prior.to_string();
        }
        self.calls.restorations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn create_blocking_artifact(&self, zone: &str, filters: &Filters, mode: NetworkFailureMode) -> Result<BlockingArtifact> {
        let key = Self::artifact_key(zone, filters);
        if let Some(existing) = self.artifacts.get(&key) {
            return Ok(existing.clone());
        }
        let artifact = BlockingArtifact {
            name: zone_tag_name(zone, &format!("{filters:?}-{}", mode.as_str())),
            zone: zone.to_string(),
            original_associations: String::new(),
        };
        let prior = adapter::divert_resources(self, zone, filters, &artifact).await?;
        let artifact = BlockingArtifact { original_associations: associations::encode_for_kind(self.kind, &prior)?, ..artifact };
        self.artifacts.insert(key, artifact.clone());
        self.calls.artifacts_created.fetch_add(1, Ordering::Relaxed);
        Ok(artifact)
    }

    async fn delete_blocking_artifact(&self, zone: &str, filters: &Filters) -> Result<()> {
        let key = Self::artifact_key(zone, filters);
        let Some((_, artifact)) = self.artifacts.remove(&key) else {
            return Ok(());
        };
        match associations::decode_for_kind(self.kind, &artifact.original_associations) {
            Ok(original) => adapter::restore_resources(self, &original).await,
            Err(err) => tracing::error!(%err, artifact = %artifact.name, "failed to read original associations during rollback"),
        }
        self.calls.artifacts_deleted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn find_blocking_artifact(&self, zone: &str, filters: &Filters, _mode: NetworkFailureMode) -> Result<Option<BlockingArtifact>> {
        let key = Self::artifact_key(zone, filters);
        Ok(self.artifacts.get(&key).map(|entry| entry.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    fn filters() -> Filters {
        Filters::default()
    }

    #[tokio::test]
    async fn terminate_updates_state_and_counts() {
        let adapter = MockCloudAdapter::new(CloudProviderKind::Aws);
        adapter.seed_instance(
            Instance { id: "i-1".into(), state: "running".into(), launch_time: None, lifecycle: "normal".into() },
            "z0",
        );
        adapter.terminate_instances(&["i-1".to_string()]).await.unwrap();
        let instances = adapter.list_instances("z0", &filters()).await.unwrap();
        assert_eq!(instances[0].state, "terminated");
        assert_eq!(adapter.calls.terminations.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn create_blocking_artifact_is_idempotent() {
        let adapter = MockCloudAdapter::new(CloudProviderKind::Aws);
        let f = filters();
        let first = adapter.create_blocking_artifact("z0", &f, NetworkFailureMode::Total).await.unwrap();
        let second = adapter.create_blocking_artifact("z0", &f, NetworkFailureMode::Total).await.unwrap();
        assert_eq!(first.name, second.name);
        assert_eq!(adapter.calls.artifacts_created.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn delete_then_find_returns_none() {
        let adapter = MockCloudAdapter::new(CloudProviderKind::Aws);
        let f = filters();
        adapter.create_blocking_artifact("z0", &f, NetworkFailureMode::Total).await.unwrap();
        adapter.delete_blocking_artifact("z0", &f).await.unwrap();
        assert!(adapter.find_blocking_artifact("z0", &f, NetworkFailureMode::Total).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rollback_restores_every_diverted_resource_to_its_prior_association() {
        // spec.md §8 scenario 4: create a blocking artifact over two
        // resources, then roll back and confirm both come back to their
        // pre-simulation binding, not the blocking artifact's.
        let adapter = MockCloudAdapter::new(CloudProviderKind::Aws);
        adapter.seed_network("s1", "z0", "a1");
        adapter.seed_network("s2", "z0", "a2");
        let f = filters();

        let artifact = adapter.create_blocking_artifact("z0", &f, NetworkFailureMode::Total).await.unwrap();
        assert_eq!(adapter.network_association("s1").unwrap(), artifact.name);
        assert_eq!(adapter.network_association("s2").unwrap(), artifact.name);
        assert_eq!(adapter.calls.associations.load(Ordering::Relaxed), 2);

        adapter.delete_blocking_artifact("z0", &f).await.unwrap();
        assert_eq!(adapter.network_association("s1").unwrap(), "a1");
        assert_eq!(adapter.network_association("s2").unwrap(), "a2");
        assert_eq!(adapter.calls.restorations.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn second_orchestrator_run_against_same_state_does_not_double_divert() {
        let adapter = MockCloudAdapter::new(CloudProviderKind::Aws);
        adapter.seed_network("s1", "z0", "a1");
        let f = filters();

        adapter.create_blocking_artifact("z0", &f, NetworkFailureMode::Total).await.unwrap();
        adapter.create_blocking_artifact("z0", &f, NetworkFailureMode::Total).await.unwrap();
        assert_eq!(adapter.calls.associations.load(Ordering::Relaxed), 1);
    }
}
