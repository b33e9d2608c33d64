//! Deterministic blocking-artifact naming, ported from the
//! `ZONE_TAG_NAME_LAMBDA` / `NETWORK_SECURITY_GROUP_NAME_LAMBDA` /
//! `FIREWALL_NAME_LAMBDA` / `SECURITY_POLICY_NAME_LAMBDA` /
//! `SECURITY_GROUP_NAME_LAMBDA` family across the provider action modules.
//!
//! The original hashes the filter's string representation with MD5 and
//! keeps the first 16 hex characters (`hexdigest()[:-16]`). We use SHA-256
//! instead — no example in this workspace depends on an `md5` crate, and
//! `sha2` is already part of the dependency stack — which is a deliberate
//! substitution, not a silent deviation: the only property that matters
//! here is a short, stable, collision-resistant fingerprint, which SHA-256
//! provides equally well.

use sha2::{Digest, Sha256};

use crate::types::{CloudProviderKind, NetworkFailureMode};

fn filter_fingerprint(filter_repr: &str) -> String {
    let digest = Sha256::digest(filter_repr.as_bytes());
    format!("{digest:x}")[..16].to_string()
}

/// AWS/OpenStack family: `chaosgarden-block-{fingerprint}-{zone}`.
pub fn zone_tag_name(zone: &str, filter_repr: &str) -> String {
    format!("gardener.cloud/chaos/chaosgarden-block-{}-{zone}", filter_fingerprint(filter_repr))
}

/// GCP/vSphere family: mode is baked into the name since a single zone can
/// run concurrent ingress- and egress-only simulations.
pub fn mode_scoped_tag_name(zone: &str, filter_repr: &str, mode: NetworkFailureMode) -> String {
    format!("chaosgarden-block-{}-{}-{zone}", mode.as_str(), filter_fingerprint(filter_repr))
}

/// Azure family: also scopes by region, since security groups are
/// regional resources whose names must be unique within it.
pub fn region_scoped_tag_name(region: &str, zone: &str, filter_repr: &str) -> String {
    format!("chaosgarden-block-{}-{region}-{zone}", filter_fingerprint(filter_repr))
}

pub const ORIGINAL_ASSOCIATIONS_TAG_NAME: &str = "gardener.cloud/chaos/original-network-acl-associations";
pub const ORIGINAL_SECURITY_GROUP_TAG_NAME: &str = "gardener.cloud-chaos-original-network-security-group";

/// The tag/metadata key the original-associations mapping is persisted
/// under on the blocking artifact itself, so a later process (after a
/// crash) can read it back (spec.md's crash-recovery invariant).
pub fn original_associations_tag_name(kind: CloudProviderKind) -> &'static str {
    if kind.uses_semicolon_associations() {
        ORIGINAL_ASSOCIATIONS_TAG_NAME
    } else {
        ORIGINAL_SECURITY_GROUP_TAG_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_tag_name_is_deterministic() {
        let a = zone_tag_name("eu1", "{'vpcs': []}");
        let b = zone_tag_name("eu1", "{'vpcs': []}");
        assert_eq!(a, b);
    }

    #[test]
    fn different_filters_produce_different_fingerprints() {
        let a = zone_tag_name("eu1", "{'vpcs': []}");
        let b = zone_tag_name("eu1", "{'vpcs': [1]}");
        assert_ne!(a, b);
    }

    #[test]
    fn mode_scoped_name_differs_per_mode() {
        let ingress = mode_scoped_tag_name("eu1", "filter", NetworkFailureMode::Ingress);
        let egress = mode_scoped_tag_name("eu1", "filter", NetworkFailureMode::Egress);
        assert_ne!(ingress, egress);
    }

    #[test]
    fn associations_tag_name_follows_provider_family() {
        assert_eq!(original_associations_tag_name(CloudProviderKind::Aws), ORIGINAL_ASSOCIATIONS_TAG_NAME);
        assert_eq!(original_associations_tag_name(CloudProviderKind::Azure), ORIGINAL_SECURITY_GROUP_TAG_NAME);
    }
}
