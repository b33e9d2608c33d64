//! Cloud-Agnostic Network Partition Protocol: the `CloudAdapter` trait every
//! provider implementation satisfies, deterministic blocking-artifact
//! tagging, original-association serialization, a REST-based concrete
//! client, and an in-memory mock for tests. See spec.md §4.4.

pub mod adapter;
pub mod associations;
pub mod mock;
pub mod rest;
pub mod tagging;
pub mod types;

pub use adapter::{default_compute_eligible, divert_resources, reassert_resources, restore_resources, CloudAdapter};
pub use mock::MockCloudAdapter;
pub use rest::{RestCloudAdapter, RestCloudAdapterConfig};
pub use types::{BlockingArtifact, CloudProviderKind, ComputeFailureMode, Filters, Instance, Network, NetworkFailureMode};
