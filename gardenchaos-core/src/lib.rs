//! Terminator, cooperative Task Registry, and regex-extended Selector
//! Engine — the process-wide primitives every Failure Orchestrator and
//! Probe Pipeline worker is built on. See spec.md §4.1–§4.3.

pub mod kubeconfig;
pub mod registry;
pub mod selector;
pub mod terminator;

pub use registry::{CancelToken, TaskRegistry, WorkerHandle, WorkerId};
pub use selector::{SelectorError, SelectorOp, SelectorRequirement, SelectorSet};
pub use terminator::Terminator;
