//! Ambient stack shared by every `gardenchaos` crate: error types, secret
//! redaction, layered configuration loading, structured logging init, and
//! the provider-throttling retry helper. None of this implements
//! chaos-engineering behavior itself; it is the plumbing the teacher repo
//! (`fabriziosalmi-secbeat`) carries in `mitigation-node/src/{error,secret,
//! config}.rs` and `main.rs`'s logging setup.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod retry;
pub mod secret;

pub use error::{CommonError, Result};
pub use secret::Secret;
