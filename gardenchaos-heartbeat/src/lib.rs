//! Heartbeat state/phase series, per-zone/per-probe metrics, and the
//! threshold policy used to turn a downtime duration into an outage
//! violation. See spec.md §4.6/§4.7.

pub mod model;
pub mod thresholds;

pub use model::{
    HeartbeatPhase, HeartbeatPhaseSeries, HeartbeatState, HeartbeatStateSeries, Metrics,
    MetricsForZone, MetricsForZoneCollection, RawHeartbeat,
};
pub use thresholds::Thresholds;
