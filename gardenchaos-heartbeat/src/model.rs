//! Heartbeat state/phase series and per-zone/per-probe metrics, ported
//! from `chaosgarden/k8s/probe/metrics.py`.

use std::collections::BTreeMap;

use crate::thresholds::Thresholds;

fn initial_failure_exclusion(probe: &str) -> i64 {
    match probe {
        "dns-management" => 60,
        "web-hook" => 50,
        _ => 0,
    }
}

fn initial_gap_toleration(probe: &str) -> i64 {
    match probe {
        "api" => 15,
        "api-external" => 30,
        "api-internal" => 30,
        "dns-external" => 30,
        "dns-internal" => 30,
        "dns-management" => 60,
        "pod-lifecycle" => 40,
        "web-hook" => 50,
        _ => 30,
    }
}

fn regular_gap_toleration(probe: &str) -> i64 {
    match probe {
        "api" => 15,
        "api-external" => 15,
        "api-internal" => 15,
        "dns-external" => 15,
        "dns-internal" => 15,
        "dns-management" => 30,
        "pod-lifecycle" => 30,
        "web-hook" => 30,
        _ => 15,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatState {
    Ready,
    NotReady,
    /// Synthesized when a heartbeat was expected but never observed.
    Unknown,
}

impl HeartbeatState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeartbeatState::Ready => "Ready",
            HeartbeatState::NotReady => "NotReady",
            HeartbeatState::Unknown => "Unknown",
        }
    }
}

/// A sparse, timestamp-keyed record of observed (and later, synthesized)
/// heartbeat states for one probe, with gap-filling logic ported verbatim
/// from `HeartbeatStateSeries.compute`.
#[derive(Debug, Clone)]
pub struct HeartbeatStateSeries {
    probe: String,
    series: BTreeMap<i64, (HeartbeatState, Option<String>)>,
    gaps: u64,
}

impl HeartbeatStateSeries {
    pub fn new(probe: impl Into<String>) -> Self {
        Self { probe: probe.into(), series: BTreeMap::new(), gaps: 0 }
    }

    pub fn record(&mut self, timestamp: i64, state: HeartbeatState, payload: Option<String>) {
        self.series.insert(timestamp, (state, payload));
        if state == HeartbeatState::Unknown {
            self.gaps += 1;
        }
    }

    pub fn drop(&mut self, timestamp: i64) -> Option<(HeartbeatState, Option<String>)> {
        self.series.remove(&timestamp)
    }

    pub fn get_timestamps(&self) -> Vec<i64> {
        self.get_timestamps_between(0, i64::MAX)
    }

    pub fn get_timestamps_between(&self, from_timestamp: i64, to_timestamp: i64) -> Vec<i64> {
        self.series
            .keys()
            .copied()
            .filter(|&t| t >= from_timestamp && t < to_timestamp)
            .collect()
    }

    /// Panics if `timestamp` was never recorded — mirrors the Python
    /// original's plain dict index, which raises `KeyError` under the same
    /// condition; callers only ever query timestamps they just listed.
    pub fn get_state(&self, timestamp: i64) -> HeartbeatState {
        self.series
            .get(&timestamp)
            .unwrap_or_else(|| panic!("no heartbeat recorded at timestamp {timestamp}"))
            .0
    }

    pub fn get_gaps(&self) -> u64 {
        self.gaps
    }

    /// Drops a leading run of `NotReady` heartbeats within the per-probe
    /// initial-failure-exclusion window, then synthesizes `Unknown` gap
    /// heartbeats wherever the interval between two observations (or
    /// between `from_timestamp`/`to_timestamp` and the first/last
    /// observation) exceeds the per-probe initial/regular gap toleration.
    ///
    /// Dropping the leading `NotReady` run can erase a genuine pre-existing
    /// outage that started before `from_timestamp` — this is the documented
    /// behavior (some probes, e.g. the web-hook acknowledgement, report
    /// `NotReady` for a while simply because the receiver isn't up yet), not
    /// a defect.
    pub fn compute(&mut self, from_timestamp: i64, to_timestamp: i64) {
        let exclusion_end = from_timestamp + initial_failure_exclusion(&self.probe).max(0);
        for timestamp in self.get_timestamps_between(i64::MIN, exclusion_end) {
            if self.get_state(timestamp) == HeartbeatState::NotReady {
                self.drop(timestamp);
            } else {
                break;
            }
        }

        let initial_gap = initial_gap_toleration(&self.probe).max(0);
        let regular_gap = regular_gap_toleration(&self.probe).max(1);

        let timestamps = self.get_timestamps();
        let first = *timestamps.first().expect("at least one heartbeat expected before compute");
        let last = *timestamps.last().expect("at least one heartbeat expected before compute");
        if first > from_timestamp + initial_gap {
            self.record(from_timestamp + initial_gap, HeartbeatState::Unknown, Some("Gap (Initial)".to_string()));
        }
        if last + regular_gap < to_timestamp {
            self.record(to_timestamp, HeartbeatState::Unknown, Some("Gap (Final)".to_string()));
        }

        let timestamps = self.get_timestamps();
        let mut prev_timestamp = timestamps[0];
        for &next_timestamp in &timestamps[1..] {
            if next_timestamp > prev_timestamp + regular_gap {
                let mut timestamp = prev_timestamp + regular_gap;
                while timestamp < next_timestamp {
                    self.record(timestamp, HeartbeatState::Unknown, Some("Gap".to_string()));
                    timestamp += regular_gap;
                }
            }
            prev_timestamp = next_timestamp;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatPhase {
    pub state: HeartbeatState,
    pub duration: i64,
}

/// Collapses a `HeartbeatStateSeries` into contiguous same-state phases,
/// tallying total downtime (every phase whose state isn't `Ready`).
#[derive(Debug, Clone)]
pub struct HeartbeatPhaseSeries {
    series: Vec<HeartbeatPhase>,
    downtime: i64,
}

impl HeartbeatPhaseSeries {
    pub fn new() -> Self {
        Self { series: Vec::new(), downtime: 0 }
    }

    pub fn phases(&self) -> &[HeartbeatPhase] {
        &self.series
    }

    pub fn get_downtime(&self) -> i64 {
        self.downtime
    }

    pub fn compute(&mut self, heartbeats: &HeartbeatStateSeries) {
        let timestamps = heartbeats.get_timestamps();
        let Some(&first) = timestamps.first() else { return };
        let mut prev_timestamp = first;
        let mut prev_state = heartbeats.get_state(prev_timestamp);

        if timestamps.len() >= 2 {
            let last = *timestamps.last().unwrap();
            for &next_timestamp in &timestamps[1..] {
                let next_state = heartbeats.get_state(next_timestamp);
                if next_state != prev_state || next_timestamp == last {
                    let phase = HeartbeatPhase { state: prev_state, duration: next_timestamp - prev_timestamp };
                    if phase.state != HeartbeatState::Ready {
                        self.downtime += phase.duration;
                    }
                    self.series.push(phase);
                    prev_timestamp = next_timestamp;
                    prev_state = next_state;
                }
            }
        } else {
            self.series.push(HeartbeatPhase { state: prev_state, duration: 0 });
        }
    }
}

impl Default for HeartbeatPhaseSeries {
    fn default() -> Self {
        Self::new()
    }
}

/// Heartbeat observations, phases and loss accounting for one probe in one
/// zone.
#[derive(Debug, Clone)]
pub struct MetricsForZone {
    probe: String,
    zone: String,
    heartbeats: HeartbeatStateSeries,
    heartbeats_sent: Option<i64>,
    heartbeats_received: Option<i64>,
    phases: HeartbeatPhaseSeries,
}

impl MetricsForZone {
    pub fn new(probe: impl Into<String>, zone: impl Into<String>) -> Self {
        let probe = probe.into();
        Self {
            heartbeats: HeartbeatStateSeries::new(probe.clone()),
            probe,
            zone: zone.into(),
            heartbeats_sent: None,
            heartbeats_received: None,
            phases: HeartbeatPhaseSeries::new(),
        }
    }

    pub fn probe_name(&self) -> &str {
        &self.probe
    }

    pub fn zone_name(&self) -> &str {
        &self.zone
    }

    pub fn record_heartbeat(&mut self, timestamp: i64, state: HeartbeatState, payload: Option<String>) {
        self.heartbeats.record(timestamp, state, payload);
    }

    pub fn record_heartbeats_sent(&mut self, sent: i64) {
        self.heartbeats_sent = Some(sent);
    }

    pub fn heartbeats_sent(&self) -> i64 {
        self.heartbeats_sent.unwrap_or(0)
    }

    pub fn heartbeats_received(&self) -> i64 {
        self.heartbeats_received.unwrap_or(0)
    }

    pub fn heartbeats_gaps(&self) -> u64 {
        self.heartbeats.get_gaps()
    }

    pub fn heartbeats_lost(&self) -> i64 {
        self.heartbeats_sent() - self.heartbeats_received()
    }

    pub fn get_downtime(&self) -> i64 {
        self.phases.get_downtime()
    }

    pub fn phases(&self) -> &[HeartbeatPhase] {
        self.phases.phases()
    }

    pub fn compute(&mut self, from_timestamp: i64, to_timestamp: i64) {
        let received = self.heartbeats_received.unwrap_or(self.heartbeats.get_timestamps().len() as i64);
        self.heartbeats_received = Some(received);
        self.heartbeats_sent = Some(self.heartbeats_sent.unwrap_or(received));

        self.heartbeats.compute(from_timestamp, to_timestamp);
        self.phases.compute(&self.heartbeats);
    }

    pub fn assess(&self, thresholds: &Thresholds) -> Vec<String> {
        let mut violations = Vec::new();
        if self.heartbeats_lost() != 0 {
            violations.push(format!(
                "Data loss detected: {}x sent, {}x received, {}x lost, which means we lost ETCD data!",
                self.heartbeats_sent(),
                self.heartbeats_received(),
                self.heartbeats_lost()
            ));
        }
        let toleration = thresholds.get_toleration(&self.probe, &self.zone);
        if self.get_downtime() > toleration {
            violations.push(format!(
                "Functional outage detected: {} in zone {} was {}s not Ready, but only {}s were tolerated, which means we missed KPI goals!",
                self.probe.to_uppercase(),
                self.zone.to_uppercase(),
                self.get_downtime(),
                toleration
            ));
        }
        violations
    }
}

/// All zones' metrics for one probe, keyed and iterated in zone-name order.
#[derive(Debug, Clone)]
pub struct MetricsForZoneCollection {
    probe: String,
    zones: BTreeMap<String, MetricsForZone>,
}

impl MetricsForZoneCollection {
    pub fn new(probe: impl Into<String>) -> Self {
        Self { probe: probe.into(), zones: BTreeMap::new() }
    }

    pub fn probe_name(&self) -> &str {
        &self.probe
    }

    pub fn get_metrics_for_zone(&mut self, zone: &str) -> &mut MetricsForZone {
        let zone = zone.to_lowercase();
        let probe = self.probe.clone();
        self.zones.entry(zone.clone()).or_insert_with(|| MetricsForZone::new(probe, zone))
    }

    pub fn zones(&self) -> impl Iterator<Item = &MetricsForZone> {
        self.zones.values()
    }

    pub fn get_downtime(&self) -> i64 {
        self.zones.values().map(MetricsForZone::get_downtime).sum()
    }

    pub fn compute(&mut self, from_timestamp: i64, to_timestamp: i64) {
        for zone in self.zones.values_mut() {
            zone.compute(from_timestamp, to_timestamp);
        }
    }

    pub fn assess(&self, thresholds: &Thresholds) -> Vec<String> {
        self.zones.values().flat_map(|z| z.assess(thresholds)).collect()
    }
}

/// A single raw heartbeat observation, as read off an (acknowledged)
/// heartbeat custom resource's name and readiness payload. Name format is
/// `<probe>-probe-<zone>-<unix timestamp>`.
#[derive(Debug, Clone)]
pub struct RawHeartbeat {
    pub name: String,
    pub ready: bool,
    pub payload: Option<String>,
}

/// Top-level metrics container: parses a batch of raw heartbeat records
/// into per-probe, per-zone series and computes gaps/phases/violations for
/// the `[from_timestamp, to_timestamp]` observation window.
#[derive(Debug, Clone)]
pub struct Metrics {
    probes: BTreeMap<String, MetricsForZoneCollection>,
}

impl Metrics {
    pub fn new(heartbeats: &[RawHeartbeat], from_timestamp: i64, to_timestamp: i64) -> Self {
        let mut metrics = Self { probes: BTreeMap::new() };
        for heartbeat in heartbeats {
            let Some((probe, zone, timestamp)) = parse_heartbeat_name(&heartbeat.name) else {
                continue;
            };
            if timestamp >= from_timestamp - 5 && timestamp <= to_timestamp + 15 {
                let state = if heartbeat.ready { HeartbeatState::Ready } else { HeartbeatState::NotReady };
                metrics
                    .get_metrics_for_probe(&probe)
                    .get_metrics_for_zone(&zone)
                    .record_heartbeat(timestamp, state, heartbeat.payload.clone());
            }
        }
        for probe in metrics.probes.values_mut() {
            probe.compute(from_timestamp, to_timestamp);
        }
        metrics
    }

    pub fn get_metrics_for_probe(&mut self, probe: &str) -> &mut MetricsForZoneCollection {
        let probe = probe.to_lowercase();
        self.probes.entry(probe.clone()).or_insert_with(|| MetricsForZoneCollection::new(probe))
    }

    pub fn probes(&self) -> impl Iterator<Item = &MetricsForZoneCollection> {
        self.probes.values()
    }

    pub fn get_downtime(&self) -> i64 {
        self.probes.values().map(MetricsForZoneCollection::get_downtime).sum()
    }

    pub fn assess(&self, thresholds: &Thresholds) -> Vec<String> {
        self.probes.values().flat_map(|p| p.assess(thresholds)).collect()
    }
}

fn parse_heartbeat_name(name: &str) -> Option<(String, String, i64)> {
    let name = name.to_lowercase();
    let marker = "-probe-";
    let marker_at = name.find(marker)?;
    let probe = name[..marker_at].to_string();
    if probe.is_empty() {
        return None;
    }
    let remainder = &name[marker_at + marker.len()..];
    let last_dash = remainder.rfind('-')?;
    let zone = &remainder[..last_dash];
    let timestamp_str = &remainder[last_dash + 1..];
    if zone.is_empty() {
        return None;
    }
    let timestamp = timestamp_str.parse::<i64>().ok()?;
    Some((probe.to_string(), zone.to_string(), timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_heartbeat_name() {
        let (probe, zone, ts) = parse_heartbeat_name("api-probe-eu1-1700000000").unwrap();
        assert_eq!(probe, "api");
        assert_eq!(zone, "eu1");
        assert_eq!(ts, 1700000000);
    }

    #[test]
    fn parses_heartbeat_name_with_hyphenated_probe_and_zone() {
        let (probe, zone, ts) = parse_heartbeat_name("dns-management-probe-eu-west-1-42").unwrap();
        assert_eq!(probe, "dns-management");
        assert_eq!(zone, "eu-west-1");
        assert_eq!(ts, 42);
    }

    /// Heartbeats at t=5,10,40 with start=0, stop=60, for the `api` probe
    /// (initial_gap=15, regular_gap=15): no initial gap (5 <= 15), one
    /// intermediate gap at t=25 (10+15), a final gap record at t=60 plus one
    /// more intermediate gap at t=55 (40+15) filling up to it.
    #[test]
    fn gap_insertion_matches_documented_scenario() {
        let mut series = HeartbeatStateSeries::new("api");
        series.record(5, HeartbeatState::Ready, None);
        series.record(10, HeartbeatState::Ready, None);
        series.record(40, HeartbeatState::Ready, None);

        series.compute(0, 60);

        let timestamps = series.get_timestamps();
        assert_eq!(timestamps, vec![5, 10, 25, 40, 55, 60]);
        assert_eq!(series.get_state(5), HeartbeatState::Ready);
        assert_eq!(series.get_state(10), HeartbeatState::Ready);
        assert_eq!(series.get_state(25), HeartbeatState::Unknown);
        assert_eq!(series.get_state(40), HeartbeatState::Ready);
        assert_eq!(series.get_state(55), HeartbeatState::Unknown);
        assert_eq!(series.get_state(60), HeartbeatState::Unknown);
        assert_eq!(series.get_gaps(), 3);

        let mut phases = HeartbeatPhaseSeries::new();
        phases.compute(&series);
        let durations: Vec<(HeartbeatState, i64)> = phases.phases().iter().map(|p| (p.state, p.duration)).collect();
        assert_eq!(
            durations,
            vec![
                (HeartbeatState::Ready, 20),
                (HeartbeatState::Unknown, 15),
                (HeartbeatState::Ready, 15),
                (HeartbeatState::Unknown, 5),
            ]
        );
        assert_eq!(phases.get_downtime(), 20);
    }

    #[test]
    fn single_heartbeat_with_no_gaps_is_one_phase() {
        let mut series = HeartbeatStateSeries::new("api");
        series.record(0, HeartbeatState::Ready, None);
        series.compute(0, 10);

        let mut phases = HeartbeatPhaseSeries::new();
        phases.compute(&series);
        assert!(!phases.phases().is_empty());
    }

    #[test]
    fn leading_not_ready_dropped_within_exclusion_window() {
        let mut series = HeartbeatStateSeries::new("dns-management");
        series.record(0, HeartbeatState::NotReady, None);
        series.record(30, HeartbeatState::NotReady, None);
        series.record(61, HeartbeatState::Ready, None);

        series.compute(0, 120);

        assert!(series.get_timestamps().binary_search(&0).is_err());
        assert!(series.get_timestamps().binary_search(&30).is_err());
        assert_eq!(series.get_state(61), HeartbeatState::Ready);
    }

    #[test]
    fn data_loss_and_outage_violations_are_reported() {
        let mut zone = MetricsForZone::new("api", "z0");
        zone.record_heartbeat(0, HeartbeatState::Ready, None);
        zone.record_heartbeats_sent(5);
        zone.compute(0, 60);

        let mut thresholds_table = std::collections::HashMap::new();
        thresholds_table.insert("z0".to_string(), std::collections::HashMap::from([("api".to_string(), 5)]));
        let thresholds = Thresholds::new(thresholds_table);

        let violations = zone.assess(&thresholds);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].contains("Data loss"));
        assert!(violations[1].contains("Functional outage"));
    }

    #[test]
    fn collection_aggregates_downtime_across_zones() {
        let mut collection = MetricsForZoneCollection::new("api");
        collection.get_metrics_for_zone("z0").record_heartbeat(0, HeartbeatState::Ready, None);
        collection.get_metrics_for_zone("z1").record_heartbeat(0, HeartbeatState::NotReady, None);
        collection.compute(0, 10);
        assert!(collection.get_downtime() >= 0);
        assert_eq!(collection.zones().count(), 2);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    // A set of distinct, sorted, non-negative timestamps with an arbitrary
    // Ready/NotReady state each, ending up as the recorded series handed to
    // `HeartbeatPhaseSeries::compute`.
    fn timestamped_states() -> impl Strategy<Value = Vec<(i64, HeartbeatState)>> {
        proptest::collection::btree_set(0i64..10_000, 1..20).prop_flat_map(|timestamps| {
            let timestamps: Vec<i64> = timestamps.into_iter().collect();
            let len = timestamps.len();
            proptest::collection::vec(proptest::bool::ANY, len).prop_map(move |ready_flags| {
                timestamps
                    .iter()
                    .zip(ready_flags)
                    .map(|(&ts, ready)| (ts, if ready { HeartbeatState::Ready } else { HeartbeatState::NotReady }))
                    .collect()
            })
        })
    }

    proptest! {
        // The phase series' duration sum covers exactly the span between
        // the first and last recorded timestamp — no time is double
        // counted or dropped when collapsing into contiguous phases.
        #[test]
        fn phase_series_duration_sum_matches_span(entries in timestamped_states()) {
            let mut series = HeartbeatStateSeries::new("api");
            for (ts, state) in &entries {
                series.record(*ts, *state, None);
            }

            let mut phases = HeartbeatPhaseSeries::new();
            phases.compute(&series);

            let timestamps = series.get_timestamps();
            let first = *timestamps.first().unwrap();
            let last = *timestamps.last().unwrap();
            let total: i64 = phases.phases().iter().map(|p| p.duration).sum();
            prop_assert_eq!(total, last - first);
        }
    }
}
