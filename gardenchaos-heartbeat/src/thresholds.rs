//! Per-probe, per-zone toleration policy, ported from
//! `chaosgarden/k8s/probe/thresholds.py::Thresholds`.

use std::collections::HashMap;

pub const DEFAULT_TOLERATION: i64 = 0;
const NEGATION_SYMBOL: char = '!';

/// Maps a zone selector (a literal zone, a `!`-negated zone meaning "every
/// zone except this one", or — before [`Thresholds::substitute_zones`] is
/// called — a stringified integer index) to a probe-name-to-toleration-
/// seconds table. Kept as an insertion-ordered `Vec` rather than a
/// `HashMap`: `get_toleration`'s "first matching entry wins" rule only
/// means something if iteration order is the order the caller supplied,
/// which `std::HashMap` does not guarantee (its iteration order is
/// randomized per-process).
#[derive(Debug, Clone, Default)]
pub struct Thresholds {
    table: Vec<(String, HashMap<String, i64>)>,
}

impl Thresholds {
    pub fn new(thresholds: HashMap<String, HashMap<String, i64>>) -> Self {
        let mut table: Vec<(String, HashMap<String, i64>)> = Vec::new();
        for (zone_selector, tolerations) in thresholds {
            let zone_selector = zone_selector.to_lowercase();
            let entry = match table.iter_mut().find(|(key, _)| *key == zone_selector) {
                Some((_, entry)) => entry,
                None => {
                    table.push((zone_selector, HashMap::new()));
                    &mut table.last_mut().expect("just pushed").1
                }
            };
            for (probe, toleration) in tolerations {
                entry.insert(probe.to_lowercase(), toleration);
            }
        }
        Self { table }
    }

    pub fn to_map(&self) -> HashMap<String, HashMap<String, i64>> {
        self.table.iter().cloned().collect()
    }

    /// Resolves any zone-selector that is a bare integer index against the
    /// sorted list of known zones, preserving `!` negation, exactly as
    /// `Thresholds.substitute_zones` does. Selectors that are not integers,
    /// or whose index is out of range, pass through unchanged.
    pub fn substitute_zones(&mut self, zones: &[String]) {
        let mut sorted_zones = zones.to_vec();
        sorted_zones.sort();

        self.table = std::mem::take(&mut self.table)
            .into_iter()
            .map(|(zone_selector, tolerations)| {
                let (negated, unprefixed) = strip_negation(&zone_selector);
                let resolved = unprefixed
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| sorted_zones.get(index))
                    .map(|zone| zone.to_lowercase())
                    .unwrap_or_else(|| unprefixed.to_string());
                let key = if negated { format!("{NEGATION_SYMBOL}{resolved}") } else { resolved };
                (key, tolerations)
            })
            .collect();
    }

    /// Returns the first structurally-matching toleration: an exact zone
    /// match first, then a negated entry whose zone differs from the
    /// current one ("applies everywhere except"), iterated in insertion
    /// order, matching the Python original's single deterministic linear
    /// scan over its `dict`. Defaults to [`DEFAULT_TOLERATION`].
    pub fn get_toleration(&self, probe: &str, zone: &str) -> i64 {
        let probe = probe.to_lowercase();
        let zone = zone.to_lowercase();
        for (zone_selector, tolerations) in &self.table {
            let Some(&toleration) = tolerations.get(&probe) else {
                continue;
            };
            let (negated, unprefixed) = strip_negation(zone_selector);
            if negated {
                if zone != unprefixed {
                    return toleration;
                }
            } else if zone == unprefixed {
                return toleration;
            }
        }
        DEFAULT_TOLERATION
    }

    pub fn within_toleration(&self, probe: &str, zone: &str, value: i64) -> bool {
        value <= self.get_toleration(probe, zone)
    }
}

fn strip_negation(zone_selector: &str) -> (bool, &str) {
    match zone_selector.strip_prefix(NEGATION_SYMBOL) {
        Some(rest) => (true, rest),
        None => (false, zone_selector),
    }
}
