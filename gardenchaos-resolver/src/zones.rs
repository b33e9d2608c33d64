//! Zone resolution and selector supplementation, ported from
//! `chaosgarden/garden/actions.py`'s `resolve_zones`/`resolve_zone`/
//! `supplement_selector`.

use std::collections::BTreeSet;

use gardenchaos_common::{CommonError, Result};

use crate::types::ZoneSelector;

/// Unions every worker pool's `zones` list into one sorted set.
pub fn resolve_zones(worker_zones: &[Vec<String>]) -> BTreeSet<String> {
    let mut zones = BTreeSet::new();
    for pool in worker_zones {
        zones.extend(pool.iter().cloned());
    }
    zones
}

/// Resolves a zone selector against the known zone set: an index picks
/// the nth zone in sorted order, a name is validated as a member.
pub fn resolve_zone(zone: &ZoneSelector, zones: &BTreeSet<String>) -> Result<String> {
    let sorted: Vec<&String> = zones.iter().collect();
    match zone {
        ZoneSelector::Index(index) => sorted.get(*index).map(|z| z.to_string()).ok_or_else(|| {
            CommonError::Validation(format!(
                "zone index {index} out of bounds (known zones are {})",
                join(&sorted)
            ))
        }),
        ZoneSelector::Name(name) => {
            if zones.contains(name) {
                Ok(name.clone())
            } else {
                Err(CommonError::Validation(format!(
                    "zone designator {name} not recognised (known zones are {})",
                    join(&sorted)
                )))
            }
        }
    }
}

fn join(zones: &[&String]) -> String {
    zones.iter().map(|z| z.as_str()).collect::<Vec<_>>().join(", ")
}

/// Appends `supplement` to an existing comma-separated selector, or
/// returns it standalone if there was no existing selector.
pub fn supplement_selector(supplement: &str, existing: Option<&str>) -> String {
    match existing {
        Some(existing) if !existing.is_empty() => format!("{existing},{supplement}"),
        _ => supplement.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_zones_unions_worker_pools() {
        let zones = resolve_zones(&[vec!["eu1".to_string(), "eu2".to_string()], vec!["eu2".to_string(), "eu3".to_string()]]);
        assert_eq!(zones, BTreeSet::from(["eu1".to_string(), "eu2".to_string(), "eu3".to_string()]));
    }

    #[test]
    fn resolve_zone_by_index_uses_sorted_order() {
        let zones = BTreeSet::from(["eu2".to_string(), "eu1".to_string(), "eu3".to_string()]);
        assert_eq!(resolve_zone(&ZoneSelector::Index(0), &zones).unwrap(), "eu1");
        assert_eq!(resolve_zone(&ZoneSelector::Index(2), &zones).unwrap(), "eu3");
    }

    #[test]
    fn resolve_zone_by_index_out_of_bounds_is_an_error() {
        let zones = BTreeSet::from(["eu1".to_string()]);
        assert!(resolve_zone(&ZoneSelector::Index(5), &zones).is_err());
    }

    #[test]
    fn resolve_zone_by_name_validates_membership() {
        let zones = BTreeSet::from(["eu1".to_string()]);
        assert_eq!(resolve_zone(&ZoneSelector::Name("eu1".to_string()), &zones).unwrap(), "eu1");
        assert!(resolve_zone(&ZoneSelector::Name("eu9".to_string()), &zones).is_err());
    }

    #[test]
    fn supplement_selector_appends_when_present() {
        assert_eq!(supplement_selector("b=2", Some("a=1")), "a=1,b=2");
        assert_eq!(supplement_selector("b=2", None), "b=2");
    }
}
