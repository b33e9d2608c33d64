//! Original-association serialization for the Blocking Artifact tag value.
//!
//! AWS/OpenStack/GCP store `subnet:acl` pairs as a semicolon-joined string
//! (`chaosgarden/aws/actions.py::block_vpc`/`unblock_vpc`); AlibabaCloud/
//! Azure/vSphere store the same information as a JSON object
//! (`chaosgarden/alicloud/actions.py::block_vpc`/`unblock_vpc`).

use std::collections::BTreeMap;

use gardenchaos_common::{CommonError, Result};

use crate::types::CloudProviderKind;

pub fn encode_semicolon(associations: &BTreeMap<String, String>) -> String {
    associations.iter().map(|(subnet, acl)| format!("{subnet}:{acl}")).collect::<Vec<_>>().join(";")
}

pub fn decode_semicolon(encoded: &str) -> Result<BTreeMap<String, String>> {
    if encoded.is_empty() {
        return Ok(BTreeMap::new());
    }
    encoded
        .split(';')
        .map(|pair| {
            let (subnet, acl) = pair
                .split_once(':')
                .ok_or_else(|| CommonError::Validation(format!("malformed association pair: {pair:?}")))?;
            Ok((subnet.to_string(), acl.to_string()))
        })
        .collect()
}

pub fn encode_json(associations: &BTreeMap<String, String>) -> Result<String> {
    serde_json::to_string(associations).map_err(CommonError::from)
}

pub fn decode_json(encoded: &str) -> Result<BTreeMap<String, String>> {
    if encoded.is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(encoded).map_err(CommonError::from)
}

/// Picks the right codec for `kind` so callers never have to branch on it
/// themselves ([`CloudProviderKind::uses_semicolon_associations`]).
pub fn encode_for_kind(kind: CloudProviderKind, associations: &BTreeMap<String, String>) -> Result<String> {
    if kind.uses_semicolon_associations() {
        Ok(encode_semicolon(associations))
    } else {
        encode_json(associations)
    }
}

pub fn decode_for_kind(kind: CloudProviderKind, encoded: &str) -> Result<BTreeMap<String, String>> {
    if kind.uses_semicolon_associations() {
        decode_semicolon(encoded)
    } else {
        decode_json(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("subnet-a".to_string(), "acl-1".to_string()),
            ("subnet-b".to_string(), "acl-2".to_string()),
        ])
    }

    #[test]
    fn semicolon_round_trips() {
        let encoded = encode_semicolon(&sample());
        assert_eq!(decode_semicolon(&encoded).unwrap(), sample());
    }

    #[test]
    fn semicolon_empty_round_trips() {
        let empty = BTreeMap::new();
        assert_eq!(decode_semicolon(&encode_semicolon(&empty)).unwrap(), empty);
    }

    #[test]
    fn semicolon_rejects_malformed_pair() {
        assert!(decode_semicolon("subnet-a-missing-colon").is_err());
    }

    #[test]
    fn json_round_trips() {
        let encoded = encode_json(&sample()).unwrap();
        assert_eq!(decode_json(&encoded).unwrap(), sample());
    }

    #[test]
    fn json_empty_round_trips() {
        let empty = BTreeMap::new();
        assert_eq!(decode_json(&encode_json(&empty).unwrap()).unwrap(), empty);
    }

    #[test]
    fn for_kind_picks_the_right_codec_per_provider_family() {
        let encoded = encode_for_kind(CloudProviderKind::Aws, &sample()).unwrap();
        assert_eq!(decode_for_kind(CloudProviderKind::Aws, &encoded).unwrap(), sample());

        let encoded = encode_for_kind(CloudProviderKind::Azure, &sample()).unwrap();
        assert_eq!(decode_for_kind(CloudProviderKind::Azure, &encoded).unwrap(), sample());
    }
}
