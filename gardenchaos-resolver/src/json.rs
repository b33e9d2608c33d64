//! Small JSON path helpers for walking the Gardener custom resources this
//! crate reads but doesn't own a schema for — the Rust analogue of the
//! original's `Box(...)` dynamic attribute access.

use gardenchaos_common::{CommonError, Result};
use serde_json::Value;

pub fn at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = current.get(segment)?;
    }
    Some(current)
}

pub fn require<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Value> {
    at(value, path).ok_or_else(|| CommonError::Validation(format!("missing field {}", path.join("."))))
}

pub fn str_at(value: &Value, path: &[&str]) -> Result<String> {
    require(value, path)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CommonError::Validation(format!("field {} is not a string", path.join("."))))
}

pub fn opt_str_at(value: &Value, path: &[&str]) -> Option<String> {
    at(value, path).and_then(Value::as_str).map(str::to_string)
}
