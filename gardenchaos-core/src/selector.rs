//! Regex-extended label selectors, ported from
//! `chaosgarden/k8s/__init__.py::SelectorRequirement`. This is a superset of
//! the upstream Kubernetes label-selector grammar: in addition to `==`/`!=`
//! it supports `=~`/`!~`, whose right-hand side is a regex anchored at the
//! start of the value (not a full match).

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("selector requirement \"{0}\" invalid")]
    Invalid(String),
    #[error("invalid regex in selector requirement \"{0}\": {1}")]
    InvalidRegex(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorOp {
    Eq,
    Ne,
    RegexEq,
    RegexNe,
}

impl SelectorOp {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "=" | "==" => Some(SelectorOp::Eq),
            "!=" => Some(SelectorOp::Ne),
            "=~" => Some(SelectorOp::RegexEq),
            "!~" => Some(SelectorOp::RegexNe),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            SelectorOp::Eq => "==",
            SelectorOp::Ne => "!=",
            SelectorOp::RegexEq => "=~",
            SelectorOp::RegexNe => "!~",
        }
    }

    /// Default result when the selector's key is absent from the labels
    /// map: `false` for the two "positive" operators, `true` for the two
    /// negated ones.
    fn absent_default(&self) -> bool {
        matches!(self, SelectorOp::Ne | SelectorOp::RegexNe)
    }
}

/// An immutable `(key, op, value)` triple.
#[derive(Debug, Clone)]
pub struct SelectorRequirement {
    pub key: String,
    pub op: SelectorOp,
    pub value: String,
}

// Matches `key<op>value` where `<op>` is one of `=|==|!=|=~|!~`, same
// grammar as the Python original's `r'([^!=~]+)(=|==|!=|=~|!~)([^!=~]+)'`.
fn requirement_pattern() -> &'static Regex {
    use std::sync::OnceLock;
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([^!=~]+)(==|=~|!~|!=|=)([^!=~]+)$").expect("static pattern is valid"))
}

impl SelectorRequirement {
    pub fn parse(requirement: &str) -> Result<Self, SelectorError> {
        let captures = requirement_pattern()
            .captures(requirement.trim())
            .ok_or_else(|| SelectorError::Invalid(requirement.to_string()))?;
        let key = captures[1].trim().to_string();
        let op = SelectorOp::parse(&captures[2]).ok_or_else(|| SelectorError::Invalid(requirement.to_string()))?;
        let value = captures[3].trim().to_string();
        Ok(Self { key, op, value })
    }

    /// Evaluates this requirement against an entity's label map.
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        let Some(actual) = labels.get(&self.key) else {
            return self.op.absent_default();
        };
        match self.op {
            SelectorOp::Eq => self.value == *actual,
            SelectorOp::Ne => self.value != *actual,
            SelectorOp::RegexEq | SelectorOp::RegexNe => {
                let anchored = format!("^{}", self.value);
                let is_match = Regex::new(&anchored).map(|re| re.is_match(actual)).unwrap_or(false);
                if self.op == SelectorOp::RegexEq {
                    is_match
                } else {
                    !is_match
                }
            }
        }
    }
}

impl fmt::Display for SelectorRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.key, self.op.as_str(), self.value)
    }
}

/// An ordered, conjunctive sequence of requirements: `"k1 op1 v1, k2 op2 v2"`.
/// An empty selector set matches everything.
#[derive(Debug, Clone, Default)]
pub struct SelectorSet(Vec<SelectorRequirement>);

impl SelectorSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let trimmed = selector.trim();
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }
        let mut requirements = Vec::new();
        for part in trimmed.split(',') {
            requirements.push(SelectorRequirement::parse(part)?);
        }
        Ok(Self(requirements))
    }

    pub fn requirements(&self) -> &[SelectorRequirement] {
        &self.0
    }

    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.0.iter().all(|r| r.matches(labels))
    }

    /// Filters `entities`, keeping those whose labels (via `label_fn`)
    /// satisfy every requirement.
    pub fn filter<'a, T>(&self, entities: &'a [T], label_fn: impl Fn(&T) -> HashMap<String, String>) -> Vec<&'a T> {
        entities.iter().filter(|e| self.matches(&label_fn(e))).collect()
    }
}

impl fmt::Display for SelectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn eq_and_ne_defaults_on_absent_key() {
        let eq = SelectorRequirement::parse("a==1").unwrap();
        let ne = SelectorRequirement::parse("a!=1").unwrap();
        let regex_eq = SelectorRequirement::parse("a=~1").unwrap();
        let regex_ne = SelectorRequirement::parse("a!~1").unwrap();
        let empty = HashMap::new();
        assert!(!eq.matches(&empty));
        assert!(ne.matches(&empty));
        assert!(!regex_eq.matches(&empty));
        assert!(regex_ne.matches(&empty));
    }

    #[test]
    fn single_equals_normalizes_to_eq() {
        let req = SelectorRequirement::parse("a=1").unwrap();
        assert_eq!(req.op, SelectorOp::Eq);
    }

    #[test]
    fn regex_is_anchored_at_start() {
        let req = SelectorRequirement::parse("name=~kube-api").unwrap();
        assert!(req.matches(&labels(&[("name", "kube-apiserver-1")])));
        assert!(!req.matches(&labels(&[("name", "my-kube-apiserver-1")])));
    }

    #[test]
    fn malformed_requirement_is_rejected() {
        assert!(SelectorRequirement::parse("nonsense").is_err());
    }

    #[test]
    fn end_to_end_conjunction_scenario() {
        // spec.md §8 scenario 1
        let set = SelectorSet::parse("a==1, b!=2, c=~foo").unwrap();
        let entity = labels(&[("a", "1"), ("b", "2")]);
        assert!(!set.matches(&entity));
    }

    #[test]
    fn empty_selector_matches_everything() {
        let set = SelectorSet::parse("").unwrap();
        assert!(set.matches(&HashMap::new()));
        assert!(set.matches(&labels(&[("a", "1")])));
    }

    #[test]
    fn parse_format_round_trip() {
        let original = "a == 1, b != 2, c =~ foo";
        let set = SelectorSet::parse(original).unwrap();
        let reparsed = SelectorSet::parse(&set.to_string()).unwrap();
        assert_eq!(set.to_string(), reparsed.to_string());
    }

    #[test]
    fn filter_keeps_only_matching_entities() {
        let set = SelectorSet::parse("zone==a").unwrap();
        let entities = vec![("one", "a"), ("two", "b"), ("three", "a")];
        let filtered = set.filter(&entities, |(_, zone)| labels(&[("zone", zone)]));
        assert_eq!(filtered.len(), 2);
    }
}
