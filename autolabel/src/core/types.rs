//! Shared deterministic types for the labeling policy.
//!
//! These types carry no I/O. Sets and maps are ordered so that logs, reports
//! and mutation payloads are stable across runs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Name of a repository label (unique within a repository).
pub type LabelName = String;

/// Ordered set of label names.
pub type LabelSet = BTreeSet<LabelName>;

/// Glob pattern(s) attached to a single rule.
///
/// Deserializes from either a bare string or an array of strings, matching
/// the config file shape `"docs": "docs/**"` / `"ci": [".github/**", "*.yml"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternSpec {
    Single(String),
    Multiple(Vec<String>),
}

impl PatternSpec {
    /// View the patterns as a slice. A single pattern and a one-element
    /// list yield the same slice.
    pub fn patterns(&self) -> &[String] {
        match self {
            PatternSpec::Single(pattern) => std::slice::from_ref(pattern),
            PatternSpec::Multiple(patterns) => patterns,
        }
    }
}

impl From<&str> for PatternSpec {
    fn from(pattern: &str) -> Self {
        PatternSpec::Single(pattern.to_string())
    }
}

impl From<Vec<&str>> for PatternSpec {
    fn from(patterns: Vec<&str>) -> Self {
        PatternSpec::Multiple(patterns.into_iter().map(str::to_string).collect())
    }
}

/// Label name -> pattern(s). Keys are the ruled label set.
pub type RuleTable = BTreeMap<LabelName, PatternSpec>;

/// Labels to attach and detach for one pull request.
///
/// `to_add` and `to_remove` are always disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelDelta {
    pub to_add: LabelSet,
    pub to_remove: LabelSet,
}

impl LabelDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}
