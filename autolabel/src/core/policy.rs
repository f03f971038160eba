//! Label policy: desired labels from a diff, and the delta against the PR.

use crate::core::glob::CompiledRules;
use crate::core::types::{LabelDelta, LabelSet, RuleTable};

/// Labels whose rules match at least one of `files`.
///
/// A file may trigger several labels and a label may be triggered by several
/// files; the result is a set, so iteration order never matters.
pub fn classify<S: AsRef<str>>(files: &[S], rules: &CompiledRules) -> LabelSet {
    let mut desired = LabelSet::new();
    if rules.is_empty() {
        return desired;
    }
    for file in files {
        desired.extend(rules.labels_for(file.as_ref()).cloned());
    }
    desired
}

/// Keys of the rule table: the only labels this tool may remove.
pub fn ruled_labels(rules: &RuleTable) -> LabelSet {
    rules.keys().cloned().collect()
}

/// `to_add = desired - current`, `to_remove = (current - desired) & ruled`.
///
/// Unruled labels on the PR are never removed.
pub fn compute_delta(desired: &LabelSet, current: &LabelSet, ruled: &LabelSet) -> LabelDelta {
    let to_add = desired.difference(current).cloned().collect();
    let to_remove = current
        .iter()
        .filter(|label| !desired.contains(*label) && ruled.contains(*label))
        .cloned()
        .collect();
    LabelDelta { to_add, to_remove }
}
