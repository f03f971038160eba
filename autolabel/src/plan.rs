//! Label planning: rules + changed files + current labels -> delta.
//!
//! Shared by `autolabel run` (current labels come from GitHub) and
//! `autolabel plan` (current labels come from the command line).

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::policy::{classify, compute_delta};
use crate::core::types::{LabelDelta, LabelSet};
use crate::io::config::{LabelerConfig, load_config};
use crate::io::git::ChangedFiles;

/// Outcome of policy evaluation for one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelPlan {
    pub changed_files: Vec<String>,
    pub current: LabelSet,
    pub desired: LabelSet,
    pub ruled: LabelSet,
    pub delta: LabelDelta,
}

impl LabelPlan {
    /// Classify `changed_files` against the rules and diff with `current`.
    pub fn evaluate(
        config: &LabelerConfig,
        changed_files: Vec<String>,
        current: LabelSet,
    ) -> Result<Self> {
        let rules = config.compile()?;
        let desired = classify(&changed_files, &rules);
        let ruled = config.ruled_labels();
        let delta = compute_delta(&desired, &current, &ruled);
        debug!(
            files = changed_files.len(),
            rules = rules.len(),
            "evaluated label policy"
        );
        Ok(Self {
            changed_files,
            current,
            desired,
            ruled,
            delta,
        })
    }

    /// Emit every computed set at `info`.
    pub fn log(&self) {
        info!(current = ?self.current, "current labels");
        info!(files = ?self.changed_files, "changed files");
        info!(desired = ?self.desired, "desired labels");
        info!(ruled = ?self.ruled, "ruled labels");
        info!(to_add = ?self.delta.to_add, "labels to add");
        info!(to_remove = ?self.delta.to_remove, "labels to remove");
    }
}

/// Structured planning outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// No config file: labeling is not enabled.
    ConfigAbsent,
    Planned(LabelPlan),
}

/// Load config, diff `head` against its merge base with `base`, and evaluate.
pub fn plan_labels<D: ChangedFiles>(
    config_path: &Path,
    diff: &D,
    head: &str,
    base: &str,
    current: LabelSet,
) -> Result<PlanOutcome> {
    let Some(config) = load_config(config_path)? else {
        return Ok(PlanOutcome::ConfigAbsent);
    };
    let files = diff.changed_files(head, base)?;
    let plan = LabelPlan::evaluate(&config, files, current)?;
    plan.log();
    Ok(PlanOutcome::Planned(plan))
}
