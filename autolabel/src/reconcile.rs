//! Orchestration for `autolabel run`.
//!
//! A run is linear: event gate, config check, snapshot fetch, diff, policy
//! evaluation, then add and remove mutations. Nothing is retried and the first
//! failure ends the run; a failed add means the remove is never attempted.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::core::types::LabelSet;
use crate::io::config::load_config;
use crate::io::context::ActionContext;
use crate::io::git::ChangedFiles;
use crate::io::github::{LabelApi, PullRequestSnapshot, RemoteError};
use crate::plan::LabelPlan;

/// Why a run ended without doing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeutralReason {
    /// The event is not `pull_request.opened` / `pull_request.synchronize`.
    UnsupportedEvent(String),
    /// No rules file in the workspace.
    ConfigAbsent(PathBuf),
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub plan: LabelPlan,
    /// Labels sent in the add mutation.
    pub added: LabelSet,
    /// Labels sent in the remove mutation.
    pub removed: LabelSet,
    /// Labels the policy wanted to touch but the repository does not define.
    pub unknown: LabelSet,
    pub dry_run: bool,
}

/// Structured run outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Neutral(NeutralReason),
    Reconciled(RunReport),
}

/// Fatal run errors, one variant per step that can fail.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid config: {0:#}")]
    Config(anyhow::Error),
    #[error("invalid run context: {0:#}")]
    Context(anyhow::Error),
    #[error("getPullRequestAndLabels has failed: {0}")]
    Snapshot(RemoteError),
    #[error("computing changed files has failed: {0:#}")]
    Diff(anyhow::Error),
    #[error("addLabelsToLabelable has failed: {0}")]
    AddLabels(RemoteError),
    #[error("removeLabelsFromLabelable has failed: {0}")]
    RemoveLabels(RemoteError),
}

/// Reconcile the pull request's labels with the rules.
#[instrument(skip_all, fields(event = %ctx.event_label(), dry_run = ctx.dry_run))]
pub fn run_reconcile<A: LabelApi, D: ChangedFiles>(
    ctx: &ActionContext,
    api: &A,
    diff: &D,
) -> Result<RunOutcome, RunError> {
    if !ctx.is_supported_event() {
        info!("event not handled by autolabel");
        return Ok(RunOutcome::Neutral(NeutralReason::UnsupportedEvent(
            ctx.event_label(),
        )));
    }

    let Some(config) = load_config(&ctx.config_path).map_err(RunError::Config)? else {
        info!(path = %ctx.config_path.display(), "config file does not exist");
        return Ok(RunOutcome::Neutral(NeutralReason::ConfigAbsent(
            ctx.config_path.clone(),
        )));
    };

    let pr = ctx.pull_request.as_ref().ok_or_else(|| {
        RunError::Context(anyhow::anyhow!(
            "pull request unknown: need a repository and a PR number or event payload"
        ))
    })?;

    let snapshot = api.fetch_snapshot(pr).map_err(|err| {
        warn!(request = err.request, kind = ?err.kind, message = %err.message, "request failed");
        RunError::Snapshot(err)
    })?;
    info!(
        labelable_id = %snapshot.id,
        head = %snapshot.head_ref_oid,
        base = %snapshot.base_ref_oid,
        labels = snapshot.labels.len(),
        catalog = snapshot.catalog.len(),
        "fetched pull request"
    );

    let files = diff
        .changed_files(&snapshot.head_ref_oid, &snapshot.base_ref_oid)
        .map_err(RunError::Diff)?;

    let plan = LabelPlan::evaluate(&config, files, snapshot.current_label_names())
        .map_err(RunError::Config)?;
    plan.log();

    let mut report = RunReport {
        added: LabelSet::new(),
        removed: LabelSet::new(),
        unknown: LabelSet::new(),
        dry_run: ctx.dry_run,
        plan,
    };
    if ctx.dry_run {
        info!("dry run, skipping label mutations");
        return Ok(RunOutcome::Reconciled(report));
    }

    let to_add = report.plan.delta.to_add.clone();
    if !to_add.is_empty() {
        let (ids, sent) = resolve(&snapshot, &to_add, &mut report.unknown);
        if !ids.is_empty() {
            api.add_labels(&snapshot.id, &ids).map_err(|err| {
                warn!(request = err.request, kind = ?err.kind, message = %err.message, "request failed");
                RunError::AddLabels(err)
            })?;
            info!(labels = ?sent, "added labels");
            report.added = sent;
        }
    }

    let to_remove = report.plan.delta.to_remove.clone();
    if !to_remove.is_empty() {
        let (ids, sent) = resolve(&snapshot, &to_remove, &mut report.unknown);
        if !ids.is_empty() {
            api.remove_labels(&snapshot.id, &ids).map_err(|err| {
                warn!(request = err.request, kind = ?err.kind, message = %err.message, "request failed");
                RunError::RemoveLabels(err)
            })?;
            info!(labels = ?sent, "removed labels");
            report.removed = sent;
        }
    }

    Ok(RunOutcome::Reconciled(report))
}

/// Map names to catalog ids; names the repository lacks go to `unknown`.
fn resolve(
    snapshot: &PullRequestSnapshot,
    names: &LabelSet,
    unknown: &mut LabelSet,
) -> (Vec<String>, LabelSet) {
    let (ids, missing) = snapshot.resolve_label_ids(names);
    if !missing.is_empty() {
        warn!(labels = ?missing, "labels not defined in repository, skipping");
    }
    let sent = names
        .iter()
        .filter(|name| !missing.contains(*name))
        .cloned()
        .collect();
    unknown.extend(missing);
    (ids, sent)
}
