//! End-to-end reconciliation tests against fake collaborators.
//!
//! These drive `run_reconcile` with a recording GitHub fake and a scripted
//! diff to verify the label scenarios, mutation ordering, and fail-fast
//! behavior on remote errors.

use std::path::{Path, PathBuf};

use autolabel::io::context::{ActionContext, ContextInputs};
use autolabel::io::git::Git;
use autolabel::io::github::RemoteErrorKind;
use autolabel::reconcile::{RunError, RunOutcome, RunReport, run_reconcile};
use autolabel::test_support::{
    ApiCall, BASE_OID, FakeLabelApi, HEAD_OID, ScriptedDiff, TestRepo, label_id, label_set,
    write_config,
};

const RULES: &str = r#"{"rules": {"docs": "docs/**", "ci": [".github/**", "*.yml"]}}"#;

fn context(root: &Path) -> ActionContext {
    ActionContext::from_inputs(ContextInputs {
        workspace: root.to_path_buf(),
        config: PathBuf::from(".github/auto-label.json"),
        repository: Some("octo/widgets".to_string()),
        event_name: "pull_request".to_string(),
        event_path: None,
        number: Some(17),
        dry_run: false,
    })
    .expect("context")
}

fn reconciled(outcome: RunOutcome) -> RunReport {
    match outcome {
        RunOutcome::Reconciled(report) => report,
        other => panic!("expected reconciled outcome, got {other:?}"),
    }
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| label_id(name)).collect()
}

/// Scenario A: fresh PR touching docs and workflows gets both labels.
#[test]
fn scenario_a_adds_docs_and_ci() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path(), RULES);
    let api = FakeLabelApi::new(&[], &["docs", "ci", "manual"]);
    let diff = ScriptedDiff::files(&["docs/readme.md", ".github/workflows/x.yml"]);

    let report = reconciled(run_reconcile(&context(temp.path()), &api, &diff).expect("run"));

    assert_eq!(report.plan.desired, label_set(&["docs", "ci"]));
    assert_eq!(report.added, label_set(&["docs", "ci"]));
    assert!(report.removed.is_empty());
    assert_eq!(
        api.calls(),
        vec![
            ApiCall::FetchSnapshot(17),
            ApiCall::AddLabels(ids(&["ci", "docs"])),
        ]
    );
    assert_eq!(
        diff.calls(),
        vec![(HEAD_OID.to_string(), BASE_OID.to_string())]
    );
}

/// Scenario B: ruled label no longer justified is removed, manual label stays.
#[test]
fn scenario_b_removes_docs_keeps_manual() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path(), RULES);
    let api = FakeLabelApi::new(&["docs", "manual"], &["docs", "ci", "manual"]);
    let diff = ScriptedDiff::files(&["src/index.ts"]);

    let report = reconciled(run_reconcile(&context(temp.path()), &api, &diff).expect("run"));

    assert!(report.plan.desired.is_empty());
    assert!(report.added.is_empty());
    assert_eq!(report.removed, label_set(&["docs"]));
    assert_eq!(
        api.calls(),
        vec![
            ApiCall::FetchSnapshot(17),
            ApiCall::RemoveLabels(ids(&["docs"])),
        ]
    );
}

#[test]
fn add_then_remove_when_both_pending() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path(), RULES);
    let api = FakeLabelApi::new(&["docs"], &["docs", "ci"]);
    let diff = ScriptedDiff::files(&["release.yml"]);

    let report = reconciled(run_reconcile(&context(temp.path()), &api, &diff).expect("run"));

    assert_eq!(report.added, label_set(&["ci"]));
    assert_eq!(report.removed, label_set(&["docs"]));
    assert_eq!(
        api.calls(),
        vec![
            ApiCall::FetchSnapshot(17),
            ApiCall::AddLabels(ids(&["ci"])),
            ApiCall::RemoveLabels(ids(&["docs"])),
        ]
    );
}

#[test]
fn failed_add_stops_before_remove() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path(), RULES);
    let api = FakeLabelApi::new(&["docs"], &["docs", "ci"]).failing_add();
    let diff = ScriptedDiff::files(&["release.yml"]);

    let err = run_reconcile(&context(temp.path()), &api, &diff).expect_err("add fails");

    let RunError::AddLabels(remote) = err else {
        panic!("expected add error");
    };
    assert_eq!(remote.request, "addLabelsToLabelable");
    assert_eq!(remote.kind, RemoteErrorKind::GraphQl);
    assert_eq!(
        api.calls(),
        vec![ApiCall::FetchSnapshot(17), ApiCall::AddLabels(ids(&["ci"]))]
    );
}

#[test]
fn failed_remove_is_reported() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path(), RULES);
    let api = FakeLabelApi::new(&["docs"], &["docs"]).failing_remove();
    let diff = ScriptedDiff::files(&[]);

    let err = run_reconcile(&context(temp.path()), &api, &diff).expect_err("remove fails");
    assert!(matches!(err, RunError::RemoveLabels(_)));
    assert!(err.to_string().starts_with("removeLabelsFromLabelable has failed"));
}

#[test]
fn snapshot_failure_skips_diff_and_mutations() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path(), RULES);
    let api = FakeLabelApi::new(&[], &["docs"]).failing_snapshot();
    let diff = ScriptedDiff::files(&["docs/a.md"]);

    let err = run_reconcile(&context(temp.path()), &api, &diff).expect_err("snapshot fails");

    assert!(matches!(err, RunError::Snapshot(_)));
    assert_eq!(api.calls(), vec![ApiCall::FetchSnapshot(17)]);
    assert!(diff.calls().is_empty());
}

#[test]
fn diff_failure_is_fatal_and_skips_mutations() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path(), RULES);
    let api = FakeLabelApi::new(&["docs"], &["docs"]);
    let diff = ScriptedDiff::failing("git merge-base head-oid base-oid failed: bad object");

    let err = run_reconcile(&context(temp.path()), &api, &diff).expect_err("diff fails");

    let RunError::Diff(inner) = err else {
        panic!("expected diff error");
    };
    assert!(inner.to_string().contains("bad object"));
    assert_eq!(api.calls(), vec![ApiCall::FetchSnapshot(17)]);
}

#[test]
fn labels_missing_from_catalog_are_skipped() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path(), RULES);
    let api = FakeLabelApi::new(&[], &["docs"]);
    let diff = ScriptedDiff::files(&["docs/a.md", "ci.yml"]);

    let report = reconciled(run_reconcile(&context(temp.path()), &api, &diff).expect("run"));

    assert_eq!(report.plan.delta.to_add, label_set(&["ci", "docs"]));
    assert_eq!(report.added, label_set(&["docs"]));
    assert_eq!(report.unknown, label_set(&["ci"]));
    assert_eq!(
        api.calls(),
        vec![ApiCall::FetchSnapshot(17), ApiCall::AddLabels(ids(&["docs"]))]
    );
}

#[test]
fn empty_rules_touch_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path(), r#"{"rules": {}}"#);
    let api = FakeLabelApi::new(&["docs", "manual"], &["docs", "manual"]);
    let diff = ScriptedDiff::files(&["docs/a.md"]);

    let report = reconciled(run_reconcile(&context(temp.path()), &api, &diff).expect("run"));

    assert!(report.plan.delta.is_empty());
    assert_eq!(api.calls(), vec![ApiCall::FetchSnapshot(17)]);
}

/// A second run over the labels the first run produced changes nothing.
#[test]
fn second_run_after_success_is_a_no_op() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path(), RULES);
    let catalog = ["docs", "ci", "manual"];
    let diff = ScriptedDiff::files(&["docs/readme.md"]);

    let first_api = FakeLabelApi::new(&["ci", "manual"], &catalog);
    let first = reconciled(run_reconcile(&context(temp.path()), &first_api, &diff).expect("run 1"));
    assert_eq!(first.added, label_set(&["docs"]));
    assert_eq!(first.removed, label_set(&["ci"]));

    let second_api = FakeLabelApi::new(&["docs", "manual"], &catalog);
    let second =
        reconciled(run_reconcile(&context(temp.path()), &second_api, &diff).expect("run 2"));
    assert!(second.plan.delta.is_empty());
    assert_eq!(second_api.calls(), vec![ApiCall::FetchSnapshot(17)]);
}

/// Real git diff collaborator wired through the orchestrator.
#[test]
fn reconcile_with_git_diff_collaborator() {
    let repo = TestRepo::new().expect("repo");
    let base = repo.head().expect("base");
    repo.checkout_new_branch("feature").expect("branch");
    repo.commit_file(".github/workflows/ci.yml", "on: push\n")
        .expect("commit");
    let head = repo.head().expect("head");
    write_config(repo.path(), RULES);

    let api = FakeLabelApi::new(&["docs"], &["docs", "ci"]).with_refs(&head, &base);
    let git = Git::new(repo.path());
    let report = reconciled(run_reconcile(&context(repo.path()), &api, &git).expect("run"));

    assert_eq!(report.plan.changed_files, vec![".github/workflows/ci.yml"]);
    assert_eq!(report.added, label_set(&["ci"]));
    assert_eq!(report.removed, label_set(&["docs"]));
}
