//! CLI tests for the `autolabel` binary.
//!
//! Spawns the binary and verifies exit codes and stdout for the neutral,
//! valid-config and plan paths. None of these reach the network.

use std::process::{Command, Output};

use autolabel::exit_codes;
use autolabel::test_support::{TestRepo, write_config};

const RULES: &str = r#"{"rules": {"docs": "docs/**", "ci": [".github/**", "*.yml"]}}"#;

fn autolabel(dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_autolabel"))
        .current_dir(dir)
        .args(args)
        .env_remove("GITHUB_WORKSPACE")
        .env_remove("GITHUB_REPOSITORY")
        .env_remove("GITHUB_EVENT_NAME")
        .env_remove("GITHUB_EVENT_PATH")
        .env_remove("GITHUB_TOKEN")
        .env("GITHUB_GRAPHQL_URL", "http://127.0.0.1:9/graphql")
        .output()
        .expect("spawn autolabel")
}

#[test]
fn run_without_config_exits_neutral() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = autolabel(
        temp.path(),
        &["run", "--repository", "octo/widgets", "--number", "3"],
    );

    assert_eq!(out.status.code(), Some(exit_codes::NEUTRAL));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("config file does not exist"), "{stdout}");
}

#[test]
fn run_on_unhandled_event_exits_neutral() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path(), RULES);
    let out = autolabel(temp.path(), &["run", "--event-name", "push"]);

    assert_eq!(out.status.code(), Some(exit_codes::NEUTRAL));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("event push is not handled"), "{stdout}");
}

#[test]
fn run_with_unreachable_api_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(temp.path(), RULES);
    let out = autolabel(
        temp.path(),
        &["run", "--repository", "octo/widgets", "--number", "3"],
    );

    assert_eq!(out.status.code(), Some(exit_codes::FAILURE));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("getPullRequestAndLabels"), "{stderr}");
}

#[test]
fn validate_reports_rule_count_and_errors() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = autolabel(temp.path(), &["validate"]);
    assert_eq!(out.status.code(), Some(exit_codes::NEUTRAL));

    write_config(temp.path(), RULES);
    let out = autolabel(temp.path(), &["validate"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&out.stdout).contains("valid: 2 rule(s)"));

    write_config(temp.path(), r#"{"rules": {"docs": "docs/[a"}}"#);
    let out = autolabel(temp.path(), &["validate"]);
    assert_eq!(out.status.code(), Some(exit_codes::FAILURE));
    assert!(String::from_utf8_lossy(&out.stderr).contains("label 'docs'"));
}

#[test]
fn plan_reports_delta_against_merge_base() {
    let repo = TestRepo::new().expect("repo");
    let base = repo.head().expect("base");
    repo.checkout_new_branch("feature").expect("branch");
    repo.commit_file("docs/readme.md", "docs\n").expect("commit");
    write_config(repo.path(), RULES);

    let out = autolabel(
        repo.path(),
        &["plan", "--base", &base, "--current", "ci,manual"],
    );

    assert_eq!(out.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("plan: files=1"), "{stdout}");
    assert!(stdout.contains("plan: desired=docs"), "{stdout}");
    assert!(stdout.contains("plan: add=docs"), "{stdout}");
    assert!(stdout.contains("plan: remove=ci\n"), "{stdout}");
}
