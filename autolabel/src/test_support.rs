//! Test-only fakes for the remote and diff collaborators, plus a scratch git repo.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::types::LabelSet;
use crate::io::config::CONFIG_PATH;
use crate::io::git::ChangedFiles;
use crate::io::github::{
    Label, LabelApi, PullRequestRef, PullRequestSnapshot, RemoteError, RemoteErrorKind,
};

pub const PR_ID: &str = "PR_test";
pub const HEAD_OID: &str = "head-oid";
pub const BASE_OID: &str = "base-oid";

/// Build a label set from string slices.
pub fn label_set(labels: &[&str]) -> LabelSet {
    labels.iter().map(|label| label.to_string()).collect()
}

/// Deterministic catalog id for a label name.
pub fn label_id(name: &str) -> String {
    format!("L_{name}")
}

/// Write `.github/auto-label.json` under `root` and return its path.
pub fn write_config(root: &Path, contents: &str) -> PathBuf {
    let path = root.join(CONFIG_PATH);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create config dir");
    }
    fs::write(&path, contents).expect("write config");
    path
}

/// Remote call recorded by [`FakeLabelApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    FetchSnapshot(u64),
    AddLabels(Vec<String>),
    RemoveLabels(Vec<String>),
}

/// In-memory [`LabelApi`] that records calls and can be told to fail.
#[derive(Debug)]
pub struct FakeLabelApi {
    snapshot: PullRequestSnapshot,
    calls: RefCell<Vec<ApiCall>>,
    fail_snapshot: bool,
    fail_add: bool,
    fail_remove: bool,
}

impl FakeLabelApi {
    /// PR carrying `current` labels in a repository defining `catalog`.
    pub fn new(current: &[&str], catalog: &[&str]) -> Self {
        let to_label = |name: &&str| Label {
            id: label_id(name),
            name: name.to_string(),
        };
        Self {
            snapshot: PullRequestSnapshot {
                id: PR_ID.to_string(),
                head_ref_oid: HEAD_OID.to_string(),
                base_ref_oid: BASE_OID.to_string(),
                labels: current.iter().map(to_label).collect(),
                catalog: catalog.iter().map(to_label).collect(),
            },
            calls: RefCell::new(Vec::new()),
            fail_snapshot: false,
            fail_add: false,
            fail_remove: false,
        }
    }

    /// Report these head/base commits instead of placeholder oids.
    pub fn with_refs(mut self, head: &str, base: &str) -> Self {
        self.snapshot.head_ref_oid = head.to_string();
        self.snapshot.base_ref_oid = base.to_string();
        self
    }

    pub fn failing_snapshot(mut self) -> Self {
        self.fail_snapshot = true;
        self
    }

    pub fn failing_add(mut self) -> Self {
        self.fail_add = true;
        self
    }

    pub fn failing_remove(mut self) -> Self {
        self.fail_remove = true;
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.borrow().clone()
    }
}

impl LabelApi for FakeLabelApi {
    fn fetch_snapshot(&self, pr: &PullRequestRef) -> Result<PullRequestSnapshot, RemoteError> {
        self.calls
            .borrow_mut()
            .push(ApiCall::FetchSnapshot(pr.number));
        if self.fail_snapshot {
            return Err(RemoteError::new(
                "getPullRequestAndLabels",
                RemoteErrorKind::Status,
                "HTTP 401 Unauthorized",
            ));
        }
        Ok(self.snapshot.clone())
    }

    fn add_labels(&self, labelable_id: &str, label_ids: &[String]) -> Result<(), RemoteError> {
        assert_eq!(labelable_id, PR_ID);
        self.calls
            .borrow_mut()
            .push(ApiCall::AddLabels(label_ids.to_vec()));
        if self.fail_add {
            return Err(RemoteError::new(
                "addLabelsToLabelable",
                RemoteErrorKind::GraphQl,
                "Resource not accessible by integration",
            ));
        }
        Ok(())
    }

    fn remove_labels(&self, labelable_id: &str, label_ids: &[String]) -> Result<(), RemoteError> {
        assert_eq!(labelable_id, PR_ID);
        self.calls
            .borrow_mut()
            .push(ApiCall::RemoveLabels(label_ids.to_vec()));
        if self.fail_remove {
            return Err(RemoteError::new(
                "removeLabelsFromLabelable",
                RemoteErrorKind::GraphQl,
                "Resource not accessible by integration",
            ));
        }
        Ok(())
    }
}

/// [`ChangedFiles`] returning a fixed list (or a fixed error).
#[derive(Debug)]
pub struct ScriptedDiff {
    result: std::result::Result<Vec<String>, String>,
    calls: RefCell<Vec<(String, String)>>,
}

impl ScriptedDiff {
    pub fn files(files: &[&str]) -> Self {
        Self {
            result: Ok(files.iter().map(|file| file.to_string()).collect()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// `(head, base)` pairs the diff was asked for.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.borrow().clone()
    }
}

impl ChangedFiles for ScriptedDiff {
    fn changed_files(&self, head: &str, base: &str) -> Result<Vec<String>> {
        self.calls
            .borrow_mut()
            .push((head.to_string(), base.to_string()));
        self.result.clone().map_err(|message| anyhow!(message))
    }
}

/// Temporary git repository with one initial commit.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("tempdir")?;
        let repo = Self { dir };
        repo.git(&["init", "--quiet"])?;
        repo.git(&["config", "user.email", "test@example.com"])?;
        repo.git(&["config", "user.name", "test"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        repo.commit_file("README.md", "hi\n")?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Full SHA of HEAD.
    pub fn head(&self) -> Result<String> {
        Ok(self.git(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    pub fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        self.git(&["checkout", "--quiet", "-b", branch])?;
        Ok(())
    }

    pub fn checkout(&self, rev: &str) -> Result<()> {
        self.git(&["checkout", "--quiet", rev])?;
        Ok(())
    }

    /// Write `rel_path` and commit it.
    pub fn commit_file(&self, rel_path: &str, contents: &str) -> Result<()> {
        let path = self.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        self.git(&["add", rel_path])?;
        self.git(&["commit", "--quiet", "-m", &format!("add {rel_path}")])?;
        Ok(())
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
