//! Git adapter: the list of files a pull request changed.
//!
//! Files are diffed against the merge base of head and base rather than
//! against base directly, so commits that landed on base after the branch
//! point do not leak into the PR's label set.

use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

/// Source of changed file paths between two commits.
pub trait ChangedFiles {
    /// Repository-relative paths changed on `head` since its merge base with `base`.
    fn changed_files(&self, head: &str, base: &str) -> Result<Vec<String>>;
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Common ancestor of two commits.
    #[instrument(skip(self))]
    pub fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        let out = self.run_capture(&["merge-base", a, b])?;
        let sha = out.trim().to_string();
        if sha.is_empty() {
            return Err(anyhow!("git merge-base {a} {b} returned no commit"));
        }
        debug!(merge_base = %sha, "resolved merge base");
        Ok(sha)
    }

    /// Paths that differ between two commits, exactly as stored in the tree.
    ///
    /// `-z` with `core.quotePath=false` keeps git from quoting or escaping
    /// paths with non-ASCII bytes, quotes or control characters.
    pub fn diff_name_only(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let out = self.run_capture(&[
            "-c",
            "core.quotePath=false",
            "diff",
            "--name-only",
            "-z",
            from,
            to,
        ])?;
        Ok(parse_name_only(&out))
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!(command = %args.join(" "), stderr = %stderr.trim(), "git wrote to stderr");
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

impl ChangedFiles for Git {
    #[instrument(skip(self))]
    fn changed_files(&self, head: &str, base: &str) -> Result<Vec<String>> {
        let merge_base = self.merge_base(head, base)?;
        let files = self
            .diff_name_only(&merge_base, head)
            .with_context(|| format!("diff {head} against merge base {merge_base}"))?;
        debug!(count = files.len(), "changed files");
        Ok(files)
    }
}

/// Split NUL-terminated `git diff --name-only -z` output.
fn parse_name_only(stdout: &str) -> Vec<String> {
    stdout
        .split('\0')
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}
