//! Run context assembled once from the GitHub Actions environment.
//!
//! Every step receives the [`ActionContext`] explicitly; nothing reads the
//! environment after startup.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use tracing::debug;

use crate::io::github::PullRequestRef;

/// Event name the labeler acts on.
pub const PULL_REQUEST_EVENT: &str = "pull_request";

/// Pull request actions the labeler acts on.
pub const SUPPORTED_ACTIONS: [&str; 2] = ["opened", "synchronize"];

/// Subset of the webhook payload at `GITHUB_EVENT_PATH`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EventPayload {
    pub action: Option<String>,
    pub number: Option<u64>,
    pub pull_request: Option<PullRequestPayload>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PullRequestPayload {
    pub number: u64,
}

impl EventPayload {
    /// Pull request number, preferring `pull_request.number`.
    pub fn pr_number(&self) -> Option<u64> {
        self.pull_request
            .as_ref()
            .map(|pr| pr.number)
            .or(self.number)
    }
}

/// Read the webhook payload.
pub fn load_event(path: &Path) -> Result<EventPayload> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse event {}", path.display()))
}

/// Split `owner/name`.
pub fn parse_repository(raw: &str) -> Result<(String, String)> {
    let (owner, name) = raw
        .trim()
        .split_once('/')
        .ok_or_else(|| anyhow!("repository must be 'owner/name', got '{raw}'"))?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        bail!("repository must be 'owner/name', got '{raw}'");
    }
    Ok((owner.to_string(), name.to_string()))
}

/// Raw inputs, typically from CLI flags with environment fallbacks.
#[derive(Debug, Clone, Default)]
pub struct ContextInputs {
    pub workspace: PathBuf,
    /// Config path relative to the workspace (absolute paths are kept as-is).
    pub config: PathBuf,
    pub repository: Option<String>,
    pub event_name: String,
    pub event_path: Option<PathBuf>,
    /// Explicit PR number; overrides the payload.
    pub number: Option<u64>,
    pub dry_run: bool,
}

/// Everything a reconciliation run needs to know about where it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionContext {
    pub workspace: PathBuf,
    pub config_path: PathBuf,
    pub event_name: String,
    pub action: Option<String>,
    pub pull_request: Option<PullRequestRef>,
    pub dry_run: bool,
}

impl ActionContext {
    pub fn from_inputs(inputs: ContextInputs) -> Result<Self> {
        let payload = match &inputs.event_path {
            Some(path) => load_event(path)?,
            None => EventPayload::default(),
        };
        let number = inputs.number.or_else(|| payload.pr_number());
        let pull_request = match (inputs.repository.as_deref(), number) {
            (Some(repository), Some(number)) => {
                let (owner, repo) = parse_repository(repository)?;
                Some(PullRequestRef {
                    owner,
                    repo,
                    number,
                })
            }
            _ => None,
        };
        let config_path = inputs.workspace.join(&inputs.config);
        debug!(
            workspace = %inputs.workspace.display(),
            event = %inputs.event_name,
            action = ?payload.action,
            number = ?number,
            "action context"
        );
        Ok(Self {
            workspace: inputs.workspace,
            config_path,
            event_name: inputs.event_name,
            action: payload.action,
            pull_request,
            dry_run: inputs.dry_run,
        })
    }

    /// True for `pull_request` events with an `opened`/`synchronize` action.
    ///
    /// A missing action (manual invocation without a payload) is accepted.
    pub fn is_supported_event(&self) -> bool {
        if self.event_name != PULL_REQUEST_EVENT {
            return false;
        }
        match self.action.as_deref() {
            Some(action) => SUPPORTED_ACTIONS.contains(&action),
            None => true,
        }
    }

    pub fn event_label(&self) -> String {
        match &self.action {
            Some(action) => format!("{}.{}", self.event_name, action),
            None => self.event_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(workspace: &Path) -> ContextInputs {
        ContextInputs {
            workspace: workspace.to_path_buf(),
            config: PathBuf::from(".github/auto-label.json"),
            repository: Some("octo/widgets".to_string()),
            event_name: PULL_REQUEST_EVENT.to_string(),
            event_path: None,
            number: None,
            dry_run: false,
        }
    }

    #[test]
    fn parses_repository() {
        assert_eq!(
            parse_repository("octo/widgets").expect("parse"),
            ("octo".to_string(), "widgets".to_string())
        );
        assert!(parse_repository("octo").is_err());
        assert!(parse_repository("/widgets").is_err());
        assert!(parse_repository("a/b/c").is_err());
    }

    #[test]
    fn payload_prefers_pull_request_number() {
        let payload: EventPayload = serde_json::from_str(
            r#"{"action": "opened", "number": 7, "pull_request": {"number": 8, "title": "x"}}"#,
        )
        .expect("parse");
        assert_eq!(payload.pr_number(), Some(8));
    }

    #[test]
    fn context_reads_event_payload() {
        let temp = tempfile::tempdir().expect("tempdir");
        let event_path = temp.path().join("event.json");
        fs::write(&event_path, r#"{"action": "synchronize", "number": 42}"#).expect("write");

        let ctx = ActionContext::from_inputs(ContextInputs {
            event_path: Some(event_path),
            ..inputs(temp.path())
        })
        .expect("context");

        assert_eq!(ctx.config_path, temp.path().join(".github/auto-label.json"));
        assert_eq!(ctx.action.as_deref(), Some("synchronize"));
        assert_eq!(
            ctx.pull_request,
            Some(PullRequestRef {
                owner: "octo".to_string(),
                repo: "widgets".to_string(),
                number: 42,
            })
        );
        assert!(ctx.is_supported_event());
        assert_eq!(ctx.event_label(), "pull_request.synchronize");
    }

    #[test]
    fn explicit_number_overrides_payload() {
        let temp = tempfile::tempdir().expect("tempdir");
        let event_path = temp.path().join("event.json");
        fs::write(&event_path, r#"{"action": "opened", "number": 1}"#).expect("write");

        let ctx = ActionContext::from_inputs(ContextInputs {
            event_path: Some(event_path),
            number: Some(9),
            ..inputs(temp.path())
        })
        .expect("context");
        assert_eq!(ctx.pull_request.map(|pr| pr.number), Some(9));
    }

    #[test]
    fn other_events_and_actions_are_unsupported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut ctx = ActionContext::from_inputs(inputs(temp.path())).expect("context");
        assert!(ctx.is_supported_event());

        ctx.action = Some("closed".to_string());
        assert!(!ctx.is_supported_event());

        ctx.action = Some("opened".to_string());
        ctx.event_name = "push".to_string();
        assert!(!ctx.is_supported_event());
    }
}
