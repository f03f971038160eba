//! GitHub GraphQL adapter: pull request snapshot and label mutations.
//!
//! The [`LabelApi`] trait decouples reconciliation from the transport. Tests
//! use a recording fake that never touches the network.

use anyhow::Context;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::types::LabelSet;

pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

const SNAPSHOT_REQUEST: &str = "getPullRequestAndLabels";
const ADD_REQUEST: &str = "addLabelsToLabelable";
const REMOVE_REQUEST: &str = "removeLabelsFromLabelable";

const SNAPSHOT_QUERY: &str = r#"
query getPullRequestAndLabels($owner: String!, $name: String!, $number: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      id
      headRefOid
      baseRefOid
      labels(first: 100) {
        edges { node { id name } }
      }
    }
    labels(first: 100, after: $after) {
      edges { node { id name } }
      pageInfo { hasNextPage endCursor }
    }
  }
}
"#;

const ADD_MUTATION: &str = r#"
mutation addLabelsToLabelable($labelableId: ID!, $labelIds: [ID!]!) {
  addLabelsToLabelable(input: { labelableId: $labelableId, labelIds: $labelIds }) {
    clientMutationId
  }
}
"#;

const REMOVE_MUTATION: &str = r#"
mutation removeLabelsFromLabelable($labelableId: ID!, $labelIds: [ID!]!) {
  removeLabelsFromLabelable(input: { labelableId: $labelableId, labelIds: $labelIds }) {
    clientMutationId
  }
}
"#;

/// Failure category of a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Request could not be sent or the body could not be read.
    Transport,
    /// Non-success HTTP status.
    Status,
    /// GraphQL `errors` array in an otherwise successful response.
    GraphQl,
    /// Response did not have the expected shape.
    Decode,
}

/// Remote call failure carrying the request it belonged to.
#[derive(Debug, Clone, Error)]
#[error("{request} failed ({kind:?}): {message}")]
pub struct RemoteError {
    pub request: &'static str,
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(request: &'static str, kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            request,
            kind,
            message: message.into(),
        }
    }
}

/// Repository label (or label attached to a pull request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
}

/// Pull request addressed by repository and number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

/// Everything the labeler reads from the remote in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSnapshot {
    /// Opaque labelable id used by mutations.
    pub id: String,
    pub head_ref_oid: String,
    pub base_ref_oid: String,
    /// Labels currently attached to the pull request.
    pub labels: Vec<Label>,
    /// Every label defined in the repository.
    pub catalog: Vec<Label>,
}

impl PullRequestSnapshot {
    pub fn current_label_names(&self) -> LabelSet {
        self.labels.iter().map(|label| label.name.clone()).collect()
    }

    /// Resolve label names to ids via the repository catalog.
    ///
    /// Returns `(ids, missing_names)`; ids follow the order of `names`.
    pub fn resolve_label_ids(&self, names: &LabelSet) -> (Vec<String>, Vec<String>) {
        let mut ids = Vec::new();
        let mut missing = Vec::new();
        for name in names {
            match self.catalog.iter().find(|label| &label.name == name) {
                Some(label) => ids.push(label.id.clone()),
                None => missing.push(name.clone()),
            }
        }
        (ids, missing)
    }
}

/// Remote collaborator for reading and mutating pull request labels.
pub trait LabelApi {
    fn fetch_snapshot(&self, pr: &PullRequestRef) -> Result<PullRequestSnapshot, RemoteError>;
    fn add_labels(&self, labelable_id: &str, label_ids: &[String]) -> Result<(), RemoteError>;
    fn remove_labels(&self, labelable_id: &str, label_ids: &[String]) -> Result<(), RemoteError>;
}

/// GitHub GraphQL client (blocking).
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a, V: Serialize> {
    query: &'a str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SnapshotData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    pull_request: Option<PullRequestNode>,
    labels: LabelConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    id: String,
    head_ref_oid: String,
    base_ref_oid: String,
    labels: LabelConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelConnection {
    edges: Vec<LabelEdge>,
    #[serde(default)]
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct LabelEdge {
    node: Label,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

impl LabelConnection {
    fn into_labels(self) -> Vec<Label> {
        self.edges.into_iter().map(|edge| edge.node).collect()
    }

    fn next_cursor(&self) -> Option<String> {
        match &self.page_info {
            Some(info) if info.has_next_page => info.end_cursor.clone(),
            _ => None,
        }
    }
}

/// `Authorization` value for `token`; a blank token counts as none.
fn bearer_header(token: Option<&str>) -> anyhow::Result<Option<HeaderValue>> {
    let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) else {
        return Ok(None);
    };
    let mut value =
        HeaderValue::from_str(&format!("Bearer {token}")).context("invalid token")?;
    value.set_sensitive(true);
    Ok(Some(value))
}

impl GitHubClient {
    /// Create a client, authenticated when a token (e.g. `GITHUB_TOKEN`) is given.
    ///
    /// Without a token GitHub rejects every request; that surfaces as a
    /// snapshot failure rather than failing before the config check.
    pub fn new(token: Option<&str>, api_url: impl Into<String>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        match bearer_header(token)? {
            Some(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            None => warn!("no GitHub token configured, requests will be unauthenticated"),
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("autolabel/", env!("CARGO_PKG_VERSION"))),
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    fn execute<V: Serialize, R: DeserializeOwned>(
        &self,
        request: &'static str,
        query: &str,
        variables: V,
    ) -> Result<R, RemoteError> {
        let body = GraphQlRequest { query, variables };
        let response = self
            .client
            .post(&self.api_url)
            .json(&body)
            .send()
            .map_err(|err| RemoteError::new(request, RemoteErrorKind::Transport, err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|err| RemoteError::new(request, RemoteErrorKind::Transport, err.to_string()))?;
        if !status.is_success() {
            return Err(RemoteError::new(
                request,
                RemoteErrorKind::Status,
                format!("HTTP {status}: {}", text.trim()),
            ));
        }
        decode_response(request, &text)
    }

    fn mutate(
        &self,
        request: &'static str,
        mutation: &str,
        labelable_id: &str,
        label_ids: &[String],
    ) -> Result<(), RemoteError> {
        let variables = json!({ "labelableId": labelable_id, "labelIds": label_ids });
        let _: serde_json::Value = self.execute(request, mutation, variables)?;
        Ok(())
    }
}

impl LabelApi for GitHubClient {
    #[instrument(skip_all, fields(owner = %pr.owner, repo = %pr.repo, number = pr.number))]
    fn fetch_snapshot(&self, pr: &PullRequestRef) -> Result<PullRequestSnapshot, RemoteError> {
        let mut after: Option<String> = None;
        let mut pull_request: Option<PullRequestNode> = None;
        let mut catalog = Vec::new();
        loop {
            let variables = json!({
                "owner": pr.owner,
                "name": pr.repo,
                "number": pr.number,
                "after": after,
            });
            let data: SnapshotData = self.execute(SNAPSHOT_REQUEST, SNAPSHOT_QUERY, variables)?;
            let repository = data.repository.ok_or_else(|| {
                RemoteError::new(
                    SNAPSHOT_REQUEST,
                    RemoteErrorKind::Decode,
                    format!("repository {}/{} not found", pr.owner, pr.repo),
                )
            })?;
            if pull_request.is_none() {
                pull_request = repository.pull_request;
            }
            let next = repository.labels.next_cursor();
            catalog.extend(repository.labels.into_labels());
            debug!(catalog = catalog.len(), more = next.is_some(), "fetched label page");
            match next {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        let pull_request = pull_request.ok_or_else(|| {
            RemoteError::new(
                SNAPSHOT_REQUEST,
                RemoteErrorKind::Decode,
                format!("pull request #{} not found", pr.number),
            )
        })?;
        Ok(PullRequestSnapshot {
            id: pull_request.id,
            head_ref_oid: pull_request.head_ref_oid,
            base_ref_oid: pull_request.base_ref_oid,
            labels: pull_request.labels.into_labels(),
            catalog,
        })
    }

    #[instrument(skip_all, fields(labelable_id = %labelable_id, count = label_ids.len()))]
    fn add_labels(&self, labelable_id: &str, label_ids: &[String]) -> Result<(), RemoteError> {
        self.mutate(ADD_REQUEST, ADD_MUTATION, labelable_id, label_ids)
    }

    #[instrument(skip_all, fields(labelable_id = %labelable_id, count = label_ids.len()))]
    fn remove_labels(&self, labelable_id: &str, label_ids: &[String]) -> Result<(), RemoteError> {
        self.mutate(REMOVE_REQUEST, REMOVE_MUTATION, labelable_id, label_ids)
    }
}

/// Decode a GraphQL response body, surfacing `errors` before `data`.
fn decode_response<R: DeserializeOwned>(
    request: &'static str,
    body: &str,
) -> Result<R, RemoteError> {
    let response: GraphQlResponse<R> = serde_json::from_str(body)
        .map_err(|err| RemoteError::new(request, RemoteErrorKind::Decode, err.to_string()))?;
    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        let messages: Vec<&str> = errors.iter().map(|err| err.message.as_str()).collect();
        return Err(RemoteError::new(
            request,
            RemoteErrorKind::GraphQl,
            messages.join(", "),
        ));
    }
    response
        .data
        .ok_or_else(|| RemoteError::new(request, RemoteErrorKind::Decode, "no data in response"))
}
