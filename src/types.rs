use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A concrete distribution resolved from a version token. Produced once per
/// run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDist {
    /// Version label, e.g. `3.1.0` or a 7-char commit prefix for CI builds.
    pub version: String,
    /// Tag/commit the companion plugins are published under. Classic
    /// releases have no plugin ecosystem and carry `None`.
    pub plugins_version: Option<String>,
    /// Human-readable summary printed alongside the URL.
    pub description: String,
    /// Download URL for the Yarn binary itself.
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GitHubRelease {
    pub tag_name: String,
    pub assets: Vec<GitHubAsset>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GitHubAsset {
    pub browser_download_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub head: PullRequestHead,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestHead {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRuns {
    pub total_count: u64,
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub head_sha: String,
    /// Null for some run events, so not assumed present.
    #[serde(default)]
    pub head_branch: Option<String>,
    pub head_commit: HeadCommit,
    pub artifacts_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadCommit {
    pub tree_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactList {
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub archive_download_url: String,
}

/// On-disk shape of `.pinyarn.json`. Keys this tool does not manage survive
/// a rewrite through the flattened `extra` map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PinMetadata {
    /// Credential pool; each entry is a token split into segments that are
    /// joined before use.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gh_tokens: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yarn_url: Option<String>,
    /// Omitted entirely when empty to keep the written file minimal.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plugin_urls: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
