//! GitHub REST lookups for the two Yarn distributions.
//!
//! Classic (v1) releases live as release assets on `yarnpkg/yarn`; modern
//! (berry) builds come from tagged raw content and CI artifacts on
//! `yarnpkg/berry`.

use crate::transport::{Transport, TransportError};
use crate::types::{ArtifactList, GitHubRelease, PullRequest, WorkflowRuns};

pub const CLASSIC_REPO: &str = "yarnpkg/yarn";
pub const BERRY_REPO: &str = "yarnpkg/berry";
pub const RUNS_PER_PAGE: u64 = 100;

const API_ROOT: &str = "https://api.github.com";

/// Workflow whose runs publish the `bundle` artifact for every commit.
const ARTIFACTS_WORKFLOW: &str = "artifacts-workflow.yml";

/// Outcome of a by-tag release lookup. `NotFound` is decided here, on the
/// 404 status, so callers never sniff error-shaped response bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseLookup {
    Found(GitHubRelease),
    NotFound,
}

pub async fn latest_release<T: Transport>(
    remote: &T,
    repo: &str,
) -> Result<GitHubRelease, TransportError> {
    remote
        .get_json(&format!("{}/repos/{}/releases/latest", API_ROOT, repo))
        .await
}

pub async fn release_by_tag<T: Transport>(
    remote: &T,
    repo: &str,
    tag: &str,
) -> Result<ReleaseLookup, TransportError> {
    let url = format!("{}/repos/{}/releases/tags/{}", API_ROOT, repo, tag);
    match remote.get_json(&url).await {
        Ok(release) => Ok(ReleaseLookup::Found(release)),
        Err(err) if err.is_not_found() => Ok(ReleaseLookup::NotFound),
        Err(err) => Err(err),
    }
}

pub async fn pull_request_head<T: Transport>(
    remote: &T,
    repo: &str,
    number: &str,
) -> Result<String, TransportError> {
    let pr: PullRequest = remote
        .get_json(&format!("{}/repos/{}/pulls/{}", API_ROOT, repo, number))
        .await?;
    Ok(pr.head.sha)
}

pub async fn workflow_runs_page<T: Transport>(
    remote: &T,
    repo: &str,
    page: u64,
) -> Result<WorkflowRuns, TransportError> {
    remote
        .get_json(&format!(
            "{}/repos/{}/actions/workflows/{}/runs?per_page={}&page={}",
            API_ROOT, repo, ARTIFACTS_WORKFLOW, RUNS_PER_PAGE, page
        ))
        .await
}

pub async fn run_artifacts<T: Transport>(
    remote: &T,
    artifacts_url: &str,
) -> Result<ArtifactList, TransportError> {
    remote.get_json(artifacts_url).await
}
