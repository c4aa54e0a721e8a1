//! Version token classification and resolution.
//!
//! A token names one of five request shapes (classic latest/exact, berry
//! latest/exact, or a CI build by PR number / commit / branch); resolution
//! turns it into a [`ResolvedDist`] or fails the run with
//! [`VersionNotFound`].

use crate::github::{self, ReleaseLookup};
use crate::refs::{self, BERRY_GIT_URL};
use crate::transport::{Auth, Transport};
use crate::types::{GitHubRelease, ResolvedDist};
use anyhow::{Context, Result};
use regex::Regex;
use std::process::Command;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Yarn version {0} not found")]
pub struct VersionNotFound(pub String);

/// Category of a requested version token. Immutable once classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequest {
    LatestClassic,
    ExactClassic(String),
    LatestBerry,
    ExactBerry(String),
    /// PR number, commit sha, or branch name, searched in CI history.
    Build(String),
}

impl VersionRequest {
    pub fn classify(token: &str) -> Self {
        match token {
            "1" | "classic" => Self::LatestClassic,
            "2" | "berry" => Self::LatestBerry,
            t if t.starts_with("0.") || t.starts_with("1.") => Self::ExactClassic(t.to_string()),
            t if t.starts_with("2.") => Self::ExactBerry(t.to_string()),
            t => Self::Build(t.to_string()),
        }
    }
}

/// Effective token when none was given: ask the installed yarn.
///
/// A dev build reports something like `3.1.0-git.20211029.hash.95af161`; the
/// segment after the last dot is the commit that built it.
pub fn detect_installed_version() -> Result<String> {
    let output = Command::new("yarn")
        .arg("--version")
        .output()
        .context("failed to invoke `yarn --version`")?;
    let mut version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if version.contains("git.") {
        if let Some(dot) = version.rfind('.') {
            version = version[dot + 1..].to_string();
        }
    }
    tracing::debug!("detected installed yarn version: {}", version);
    Ok(version)
}

pub async fn resolve<T: Transport>(remote: &T, token: &str) -> Result<ResolvedDist> {
    let resolved = match VersionRequest::classify(token) {
        VersionRequest::LatestClassic => {
            let release = github::latest_release(remote, github::CLASSIC_REPO).await?;
            classic_dist(&release)
        }
        VersionRequest::ExactClassic(version) => {
            let tag = format!("v{}", version);
            match github::release_by_tag(remote, github::CLASSIC_REPO, &tag).await? {
                ReleaseLookup::Found(release) => classic_dist(&release),
                ReleaseLookup::NotFound => None,
            }
        }
        VersionRequest::LatestBerry => resolve_berry_tag(remote, None).await?,
        VersionRequest::ExactBerry(version) => resolve_berry_tag(remote, Some(&version)).await?,
        VersionRequest::Build(target) => resolve_build(remote, &target).await?,
    };

    resolved.ok_or_else(|| VersionNotFound(token.to_string()).into())
}

fn classic_asset_url(release: &GitHubRelease) -> Option<String> {
    static ASSET_RE: OnceLock<Regex> = OnceLock::new();
    let re = ASSET_RE.get_or_init(|| {
        Regex::new(r"yarn-[0-9.\-]+\.js$").expect("classic asset pattern compiles")
    });
    release
        .assets
        .iter()
        .map(|asset| &asset.browser_download_url)
        .find(|url| re.is_match(url))
        .cloned()
}

fn classic_dist(release: &GitHubRelease) -> Option<ResolvedDist> {
    let url = classic_asset_url(release)?;
    let version = release
        .tag_name
        .strip_prefix('v')
        .unwrap_or(&release.tag_name)
        .to_string();
    Some(ResolvedDist {
        description: version.clone(),
        version,
        plugins_version: None,
        url,
    })
}

fn berry_url(version: &str) -> String {
    format!(
        "https://raw.githubusercontent.com/yarnpkg/berry/%40yarnpkg/cli/{}/packages/yarnpkg-cli/bin/yarn.js",
        version
    )
}

async fn resolve_berry_tag<T: Transport>(
    remote: &T,
    version: Option<&str>,
) -> Result<Option<ResolvedDist>> {
    let url = format!("{}/info/refs?service=git-upload-pack", BERRY_GIT_URL);
    let advertisement = remote.get_text(&url, Auth::Anonymous).await?;
    let tags = refs::parse_ref_advertisement(&advertisement);

    let found = match version {
        None => refs::select_latest_cli(&tags),
        Some(version) => refs::select_exact_cli(&tags, version),
    };

    Ok(found.map(|(name, sha)| {
        let version = name.rsplit('/').next().unwrap_or(name).to_string();
        let short = sha.get(..7).unwrap_or(sha).to_string();
        ResolvedDist {
            description: format!("{} {}", version, short),
            url: berry_url(&version),
            plugins_version: Some(short),
            version,
        }
    }))
}

async fn resolve_build<T: Transport>(remote: &T, token: &str) -> Result<Option<ResolvedDist>> {
    let mut target = token.to_string();
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        // Best effort: a failed PR lookup keeps the literal token as target.
        match github::pull_request_head(remote, github::BERRY_REPO, token).await {
            Ok(sha) => target = sha,
            Err(err) => {
                tracing::debug!("PR #{} lookup failed ({}), treating token literally", token, err)
            }
        }
    }

    let mut page: u64 = 0;
    loop {
        let runs = github::workflow_runs_page(remote, github::BERRY_REPO, page).await?;
        let total_pages = runs.total_count.div_ceil(github::RUNS_PER_PAGE);
        println!(
            "Searching through GH action workflow runs page {}/{}...",
            page, total_pages
        );

        for run in &runs.workflow_runs {
            let matches = run.head_sha.starts_with(&target)
                || run
                    .head_branch
                    .as_deref()
                    .is_some_and(|branch| branch.starts_with(&target))
                || run.head_commit.tree_id.starts_with(&target);
            if !matches {
                continue;
            }

            let artifacts = github::run_artifacts(remote, &run.artifacts_url).await?;
            let Some(bundle) = artifacts.artifacts.iter().find(|a| a.name == "bundle") else {
                // Run matched but published no bundle; keep scanning.
                continue;
            };

            let version = run.head_sha.get(..7).unwrap_or(&run.head_sha).to_string();
            let branch = run.head_branch.as_deref().unwrap_or("");
            return Ok(Some(ResolvedDist {
                description: format!("{} in {} '{}'", version, branch, run.head_commit.message),
                plugins_version: Some(version.clone()),
                url: bundle.archive_download_url.clone(),
                version,
            }));
        }

        if (runs.workflow_runs.len() as u64) < github::RUNS_PER_PAGE {
            return Ok(None);
        }
        page += 1;
    }
}
