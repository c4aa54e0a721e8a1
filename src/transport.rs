//! Thin HTTPS lookup clients.
//!
//! Success for a GET is strictly HTTP 200; anything else is an error
//! carrying the status and URL. HEAD probes report existence without
//! erroring on non-200. No retries: every remote call is attempted exactly
//! once.

use crate::types::PinMetadata;
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub const USER_AGENT: &str = concat!("pinyarn/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{status} {reason} at {url}")]
    Status {
        status: u16,
        reason: String,
        url: String,
    },
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::Status { status: 404, .. })
    }
}

/// Whether a request presents a credential from the pool. The git reference
/// probe goes out anonymous with only the product User-Agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Token,
    Anonymous,
}

/// Credential selection strategy, substitutable in tests.
pub trait TokenSource {
    /// Pick the credential for the next request, if any are configured.
    fn next(&self) -> Option<String>;
}

/// Uniformly random rotation over a pool of credentials, spreading requests
/// across tokens to stay under per-token rate limits.
pub struct RotatingTokens {
    pool: Vec<String>,
}

impl RotatingTokens {
    pub fn new(pool: Vec<String>) -> Self {
        Self { pool }
    }

    /// Pool assembled from the metadata's split `ghTokens` segments plus the
    /// `GITHUB_TOKEN` environment variable when set.
    pub fn from_metadata(meta: &PinMetadata) -> Self {
        let mut pool: Vec<String> = meta
            .gh_tokens
            .iter()
            .map(|segments| segments.concat())
            .filter(|token| !token.is_empty())
            .collect();
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.is_empty() {
                pool.push(token);
            }
        }
        Self { pool }
    }
}

impl TokenSource for RotatingTokens {
    fn next(&self) -> Option<String> {
        self.pool.choose(&mut rand::thread_rng()).cloned()
    }
}

#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get_text(&self, url: &str, auth: Auth) -> Result<String, TransportError>;

    /// HEAD probe: true iff the URL answers 200.
    async fn head_ok(&self, url: &str) -> Result<bool, TransportError>;

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TransportError> {
        let body = self.get_text(url, Auth::Token).await?;
        serde_json::from_str(&body).map_err(|source| TransportError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

pub struct RestTransport<S> {
    client: reqwest::Client,
    tokens: S,
}

impl<S: TokenSource> RestTransport<S> {
    pub fn new(tokens: S) -> Self {
        Self {
            client: reqwest::Client::new(),
            tokens,
        }
    }
}

impl<S: TokenSource> Transport for RestTransport<S> {
    async fn get_text(&self, url: &str, auth: Auth) -> Result<String, TransportError> {
        tracing::debug!("GET {}", url);
        let mut request = self.client.get(url).header("User-Agent", USER_AGENT);
        if auth == Auth::Token {
            if let Some(token) = self.tokens.next() {
                request = request.header("Authorization", format!("token {}", token));
            }
        }

        let response = request.send().await.map_err(|source| TransportError::Network {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TransportError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|source| TransportError::Network {
            url: url.to_string(),
            source,
        })
    }

    async fn head_ok(&self, url: &str) -> Result<bool, TransportError> {
        tracing::debug!("HEAD {}", url);
        let response = self
            .client
            .head(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|source| TransportError::Network {
                url: url.to_string(),
                source,
            })?;
        Ok(response.status() == reqwest::StatusCode::OK)
    }
}
