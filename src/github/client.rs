//! HTTP client for the GitHub releases API.
//!
//! [`GithubClient`] implements [`ReleaseHost`] over reqwest. The pipeline only
//! talks to the trait, which keeps release resolution testable with an
//! in-memory host and pins every network access to this one file.
//!
//! Authentication is optional for read paths. The bearer token, when present,
//! is attached to API and upload requests only; dataset downloads hit
//! arbitrary third-party hosts and never carry credentials.

use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::json;
use tracing::debug;

use super::models::{Asset, Release, RepoRef};
use crate::core::RelpackError;

const API_ROOT: &str = "https://api.github.com";
const UPLOAD_ROOT: &str = "https://uploads.github.com";
const API_VERSION: &str = "2022-11-28";

/// Parameters for publishing a new release.
#[derive(Debug, Clone)]
pub struct NewRelease {
    /// Tag to create, e.g. `v5.4.23-payload.1.1.0`.
    pub tag_name: String,
    /// Commit the tag should point at.
    pub target_commitish: String,
    /// Release title.
    pub name: String,
    /// Markdown body.
    pub body: String,
}

/// Read and write access to a release-hosting forge.
///
/// The futures returned here are polled from a single task, so implementations
/// do not need to produce `Send` futures.
#[allow(async_fn_in_trait)]
pub trait ReleaseHost {
    /// Resolves the latest published (non-prerelease) release.
    async fn latest_release(&self, repo: &RepoRef) -> Result<Release>;

    /// Lists recent releases, prereleases included.
    async fn list_releases(&self, repo: &RepoRef) -> Result<Vec<Release>>;

    /// Downloads an asset's raw bytes.
    async fn download_asset(&self, repo: &RepoRef, asset: &Asset) -> Result<Vec<u8>>;

    /// Downloads an arbitrary URL, uncredentialed.
    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>>;

    /// Publishes a release and returns it as the API recorded it.
    async fn create_release(&self, repo: &RepoRef, new_release: &NewRelease) -> Result<Release>;

    /// Attaches a file to an existing release.
    async fn upload_asset(
        &self,
        repo: &RepoRef,
        release_id: u64,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<()>;
}

/// GitHub-backed [`ReleaseHost`] implementation.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    token: Option<String>,
}

impl GithubClient {
    /// Creates a client, optionally authenticated with a personal access token.
    pub fn new(token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("relpack/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to construct HTTP client")?;

        Ok(Self { http, token })
    }

    fn api_request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Response> {
        debug!(target: "github", "{operation}");
        request
            .send()
            .await
            .map_err(|e| RelpackError::TransportError {
                operation: operation.to_string(),
                reason: e.to_string(),
            })
            .map_err(Into::into)
    }
}

impl ReleaseHost for GithubClient {
    async fn latest_release(&self, repo: &RepoRef) -> Result<Release> {
        let url = format!("{API_ROOT}/repos/{}/releases/latest", repo.slug());
        let operation = format!("resolve latest release of {}", repo.slug());
        let response = self.send(self.api_request(Method::GET, &url), &operation).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RelpackError::ReleaseNotFound { repo: repo.slug() }.into());
        }
        let response = check_status(response, &operation).await?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse latest release of {}", repo.slug()))
    }

    async fn list_releases(&self, repo: &RepoRef) -> Result<Vec<Release>> {
        let url = format!("{API_ROOT}/repos/{}/releases?per_page=100", repo.slug());
        let operation = format!("list releases of {}", repo.slug());
        let response = self.send(self.api_request(Method::GET, &url), &operation).await?;
        let response = check_status(response, &operation).await?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse release listing of {}", repo.slug()))
    }

    async fn download_asset(&self, repo: &RepoRef, asset: &Asset) -> Result<Vec<u8>> {
        // The asset id endpoint serves the binary when asked for octet-stream
        // and redirects to storage; reqwest follows the redirect and drops the
        // Authorization header across hosts.
        let url = format!(
            "{API_ROOT}/repos/{}/releases/assets/{}",
            repo.slug(),
            asset.id
        );
        let operation = format!("download asset {}", asset.name);
        let request = self
            .api_request(Method::GET, &url)
            .header(ACCEPT, "application/octet-stream");
        let response = self.send(request, &operation).await?;
        let response = check_status(response, &operation).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if content_type.starts_with("application/json") {
            return Err(RelpackError::MalformedResponse {
                name: asset.name.clone(),
            }
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelpackError::TransportError {
                operation,
                reason: e.to_string(),
            })?;
        debug!(target: "github", "downloaded {} ({} bytes)", asset.name, bytes.len());
        Ok(bytes.to_vec())
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>> {
        debug!(target: "github", "fetch {url}");
        let response =
            self.http
                .get(url)
                .send()
                .await
                .map_err(|_| RelpackError::DatasetUnavailable {
                    url: url.to_string(),
                    status: None,
                })?;

        if !response.status().is_success() {
            return Err(RelpackError::DatasetUnavailable {
                url: url.to_string(),
                status: Some(response.status().as_u16()),
            }
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|_| RelpackError::DatasetUnavailable {
                url: url.to_string(),
                status: None,
            })?;
        Ok(bytes.to_vec())
    }

    async fn create_release(&self, repo: &RepoRef, new_release: &NewRelease) -> Result<Release> {
        let url = format!("{API_ROOT}/repos/{}/releases", repo.slug());
        let operation = format!(
            "create release {} in {}",
            new_release.tag_name,
            repo.slug()
        );
        let request = self.api_request(Method::POST, &url).json(&json!({
            "tag_name": new_release.tag_name,
            "target_commitish": new_release.target_commitish,
            "name": new_release.name,
            "body": new_release.body,
            "generate_release_notes": true,
        }));
        let response = self.send(request, &operation).await?;
        let response = check_status(response, &operation).await?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse created release {}", new_release.tag_name))
    }

    async fn upload_asset(
        &self,
        repo: &RepoRef,
        release_id: u64,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let url = format!(
            "{UPLOAD_ROOT}/repos/{}/releases/{release_id}/assets",
            repo.slug()
        );
        let operation = format!("upload asset {name}");
        let request = self
            .api_request(Method::POST, &url)
            .query(&[("name", name)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        let response = self.send(request, &operation).await?;
        check_status(response, &operation).await?;
        Ok(())
    }
}

/// Maps a non-success status to [`RelpackError::ApiError`] with a body excerpt.
async fn check_status(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(target: "github", "{operation} failed with status {status}");
    Err(RelpackError::ApiError {
        status: status.as_u16(),
        message: format!("{operation}: {}", excerpt(&body)),
    }
    .into())
}

/// Trims an error body to a log-friendly excerpt.
fn excerpt(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    if trimmed.len() <= LIMIT {
        return trimmed.to_string();
    }
    let cut = trimmed
        .char_indices()
        .take_while(|(i, _)| *i < LIMIT)
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    format!("{}...", &trimmed[..cut])
}
