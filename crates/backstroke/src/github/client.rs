//! GitHub API client creation and the `HostingClient` implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::error::GitHubError;
use crate::link::User;
use crate::platform::{
    self, CreatedPullRequest, ForkCandidate, ForkedRepository, HostingClient, HostingError,
    PullRequestSpec,
};

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "backstroke";

/// Create an authenticated Octocrab instance from a GitHub token.
pub fn create_client(token: &str) -> Result<Octocrab, GitHubError> {
    Octocrab::builder()
        .personal_token(token.to_string())
        .build()
        .map_err(GitHubError::Api)
}

/// Core API rate limit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: usize,
    pub remaining: usize,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ForkListing {
    name: String,
    owner: ForkOwner,
    #[serde(default)]
    private: bool,
}

#[derive(Debug, Deserialize)]
struct ForkOwner {
    login: String,
}

impl From<ForkListing> for ForkCandidate {
    fn from(listing: ForkListing) -> Self {
        ForkCandidate {
            owner: listing.owner.login,
            repo: listing.name,
            private: listing.private,
        }
    }
}

fn forks_route(owner: &str, repo: &str, page: u32, per_page: u32) -> String {
    // GitHub pages are one-based.
    format!(
        "/repos/{owner}/{repo}/forks?page={}&per_page={per_page}",
        page.saturating_add(1)
    )
}

fn label_route(owner: &str, repo: &str, label: &str) -> String {
    format!("/repos/{owner}/{repo}/labels/{}", label.replace(' ', "%20"))
}

/// GitHub API client implementing the `HostingClient` trait.
///
/// Wraps an `Octocrab` instance authenticated as the bot account, plus a
/// shared `reqwest` client for requests made with a user's token.
#[derive(Clone)]
pub struct GitHubClient {
    inner: Arc<Octocrab>,
    http_client: reqwest::Client,
}

impl GitHubClient {
    /// Create a new GitHub client from the bot's token.
    pub fn new(token: &str) -> Result<Self, GitHubError> {
        let client = create_client(token)?;
        Ok(Self::from_octocrab(client))
    }

    /// Create a GitHub client from an existing Octocrab instance.
    pub fn from_octocrab(client: Octocrab) -> Self {
        Self {
            inner: Arc::new(client),
            http_client: reqwest::Client::new(),
        }
    }

    /// Get a reference to the inner Octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.inner
    }

    /// Get the bot's core rate limit status.
    pub async fn rate_limit(&self) -> Result<RateLimitInfo, GitHubError> {
        let rate_limit = self.inner.ratelimit().get().await?;
        let core = &rate_limit.resources.core;

        Ok(RateLimitInfo {
            limit: core.limit,
            remaining: core.remaining,
            reset_at: DateTime::from_timestamp(core.reset as i64, 0).unwrap_or_else(Utc::now),
        })
    }

    /// Send a request authenticated with `user`'s token.
    async fn send_as(
        &self,
        user: &User,
        purpose: &'static str,
        method: Method,
        route: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, GitHubError> {
        let token = user.token().ok_or(GitHubError::MissingToken(purpose))?;

        let mut request = self
            .http_client
            .request(method, format!("{API_BASE}{route}"))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .bearer_auth(token);

        if let Some(body) = body {
            request = request.json(&body);
        }

        Ok(request.send().await?)
    }

    /// Turn a non-success response into `GitHubError::Status`.
    async fn error_for_status(route: &str, response: Response) -> GitHubError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        GitHubError::Status {
            status,
            route: route.to_string(),
            body,
        }
    }
}

#[async_trait]
impl HostingClient for GitHubClient {
    async fn create_pull_request(
        &self,
        spec: &PullRequestSpec,
    ) -> platform::Result<CreatedPullRequest> {
        let pr = self
            .inner
            .pulls(&spec.owner, &spec.repo)
            .create(&spec.title, &spec.head, &spec.base)
            .body(&spec.body)
            .maintainer_can_modify(spec.maintainer_can_modify)
            .send()
            .await
            .map_err(GitHubError::Api)?;

        debug!(owner = %spec.owner, repo = %spec.repo, number = pr.number, "pull request created");
        Ok(CreatedPullRequest {
            number: Some(pr.number),
            html_url: pr.html_url.map(|u| u.to_string()),
        })
    }

    async fn list_forks(
        &self,
        user: &User,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> platform::Result<Vec<ForkCandidate>> {
        let route = forks_route(owner, repo, page, per_page);
        let response = self
            .send_as(user, "fork listing", Method::GET, &route, None)
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(&route, response).await.into());
        }

        let forks: Vec<ForkListing> = response.json().await.map_err(GitHubError::Http)?;
        Ok(forks.into_iter().map(ForkCandidate::from).collect())
    }

    async fn remaining_quota(&self) -> platform::Result<u64> {
        let info = self.rate_limit().await?;
        Ok(info.remaining as u64)
    }

    async fn fork_repository(&self, owner: &str, repo: &str) -> platform::Result<ForkedRepository> {
        let forked = self
            .inner
            .repos(owner, repo)
            .create_fork()
            .send()
            .await
            .map_err(GitHubError::Api)?;

        Ok(ForkedRepository {
            owner: forked
                .owner
                .map(|o| o.login)
                .unwrap_or_default(),
            repo: forked.name,
            clone_url: forked.clone_url.map(|u| u.to_string()),
        })
    }

    async fn add_collaborator(
        &self,
        user: &User,
        owner: &str,
        repo: &str,
        username: &str,
    ) -> platform::Result<()> {
        let route = format!("/repos/{owner}/{repo}/collaborators/{username}");
        let response = self
            .send_as(
                user,
                "collaborator invitation",
                Method::PUT,
                &route,
                Some(serde_json::json!({ "permission": "pull" })),
            )
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for_status(&route, response).await.into())
        }
    }

    async fn has_opted_out(
        &self,
        user: &User,
        owner: &str,
        repo: &str,
        label: &str,
    ) -> platform::Result<bool> {
        let route = label_route(owner, repo, label);
        let response = self
            .send_as(user, "opt-out check", Method::GET, &route, None)
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(HostingError::from(
                Self::error_for_status(&route, response).await,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forks_route_translates_zero_based_pages() {
        assert_eq!(
            forks_route("1egoman", "backstroke", 0, 100),
            "/repos/1egoman/backstroke/forks?page=1&per_page=100"
        );
        assert_eq!(
            forks_route("1egoman", "backstroke", 2, 100),
            "/repos/1egoman/backstroke/forks?page=3&per_page=100"
        );
    }

    #[test]
    fn label_route_escapes_spaces() {
        assert_eq!(
            label_route("o", "r", "no backstroke"),
            "/repos/o/r/labels/no%20backstroke"
        );
    }

    #[test]
    fn fork_listing_maps_to_candidate() {
        let listing: Vec<ForkListing> = serde_json::from_str(
            r#"[
                {"name": "backstroke", "owner": {"login": "rgaus", "id": 1}, "private": true, "fork": true},
                {"name": "repo", "owner": {"login": "another"}}
            ]"#,
        )
        .unwrap();
        let forks: Vec<ForkCandidate> = listing.into_iter().map(ForkCandidate::from).collect();

        assert_eq!(
            forks,
            vec![
                ForkCandidate {
                    owner: "rgaus".into(),
                    repo: "backstroke".into(),
                    private: true,
                },
                ForkCandidate::new("another", "repo"),
            ]
        );
    }

    #[tokio::test]
    async fn user_calls_require_a_token() {
        let client = GitHubClient::from_octocrab(Octocrab::default());
        let err = client
            .list_forks(&User::default(), "o", "r", 0, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, HostingError::Auth { .. }));
    }
}
