use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::link::User;

use super::errors::Result;

/// A pull request to open on a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestSpec {
    /// Owner of the repository receiving the pull request.
    pub owner: String,
    /// Repository receiving the pull request.
    pub repo: String,
    pub title: String,
    /// `owner:branch` the changes come from.
    pub head: String,
    /// Branch the changes are proposed into.
    pub base: String,
    pub body: String,
    pub maintainer_can_modify: bool,
}

/// A pull request the platform accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPullRequest {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// A fork discovered while listing the forks of an upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkCandidate {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub private: bool,
}

impl ForkCandidate {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            private: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// A repository created by forking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkedRepository {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub clone_url: Option<String>,
}

/// Capabilities the sync engine needs from a source-control hosting platform.
///
/// Calls without a `user` argument authenticate as the service's bot
/// account; the others act on behalf of the given user.
///
/// # Implementation Notes
///
/// Implementors should classify failures into [`HostingError`] kinds rather
/// than passing raw transport errors through, since the engine branches on
/// them (conflicts are informational, not-found gets its own message).
///
/// [`HostingError`]: super::HostingError
#[async_trait]
pub trait HostingClient: Send + Sync {
    /// Open a pull request.
    async fn create_pull_request(&self, spec: &PullRequestSpec) -> Result<CreatedPullRequest>;

    /// List one page of forks of `owner/repo`. `page` is zero-based.
    async fn list_forks(
        &self,
        user: &User,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ForkCandidate>>;

    /// Remaining calls in the current rate limit window.
    async fn remaining_quota(&self) -> Result<u64>;

    /// Fork `owner/repo` into the bot account.
    async fn fork_repository(&self, owner: &str, repo: &str) -> Result<ForkedRepository>;

    /// Grant `username` pull access to `owner/repo`.
    async fn add_collaborator(
        &self,
        user: &User,
        owner: &str,
        repo: &str,
        username: &str,
    ) -> Result<()>;

    /// Whether `owner/repo` carries the opt-out `label`.
    async fn has_opted_out(&self, user: &User, owner: &str, repo: &str, label: &str)
    -> Result<bool>;
}
