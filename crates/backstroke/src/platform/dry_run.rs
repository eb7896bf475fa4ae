use async_trait::async_trait;
use tracing::info;

use crate::link::User;

use super::errors::Result;
use super::types::{
    CreatedPullRequest, ForkCandidate, ForkedRepository, HostingClient, PullRequestSpec,
};

/// A client that performs reads but only logs writes.
///
/// Pull requests, forks and collaborator invitations are reported as
/// successful without reaching the platform, so a worker can be pointed at
/// a real queue without touching any repository.
pub struct DryRunClient<C> {
    inner: C,
}

impl<C> DryRunClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// Get a reference to the inner client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: HostingClient> HostingClient for DryRunClient<C> {
    async fn create_pull_request(&self, spec: &PullRequestSpec) -> Result<CreatedPullRequest> {
        info!(
            owner = %spec.owner,
            repo = %spec.repo,
            head = %spec.head,
            base = %spec.base,
            title = %spec.title,
            "dry run: skipping pull request creation"
        );
        Ok(CreatedPullRequest::default())
    }

    async fn list_forks(
        &self,
        user: &User,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ForkCandidate>> {
        self.inner
            .list_forks(user, owner, repo, page, per_page)
            .await
    }

    async fn remaining_quota(&self) -> Result<u64> {
        self.inner.remaining_quota().await
    }

    async fn fork_repository(&self, owner: &str, repo: &str) -> Result<ForkedRepository> {
        info!(owner, repo, "dry run: skipping fork");
        Ok(ForkedRepository {
            owner: owner.to_string(),
            repo: repo.to_string(),
            clone_url: None,
        })
    }

    async fn add_collaborator(
        &self,
        _user: &User,
        owner: &str,
        repo: &str,
        username: &str,
    ) -> Result<()> {
        info!(owner, repo, username, "dry run: skipping collaborator invitation");
        Ok(())
    }

    async fn has_opted_out(
        &self,
        user: &User,
        owner: &str,
        repo: &str,
        label: &str,
    ) -> Result<bool> {
        self.inner.has_opted_out(user, owner, repo, label).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::StubClient;

    fn spec() -> PullRequestSpec {
        PullRequestSpec {
            owner: "rgaus".into(),
            repo: "backstroke".into(),
            title: "t".into(),
            head: "1egoman:master".into(),
            base: "master".into(),
            body: String::new(),
            maintainer_can_modify: false,
        }
    }

    #[tokio::test]
    async fn writes_are_short_circuited() {
        let client = DryRunClient::new(StubClient::default());

        client.create_pull_request(&spec()).await.unwrap();
        client.fork_repository("rgaus", "backstroke").await.unwrap();
        client
            .add_collaborator(&User::default(), "rgaus", "backstroke", "bot")
            .await
            .unwrap();

        assert_eq!(client.inner().write_calls(), 0);
    }

    #[tokio::test]
    async fn reads_reach_the_inner_client() {
        let client = DryRunClient::new(StubClient::with_quota([Ok(42)]));
        assert_eq!(client.remaining_quota().await.unwrap(), 42);
        assert_eq!(client.inner().quota_calls(), 1);
    }
}
