//! The sync strategy engine.
//!
//! Given one link, decides how upstream changes reach the fork and carries
//! it out:
//!
//! - `repo`: one pull request into the named fork.
//! - `fork-all`: one pull request into every fork of the upstream, run
//!   concurrently, each failure captured per fork.
//! - `unrelated-repo`: mirror the upstream into a bot-owned repository and
//!   propose from there, since the fork shares no history with it.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::link::{ForkType, Link, RepoRef, User};
use crate::mirror::{GitMirror, repository_url};
use crate::platform::{
    ApiRateLimiter, DEFAULT_PAGE_SIZE, ForkCandidate, HostingClient, HostingError, QuotaGate,
    paginate,
};

use super::error::SyncError;
use super::pull_request::{self, Source};
use super::types::{EngineConfig, ForkOutcome, SyncResult};

/// Executes link syncs against a hosting platform.
///
/// Cheap to clone; fan-out tasks each hold a clone.
#[derive(Clone)]
pub struct SyncEngine {
    client: Arc<dyn HostingClient>,
    mirror: Arc<dyn GitMirror>,
    gate: QuotaGate,
    limiter: Option<ApiRateLimiter>,
    config: Arc<EngineConfig>,
}

impl SyncEngine {
    pub fn new(
        client: Arc<dyn HostingClient>,
        mirror: Arc<dyn GitMirror>,
        gate: QuotaGate,
        config: EngineConfig,
    ) -> Self {
        let limiter = config.fanout_rps.map(ApiRateLimiter::new);
        Self {
            client,
            mirror,
            gate,
            limiter,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<dyn HostingClient> {
        &self.client
    }

    pub fn gate(&self) -> QuotaGate {
        self.gate
    }

    /// Sync one link on behalf of `user`.
    ///
    /// # Errors
    /// Fails before any network call when the link is disabled, lacks an
    /// upstream or fork type, or names an unknown fork type.
    pub async fn execute(&self, link: &Link, user: &User) -> Result<SyncResult, SyncError> {
        if !link.enabled {
            return Err(SyncError::LinkDisabled);
        }
        if !link.is_configured() {
            return Err(SyncError::LinkMisconfigured);
        }
        let fork_type: ForkType = link.fork_type.as_deref().unwrap_or_default().parse()?;

        if !self.config.throttle.is_zero() {
            debug!(throttle_ms = self.config.throttle.as_millis() as u64, "throttling");
            tokio::time::sleep(self.config.throttle).await;
        }

        match fork_type {
            ForkType::Direct => self.sync_direct(link, user).await,
            ForkType::FanOut => self.sync_fan_out(link, user).await,
            ForkType::UnrelatedMirror => self.sync_unrelated(link, user).await,
        }
    }

    async fn await_quota(&self) -> Result<(), SyncError> {
        self.gate
            .wait(self.client.as_ref())
            .await
            .map_err(SyncError::Quota)
    }

    async fn check_opt_out(
        &self,
        user: &User,
        target: &RepoRef,
        enabled: bool,
    ) -> Result<(), SyncError> {
        if !enabled {
            return Ok(());
        }

        let opted_out = self
            .client
            .has_opted_out(user, &target.owner, &target.repo, &self.config.opt_out_label)
            .await
            .map_err(|e| {
                SyncError::hosting(
                    format!("Couldn't check whether {} opted out", target.full_name()),
                    e,
                )
            })?;

        if opted_out {
            debug!(fork = %target.full_name(), "target opted out");
            return Err(SyncError::OptedOut {
                owner: target.owner.clone(),
                repo: target.repo.clone(),
            });
        }
        Ok(())
    }

    async fn propose(
        &self,
        upstream: &RepoRef,
        target: &RepoRef,
        source: Source<'_>,
    ) -> Result<String, SyncError> {
        let spec = pull_request::build(upstream, target, source);
        let result = self.client.create_pull_request(&spec).await;
        pull_request::interpret(result, target)
    }

    async fn sync_direct(&self, link: &Link, user: &User) -> Result<SyncResult, SyncError> {
        let upstream = link.upstream();
        let fork = link.fork();
        debug!(fork = %fork, "proposing changes to the single fork");

        self.await_quota().await?;
        self.check_opt_out(user, &fork, self.config.opt_out.checks_named_fork())
            .await?;
        let response = self.propose(&upstream, &fork, Source::Upstream).await?;

        Ok(SyncResult::single(response))
    }

    async fn sync_fan_out(&self, link: &Link, user: &User) -> Result<SyncResult, SyncError> {
        let upstream = link.upstream();
        let forks = paginate(
            |page| {
                self.client.list_forks(
                    user,
                    &upstream.owner,
                    &upstream.repo,
                    page.page,
                    page.per_page,
                )
            },
            DEFAULT_PAGE_SIZE,
        )
        .await
        .map_err(|e| {
            SyncError::hosting(
                format!("Couldn't get forks for repository {}", upstream.full_name()),
                e,
            )
        })?;

        info!(upstream = %upstream.full_name(), forks = forks.len(), "fanning out to forks");

        if forks.is_empty() {
            return Ok(SyncResult::fan_out(Vec::new()));
        }

        let concurrency = self.config.fanout_concurrency.clamp(1, forks.len());
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let upstream = Arc::new(upstream);
        let user = Arc::new(user.clone());

        let mut handles = Vec::with_capacity(forks.len());
        for fork in forks {
            let engine = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let upstream = Arc::clone(&upstream);
            let user = Arc::clone(&user);

            handles.push(tokio::spawn(async move {
                let name = fork.full_name();
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return ForkOutcome::error("Semaphore closed unexpectedly"),
                };

                match engine.sync_fork(&upstream, &user, fork).await {
                    Ok(message) => ForkOutcome::ok(message),
                    Err(e) => {
                        warn!(fork = %name, error = %e, "fork sync failed");
                        ForkOutcome::error(e.to_string())
                    }
                }
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(match handle.await {
                Ok(outcome) => outcome,
                Err(e) => ForkOutcome::error(format!("Fork task failed: {e}")),
            });
        }

        Ok(SyncResult::fan_out(outcomes))
    }

    /// Propose the upstream branch to one fork found by fan-out.
    async fn sync_fork(
        &self,
        upstream: &RepoRef,
        user: &User,
        fork: ForkCandidate,
    ) -> Result<String, SyncError> {
        if let Some(limiter) = &self.limiter {
            limiter.wait().await;
        }

        // Forks receive the upstream's branch under the same name.
        let target = RepoRef::new(fork.owner, fork.repo, upstream.branch.clone());

        self.await_quota().await?;
        self.check_opt_out(user, &target, self.config.opt_out.checks_fan_out())
            .await?;

        if fork.private {
            let bot = &self.config.bot_username;
            debug!(fork = %target.full_name(), bot = %bot, "fork is private, inviting bot");
            self.client
                .add_collaborator(user, &target.owner, &target.repo, bot)
                .await
                .map_err(|e| {
                    SyncError::hosting(
                        format!(
                            "Couldn't make the {bot} bot user a collaborator on {}",
                            target.full_name()
                        ),
                        e,
                    )
                })?;
        }

        self.propose(upstream, &target, Source::Upstream).await
    }

    async fn sync_unrelated(&self, link: &Link, user: &User) -> Result<SyncResult, SyncError> {
        let upstream = link.upstream();
        let fork = link.fork();
        let bot = self.config.bot_username.as_str();

        self.await_quota().await?;
        self.check_opt_out(user, &fork, self.config.opt_out.checks_named_fork())
            .await?;

        let intermediate_repo = self.ensure_intermediate(&fork).await?;
        // One branch per fork owner inside the shared intermediate repository.
        let branch = fork.owner.clone();

        self.mirror_upstream(&upstream, &intermediate_repo, &branch)
            .await?;

        self.await_quota().await?;
        let response = self
            .propose(
                &upstream,
                &fork,
                Source::Mirror {
                    owner: bot,
                    repo: &intermediate_repo,
                    branch: &branch,
                    git_host: &self.config.git_host,
                },
            )
            .await?;

        Ok(SyncResult::mirrored(response))
    }

    /// Fork the target into the bot account, returning the fork's name.
    async fn ensure_intermediate(&self, fork: &RepoRef) -> Result<String, SyncError> {
        let bot = &self.config.bot_username;
        match self.client.fork_repository(&fork.owner, &fork.repo).await {
            Ok(forked) if !forked.repo.is_empty() => Ok(forked.repo),
            Ok(_) => Ok(fork.repo.clone()),
            Err(HostingError::Conflict { .. }) => {
                debug!(fork = %fork.full_name(), "intermediate repository already exists");
                Ok(fork.repo.clone())
            }
            Err(e) => Err(SyncError::hosting(
                format!(
                    "Couldn't fork {} to {bot}/{}",
                    fork.full_name(),
                    fork.repo
                ),
                e,
            )),
        }
    }

    /// Clone the upstream into scratch space and force-push it to `branch`
    /// of the bot's intermediate repository.
    async fn mirror_upstream(
        &self,
        upstream: &RepoRef,
        intermediate_repo: &str,
        branch: &str,
    ) -> Result<(), SyncError> {
        let scratch = tempfile::Builder::new()
            .prefix("backstroke-mirror-")
            .tempdir()
            .map_err(|e| SyncError::mirror("Couldn't create a scratch directory", e))?;
        let clone_path = scratch.path().join("upstream");

        let source_url = repository_url(&self.config.git_host, &upstream.owner, &upstream.repo);
        let target_url = repository_url(
            &self.config.git_host,
            &self.config.bot_username,
            intermediate_repo,
        );

        let result = match self.mirror.clone_repository(&source_url, &clone_path).await {
            Ok(()) => self
                .mirror
                .force_push(&clone_path, &target_url, branch)
                .await
                .map_err(|e| {
                    SyncError::mirror(
                        format!(
                            "Couldn't push to {}/{intermediate_repo}@{branch}",
                            self.config.bot_username
                        ),
                        e,
                    )
                }),
            Err(e) => Err(SyncError::mirror(
                format!("Couldn't clone {}", upstream.full_name()),
                e,
            )),
        };

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!(path = %scratch_path.display(), error = %e, "failed to remove scratch directory");
        }

        result
    }
}
