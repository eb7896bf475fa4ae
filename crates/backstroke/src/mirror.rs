//! Local git mirroring for out-of-network syncs.
//!
//! When a fork shares no history with its upstream, the upstream is cloned
//! into a scratch directory and force-pushed to a branch of a bot-owned
//! repository, which can then open a pull request against the fork.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while cloning or pushing a mirror.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("git operation failed: {message}")]
    Git { message: String },

    #[error("scratch directory error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mirror task failed: {0}")]
    Task(String),
}

impl MirrorError {
    pub fn git(message: impl Into<String>) -> Self {
        Self::Git {
            message: message.into(),
        }
    }
}

#[cfg(feature = "git")]
impl From<git2::Error> for MirrorError {
    fn from(err: git2::Error) -> Self {
        Self::git(err.message())
    }
}

/// Clone and force-push capability used by the unrelated-repo strategy.
#[async_trait]
pub trait GitMirror: Send + Sync {
    /// Clone `url` into the (empty) directory at `path`.
    async fn clone_repository(&self, url: &str, path: &Path) -> Result<(), MirrorError>;

    /// Force-push the current head of the clone at `path` to `branch` on `remote_url`.
    async fn force_push(&self, path: &Path, remote_url: &str, branch: &str)
    -> Result<(), MirrorError>;
}

/// Build the HTTPS clone URL of `owner/repo` on `git_host`.
pub fn repository_url(git_host: &str, owner: &str, repo: &str) -> String {
    format!("{}/{owner}/{repo}.git", git_host.trim_end_matches('/'))
}

/// A mirror that only logs, used when writes are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunMirror;

#[async_trait]
impl GitMirror for DryRunMirror {
    async fn clone_repository(&self, url: &str, path: &Path) -> Result<(), MirrorError> {
        tracing::info!(url, path = %path.display(), "dry run: skipping clone");
        Ok(())
    }

    async fn force_push(
        &self,
        _path: &Path,
        remote_url: &str,
        branch: &str,
    ) -> Result<(), MirrorError> {
        tracing::info!(remote_url, branch, "dry run: skipping force push");
        Ok(())
    }
}

#[cfg(feature = "git")]
pub use self::git::Git2Mirror;

#[cfg(feature = "git")]
mod git {
    use std::path::{Path, PathBuf};

    use async_trait::async_trait;
    use git2::build::RepoBuilder;
    use git2::{Cred, FetchOptions, PushOptions, RemoteCallbacks, Repository};
    use tracing::debug;

    use super::{GitMirror, MirrorError};

    /// `GitMirror` backed by libgit2.
    ///
    /// Authenticates over HTTPS with the bot token when one is set; local
    /// paths and anonymous remotes work without it.
    #[derive(Clone, Default)]
    pub struct Git2Mirror {
        token: Option<String>,
    }

    impl std::fmt::Debug for Git2Mirror {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Git2Mirror")
                .field("token", &self.token.as_ref().map(|_| "<redacted>"))
                .finish()
        }
    }

    impl Git2Mirror {
        pub fn new(token: Option<String>) -> Self {
            Self { token }
        }

        fn callbacks(&self) -> RemoteCallbacks<'static> {
            let token = self.token.clone();
            let mut callbacks = RemoteCallbacks::new();
            callbacks.credentials(move |_url, username_from_url, _allowed| match &token {
                Some(token) => Cred::userpass_plaintext("x-access-token", token),
                None => Cred::username(username_from_url.unwrap_or("git")),
            });
            callbacks
        }

        fn clone_blocking(&self, url: &str, path: &Path) -> Result<(), MirrorError> {
            let mut fetch = FetchOptions::new();
            fetch.remote_callbacks(self.callbacks());

            RepoBuilder::new().fetch_options(fetch).clone(url, path)?;
            Ok(())
        }

        fn push_blocking(
            &self,
            path: &Path,
            remote_url: &str,
            branch: &str,
        ) -> Result<(), MirrorError> {
            let repo = Repository::open(path)?;
            let head = repo.head()?;
            let source = head.name().unwrap_or("HEAD").to_string();
            let refspec = format!("+{source}:refs/heads/{branch}");

            let mut callbacks = self.callbacks();
            callbacks.push_update_reference(|refname, status| match status {
                Some(reason) => Err(git2::Error::from_str(&format!(
                    "remote rejected {refname}: {reason}"
                ))),
                None => Ok(()),
            });
            let mut push = PushOptions::new();
            push.remote_callbacks(callbacks);

            let mut remote = repo.remote_anonymous(remote_url)?;
            remote.push(&[refspec.as_str()], Some(&mut push))?;
            Ok(())
        }
    }

    async fn blocking<F>(f: F) -> Result<(), MirrorError>
    where
        F: FnOnce() -> Result<(), MirrorError> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| MirrorError::Task(e.to_string()))?
    }

    #[async_trait]
    impl GitMirror for Git2Mirror {
        async fn clone_repository(&self, url: &str, path: &Path) -> Result<(), MirrorError> {
            debug!(url, path = %path.display(), "cloning mirror source");
            let this = self.clone();
            let url = url.to_string();
            let path = PathBuf::from(path);
            blocking(move || this.clone_blocking(&url, &path)).await
        }

        async fn force_push(
            &self,
            path: &Path,
            remote_url: &str,
            branch: &str,
        ) -> Result<(), MirrorError> {
            debug!(remote_url, branch, "force pushing mirror");
            let this = self.clone();
            let path = PathBuf::from(path);
            let remote_url = remote_url.to_string();
            let branch = branch.to_string();
            blocking(move || this.push_blocking(&path, &remote_url, &branch)).await
        }
    }

}
