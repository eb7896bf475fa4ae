//! Shared fakes for integration tests.
//!
//! `FakeHostingClient` answers from scripted tables and records every write;
//! `FakeMirror` materializes clones on disk so tests can observe scratch
//! directory cleanup.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use backstroke::link::{Link, User};
use backstroke::mirror::{GitMirror, MirrorError};
use backstroke::platform::{
    CreatedPullRequest, ForkCandidate, ForkedRepository, HostingClient, HostingError,
    PullRequestSpec, QuotaGate, Result,
};
use backstroke::sync::{EngineConfig, SyncEngine};
use serde_json::{Value, json};

#[derive(Default)]
pub struct FakeHostingClient {
    /// Scripted pull request answers keyed by `owner/repo`; success when absent.
    pull_request_results: Mutex<HashMap<String, Result<CreatedPullRequest>>>,
    fork_pages: Mutex<Vec<Vec<ForkCandidate>>>,
    fork_listing_error: Mutex<Option<HostingError>>,
    fork_repository_error: Mutex<Option<HostingError>>,
    opted_out: Mutex<HashSet<String>>,
    quota: Mutex<VecDeque<u64>>,

    pub pull_requests: Mutex<Vec<PullRequestSpec>>,
    pub collaborators: Mutex<Vec<(String, String)>>,
    pub forked: Mutex<Vec<String>>,
    pub listed_pages: Mutex<Vec<(u32, u32)>>,
    pub network_calls: AtomicUsize,
}

impl FakeHostingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_pull_request(&self, full_name: &str, err: HostingError) {
        self.pull_request_results
            .lock()
            .unwrap()
            .insert(full_name.to_string(), Err(err));
    }

    pub fn with_fork_pages(&self, pages: Vec<Vec<ForkCandidate>>) {
        *self.fork_pages.lock().unwrap() = pages;
    }

    pub fn fail_fork_listing(&self, err: HostingError) {
        *self.fork_listing_error.lock().unwrap() = Some(err);
    }

    pub fn fail_fork_repository(&self, err: HostingError) {
        *self.fork_repository_error.lock().unwrap() = Some(err);
    }

    pub fn opt_out(&self, full_name: &str) {
        self.opted_out.lock().unwrap().insert(full_name.to_string());
    }

    pub fn script_quota(&self, values: impl IntoIterator<Item = u64>) {
        self.quota.lock().unwrap().extend(values);
    }

    pub fn pull_requests(&self) -> Vec<PullRequestSpec> {
        self.pull_requests.lock().unwrap().clone()
    }

    pub fn network_calls(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HostingClient for FakeHostingClient {
    async fn create_pull_request(&self, spec: &PullRequestSpec) -> Result<CreatedPullRequest> {
        self.touch();
        self.pull_requests.lock().unwrap().push(spec.clone());
        let key = format!("{}/{}", spec.owner, spec.repo);
        self.pull_request_results
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| {
                Ok(CreatedPullRequest {
                    number: Some(1),
                    html_url: Some(format!("https://github.com/{key}/pull/1")),
                })
            })
    }

    async fn list_forks(
        &self,
        _user: &User,
        _owner: &str,
        _repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ForkCandidate>> {
        self.touch();
        self.listed_pages.lock().unwrap().push((page, per_page));
        if let Some(err) = self.fork_listing_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .fork_pages
            .lock()
            .unwrap()
            .get(page as usize)
            .cloned()
            .unwrap_or_default())
    }

    async fn remaining_quota(&self) -> Result<u64> {
        self.touch();
        Ok(self.quota.lock().unwrap().pop_front().unwrap_or(5000))
    }

    async fn fork_repository(&self, owner: &str, repo: &str) -> Result<ForkedRepository> {
        self.touch();
        self.forked.lock().unwrap().push(format!("{owner}/{repo}"));
        if let Some(err) = self.fork_repository_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(ForkedRepository {
            owner: "backstroke-bot".to_string(),
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
        self.touch();
        self.collaborators
            .lock()
            .unwrap()
            .push((format!("{owner}/{repo}"), username.to_string()));
        Ok(())
    }

    async fn has_opted_out(
        &self,
        _user: &User,
        owner: &str,
        repo: &str,
        _label: &str,
    ) -> Result<bool> {
        self.touch();
        // GitHub rejects calls while the quota reads zero.
        if self.quota.lock().unwrap().front() == Some(&0) {
            return Err(HostingError::auth("API rate limit exceeded"));
        }
        Ok(self
            .opted_out
            .lock()
            .unwrap()
            .contains(&format!("{owner}/{repo}")))
    }
}

#[derive(Default)]
pub struct FakeMirror {
    pub clones: Mutex<Vec<(String, PathBuf)>>,
    pub pushes: Mutex<Vec<(String, String)>>,
    fail_push: Mutex<bool>,
}

impl FakeMirror {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_push() -> Arc<Self> {
        let mirror = Self::default();
        *mirror.fail_push.lock().unwrap() = true;
        Arc::new(mirror)
    }

    pub fn clone_paths(&self) -> Vec<PathBuf> {
        self.clones
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl GitMirror for FakeMirror {
    async fn clone_repository(&self, url: &str, path: &Path) -> std::result::Result<(), MirrorError> {
        std::fs::create_dir_all(path)?;
        std::fs::write(path.join("README.md"), "upstream")?;
        self.clones
            .lock()
            .unwrap()
            .push((url.to_string(), path.to_path_buf()));
        Ok(())
    }

    async fn force_push(
        &self,
        path: &Path,
        remote_url: &str,
        branch: &str,
    ) -> std::result::Result<(), MirrorError> {
        assert!(path.exists(), "push must happen while the clone exists");
        if *self.fail_push.lock().unwrap() {
            return Err(MirrorError::git("authentication required"));
        }
        self.pushes
            .lock()
            .unwrap()
            .push((remote_url.to_string(), branch.to_string()));
        Ok(())
    }
}

/// Engine over the fakes with quota checks on and no throttle.
pub fn engine(client: Arc<FakeHostingClient>, mirror: Arc<FakeMirror>) -> SyncEngine {
    engine_with(client, mirror, EngineConfig::default())
}

pub fn engine_with(
    client: Arc<FakeHostingClient>,
    mirror: Arc<FakeMirror>,
    config: EngineConfig,
) -> SyncEngine {
    SyncEngine::new(client, mirror, QuotaGate::default(), config)
}

pub fn link_json(fork_type: &str) -> Value {
    json!({
        "id": 8,
        "name": "My Link",
        "enabled": true,
        "upstreamType": "repo",
        "upstreamOwner": "1egoman",
        "upstreamRepo": "backstroke",
        "upstreamBranch": "master",
        "forkType": fork_type,
        "forkOwner": "rgaus",
        "forkRepo": "backstroke",
        "forkBranch": "master",
        "owner": {"username": "rgaus", "accessToken": "ghp_owner_secret"}
    })
}

pub fn link(fork_type: &str) -> Link {
    serde_json::from_value(link_json(fork_type)).unwrap()
}

pub fn user() -> User {
    User::with_token("ghp_user_secret")
}
