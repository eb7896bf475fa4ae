//! Results and settings of the sync strategy engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of fork pull requests in flight at once.
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 20;

/// Default name of the bot account that owns intermediate repositories.
pub const DEFAULT_BOT_USERNAME: &str = "backstroke-bot";

/// Default host used to build clone and push URLs.
pub const DEFAULT_GIT_HOST: &str = "https://github.com";

/// Default label a repository adds to refuse automated pull requests.
pub const DEFAULT_OPT_OUT_LABEL: &str = "backstroke-optout";

/// When to check a target repository for the opt-out label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptOutPolicy {
    /// Never check.
    Disabled,
    /// Check each fork reached through fan-out, but trust explicitly named forks.
    #[default]
    FanOut,
    /// Check every target.
    Always,
}

impl OptOutPolicy {
    /// Whether a single, explicitly configured fork is checked.
    pub fn checks_named_fork(self) -> bool {
        matches!(self, OptOutPolicy::Always)
    }

    /// Whether forks discovered by fan-out are checked.
    pub fn checks_fan_out(self) -> bool {
        matches!(self, OptOutPolicy::FanOut | OptOutPolicy::Always)
    }
}

/// Settings injected into the engine by the surrounding process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Account that owns intermediate repositories and is invited to private forks.
    pub bot_username: String,
    /// Base URL for git clone/push, e.g. `https://github.com`.
    pub git_host: String,
    /// Delay applied before every operation's first network call.
    pub throttle: Duration,
    pub fanout_concurrency: usize,
    /// Optional proactive pacing of fan-out pull requests.
    pub fanout_rps: Option<u32>,
    pub opt_out: OptOutPolicy,
    pub opt_out_label: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bot_username: DEFAULT_BOT_USERNAME.to_string(),
            git_host: DEFAULT_GIT_HOST.to_string(),
            throttle: Duration::ZERO,
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
            fanout_rps: None,
            opt_out: OptOutPolicy::default(),
            opt_out_label: DEFAULT_OPT_OUT_LABEL.to_string(),
        }
    }
}

/// Outcome of one fork within a fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ForkOutcome {
    #[serde(rename = "OK")]
    Ok { data: String },
    #[serde(rename = "ERROR")]
    Error { error: String },
}

impl ForkOutcome {
    pub fn ok(data: impl Into<String>) -> Self {
        Self::Ok { data: data.into() }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Result of syncing one target repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleSync {
    pub is_enabled: bool,
    pub many: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unrelated_forks: bool,
    pub fork_count: usize,
    pub response: String,
}

impl SingleSync {
    fn new(response: String, unrelated_forks: bool) -> Self {
        Self {
            is_enabled: true,
            many: false,
            unrelated_forks,
            fork_count: 1,
            response,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOutMetrics {
    pub total: usize,
    pub successes: usize,
}

/// Aggregate result of syncing every fork of an upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanOutSync {
    pub many: bool,
    pub metrics: FanOutMetrics,
    /// Only the failed outcomes, in fork order.
    pub errors: Vec<ForkOutcome>,
    pub is_enabled: bool,
}

/// What the engine reports for a successful operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyncResult {
    Single(SingleSync),
    Many(FanOutSync),
}

impl SyncResult {
    /// A pull request proposed on one named fork.
    pub fn single(response: impl Into<String>) -> Self {
        Self::Single(SingleSync::new(response.into(), false))
    }

    /// A pull request proposed through an intermediate mirror.
    pub fn mirrored(response: impl Into<String>) -> Self {
        Self::Single(SingleSync::new(response.into(), true))
    }

    /// Aggregate per-fork outcomes, kept in input order.
    pub fn fan_out(outcomes: Vec<ForkOutcome>) -> Self {
        let total = outcomes.len();
        let successes = outcomes.iter().filter(|o| o.is_ok()).count();
        let errors = outcomes.into_iter().filter(|o| !o.is_ok()).collect();

        Self::Many(FanOutSync {
            many: true,
            metrics: FanOutMetrics { total, successes },
            errors,
            is_enabled: true,
        })
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }
}
