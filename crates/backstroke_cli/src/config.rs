//! Configuration file support for backstroke.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `BACKSTROKE_`, sections separated
//!    by `__`, e.g., `BACKSTROKE_WORKER__POLL_INTERVAL_MS`)
//! 3. Config file (./backstroke.toml, then ~/.config/backstroke/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/backstroke/backstroke.db` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "postgres://localhost/backstroke"
//!
//! [github]
//! token = "ghp_..."  # bot token, or use BACKSTROKE_GITHUB__TOKEN
//! bot_username = "backstroke-bot"
//!
//! [worker]
//! poll_interval_ms = 5000
//! throttle_ms = 0
//! fanout_concurrency = 20
//! opt_out = "fan-out"
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use backstroke::{QuotaGate, SqlStatusStore};
use backstroke::sync::{
    DEFAULT_BOT_USERNAME, DEFAULT_FANOUT_CONCURRENCY, DEFAULT_GIT_HOST, DEFAULT_OPT_OUT_LABEL,
    EngineConfig, OptOutPolicy,
};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use sea_orm::DatabaseConnection;
use serde::Deserialize;

const DEFAULT_HANDLED_BY: &str = "backstroke-worker";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub worker: WorkerConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    /// Defaults to `sqlite://~/.local/state/backstroke/backstroke.db` if not specified.
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Token of the bot account. Used for pull requests, forking and pushes.
    pub token: Option<String>,
    /// Login of the bot account.
    pub bot_username: String,
    /// Base URL for git clone and push.
    pub git_host: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            bot_username: DEFAULT_BOT_USERNAME.to_string(),
            git_host: DEFAULT_GIT_HOST.to_string(),
        }
    }
}

/// Worker loop options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Pause between drain passes when running continuously.
    pub poll_interval_ms: u64,
    /// Delay before each operation's first network call.
    pub throttle_ms: u64,
    /// Whether to wait for API quota before calls.
    pub check_quota: bool,
    pub quota_poll_ms: u64,
    pub status_ttl_secs: u64,
    /// Host tag stored in finished status records.
    pub handled_by: Option<String>,
    pub fanout_concurrency: usize,
    /// Optional pull requests per second during fan-out.
    pub fanout_rps: Option<u32>,
    pub opt_out: OptOutPolicy,
    pub opt_out_label: String,
    /// Log writes instead of performing them.
    pub dry_run: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            throttle_ms: 0,
            check_quota: true,
            quota_poll_ms: 1000,
            status_ttl_secs: 24 * 60 * 60,
            handled_by: None,
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
            fanout_rps: None,
            opt_out: OptOutPolicy::default(),
            opt_out_label: DEFAULT_OPT_OUT_LABEL.to_string(),
            dry_run: false,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/backstroke/config.toml)
    /// 3. Local config file (./backstroke.toml)
    /// 4. Environment variables with BACKSTROKE_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("backstroke.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./backstroke.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // BACKSTROKE_WORKER__POLL_INTERVAL_MS -> worker.poll_interval_ms
        builder = builder.add_source(
            Environment::with_prefix("BACKSTROKE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter enables read-write access and creates the file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("backstroke.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn github_token(&self) -> Option<String> {
        self.github.token.clone().filter(|t| !t.is_empty())
    }

    /// Host tag for status records: configured value, else `$HOSTNAME`.
    pub fn handled_by(&self) -> String {
        self.worker
            .handled_by
            .clone()
            .or_else(|| std::env::var("HOSTNAME").ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HANDLED_BY.to_string())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker.poll_interval_ms)
    }

    pub fn status_ttl(&self) -> Duration {
        Duration::from_secs(self.worker.status_ttl_secs)
    }

    /// Status store whose link history lives as long as the status records.
    pub fn status_store(&self, db: Arc<DatabaseConnection>) -> SqlStatusStore {
        SqlStatusStore::with_retention(db, self.status_ttl())
    }

    pub fn quota_gate(&self) -> QuotaGate {
        if self.worker.check_quota {
            QuotaGate::new(Duration::from_millis(self.worker.quota_poll_ms))
        } else {
            QuotaGate::disabled()
        }
    }

    /// Settings handed to the sync engine.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            bot_username: self.github.bot_username.clone(),
            git_host: self.github.git_host.clone(),
            throttle: Duration::from_millis(self.worker.throttle_ms),
            fanout_concurrency: self.worker.fanout_concurrency,
            fanout_rps: self.worker.fanout_rps,
            opt_out: self.worker.opt_out,
            opt_out_label: self.worker.opt_out_label.clone(),
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "backstroke").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/backstroke` or `~/.local/state/backstroke`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "backstroke").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml_content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database.url.is_none());
        assert!(config.github.token.is_none());
        assert_eq!(config.github.bot_username, "backstroke-bot");
        assert_eq!(config.github.git_host, "https://github.com");
        assert_eq!(config.worker.poll_interval_ms, 5000);
        assert_eq!(config.worker.throttle_ms, 0);
        assert!(config.worker.check_quota);
        assert_eq!(config.worker.status_ttl_secs, 86400);
        assert_eq!(config.worker.fanout_concurrency, 20);
        assert_eq!(config.worker.opt_out, OptOutPolicy::FanOut);
        assert!(!config.worker.dry_run);
    }

    #[test]
    fn test_config_builder_with_toml_string() {
        let config = from_toml(
            r#"
            [database]
            url = "sqlite:///tmp/test.db"

            [github]
            token = "ghp_test123"
            bot_username = "sync-bot"

            [worker]
            poll_interval_ms = 1000
            throttle_ms = 250
            fanout_rps = 5
            opt_out = "always"
            dry_run = true
        "#,
        );

        assert_eq!(
            config.database.url,
            Some("sqlite:///tmp/test.db".to_string())
        );
        assert_eq!(config.github_token(), Some("ghp_test123".to_string()));
        assert_eq!(config.github.bot_username, "sync-bot");
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.worker.fanout_rps, Some(5));
        assert_eq!(config.worker.opt_out, OptOutPolicy::Always);
        assert!(config.worker.dry_run);
    }

    #[test]
    fn test_config_builder_partial_override() {
        let config = from_toml(
            r#"
            [worker]
            throttle_ms = 100
        "#,
        );

        assert_eq!(config.worker.throttle_ms, 100);
        assert_eq!(config.worker.poll_interval_ms, 5000);
        assert_eq!(config.github.git_host, "https://github.com");
    }

    #[test]
    fn test_engine_config_maps_worker_and_github_sections() {
        let config = from_toml(
            r#"
            [github]
            bot_username = "sync-bot"
            git_host = "https://git.example.com"

            [worker]
            throttle_ms = 1500
            fanout_concurrency = 4
            opt_out = "disabled"
            opt_out_label = "no-sync"
        "#,
        );

        let engine = config.engine_config();
        assert_eq!(engine.bot_username, "sync-bot");
        assert_eq!(engine.git_host, "https://git.example.com");
        assert_eq!(engine.throttle, Duration::from_millis(1500));
        assert_eq!(engine.fanout_concurrency, 4);
        assert_eq!(engine.opt_out, OptOutPolicy::Disabled);
        assert_eq!(engine.opt_out_label, "no-sync");
    }

    #[test]
    fn test_quota_gate_follows_check_quota() {
        assert!(Config::default().quota_gate().is_enabled());
        let config = from_toml("[worker]\ncheck_quota = false\n");
        assert!(!config.quota_gate().is_enabled());
    }

    #[test]
    fn test_configured_handled_by_wins() {
        let config = from_toml("[worker]\nhandled_by = \"worker-7\"\n");
        assert_eq!(config.handled_by(), "worker-7");
    }

    #[test]
    fn test_empty_token_is_unset() {
        let config = from_toml("[github]\ntoken = \"\"\n");
        assert!(config.github_token().is_none());
    }

    #[test]
    fn test_database_url_defaults_to_state_dir() {
        let url = Config::default().database_url().unwrap();
        assert!(url.starts_with("sqlite://"));
        assert!(url.contains("backstroke.db"));
        assert!(url.ends_with("?mode=rwc"));
    }

    #[test]
    fn test_config_merging_order() {
        let settings = ConfigBuilder::builder()
            .add_source(config::File::from_str(
                "[worker]\nthrottle_ms = 10\nfanout_concurrency = 3\n",
                FileFormat::Toml,
            ))
            .add_source(config::File::from_str(
                "[worker]\nthrottle_ms = 20\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: Config = settings.try_deserialize().unwrap();
        assert_eq!(config.worker.throttle_ms, 20);
        assert_eq!(config.worker.fanout_concurrency, 3);
    }

    #[test]
    fn test_invalid_opt_out_policy_is_rejected() {
        let result = ConfigBuilder::builder()
            .add_source(config::File::from_str(
                "[worker]\nopt_out = \"sometimes\"\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize::<Config>();

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn status_store_retention_follows_status_ttl() {
        let config = from_toml(
            r#"
            [worker]
            status_ttl_secs = 3600
            "#,
        );
        let db = backstroke::connect_and_migrate("sqlite::memory:")
            .await
            .expect("in-memory database");

        let store = config.status_store(Arc::new(db));
        assert_eq!(store.retention(), Duration::from_secs(3600));
    }
}
