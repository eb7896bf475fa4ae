//! Link sync strategies.
//!
//! # Module Structure
//!
//! - [`types`] - `SyncResult`, per-fork outcomes, `EngineConfig`
//! - [`engine`] - `SyncEngine`, the three strategies
//! - `pull_request` - pull request text and response interpretation
//!
//! # Example
//!
//! ```ignore
//! use backstroke::sync::{EngineConfig, SyncEngine};
//! use backstroke::platform::QuotaGate;
//!
//! let engine = SyncEngine::new(client, mirror, QuotaGate::default(), EngineConfig::default());
//! let result = engine.execute(&link, &user).await?;
//! ```

pub mod engine;
mod error;
mod pull_request;
pub mod types;

pub use engine::SyncEngine;
pub use error::SyncError;
pub use types::{
    DEFAULT_BOT_USERNAME, DEFAULT_FANOUT_CONCURRENCY, DEFAULT_GIT_HOST, DEFAULT_OPT_OUT_LABEL,
    EngineConfig, FanOutMetrics, FanOutSync, ForkOutcome, OptOutPolicy, SingleSync, SyncResult,
};
