//! Backstroke - keeps forks in sync with their upstream.
//!
//! A worker pops queued link operations, proposes pull requests that carry
//! upstream changes into forks, and records the outcome of every operation
//! so producers can poll for it.
//!
//! # Features
//!
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to automatically run migrations on connection.
//! - `github` - The GitHub [`platform::HostingClient`] implementation.
//! - `git` - The libgit2 [`mirror::GitMirror`] implementation used for
//!   out-of-network forks.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use backstroke::{connect_and_migrate, OperationWorker, SqlQueue, SqlStatusStore, StatusReporter};
//!
//! let db = Arc::new(connect_and_migrate("sqlite://backstroke.db?mode=rwc").await?);
//! let reporter = StatusReporter::new(Arc::new(SqlStatusStore::new(db.clone())));
//! let worker = OperationWorker::new(Arc::new(SqlQueue::new(db)), reporter, engine);
//!
//! let summary = worker.run().await?;
//! ```

pub mod db;
pub mod entity;
pub mod error;
pub mod link;
pub mod mirror;
pub mod platform;
pub mod queue;
pub mod status;
pub mod sync;
pub mod worker;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use error::StoreError;
pub use link::{ForkType, Link, LinkId, Operation, OperationPayload, RepoRef, User};
pub use mirror::{DryRunMirror, GitMirror, MirrorError};
#[cfg(feature = "git")]
pub use mirror::Git2Mirror;
pub use platform::{DryRunClient, HostingClient, HostingError, QuotaGate};
pub use queue::{OperationQueue, QueuedItem, SqlQueue};
pub use status::{OperationStatus, SqlStatusStore, StatusReporter, StatusStore};
pub use sync::{EngineConfig, OptOutPolicy, SyncEngine, SyncError, SyncResult};
pub use worker::{DrainSummary, OperationWorker, ProcessedOperation, WorkerError};
