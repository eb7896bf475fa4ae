//! Platform-agnostic seam for source-control hosting APIs.
//!
//! The sync engine only talks to a [`HostingClient`]; the GitHub adapter in
//! [`crate::github`] is the shipped implementation. This module also holds
//! the helpers built on top of the trait: the quota gate, the pagination
//! driver, proactive pacing, and the dry-run decorator.
//!
//! # Example
//!
//! ```ignore
//! use backstroke::platform::{HostingClient, QuotaGate, paginate, DEFAULT_PAGE_SIZE};
//!
//! async fn all_forks<C: HostingClient>(client: &C, user: &User) -> Result<Vec<ForkCandidate>, HostingError> {
//!     QuotaGate::default().wait(client).await?;
//!     paginate(|p| client.list_forks(user, "rust-lang", "rust", p.page, p.per_page), DEFAULT_PAGE_SIZE).await
//! }
//! ```

mod dry_run;
mod errors;
mod pagination;
mod quota;
mod rate_limit;
mod types;

pub use dry_run::DryRunClient;
pub use errors::{HostingError, Result, first_validation_message};
pub use pagination::{DEFAULT_PAGE_SIZE, PageRequest, paginate};
pub use quota::QuotaGate;
pub use rate_limit::ApiRateLimiter;
pub use types::{CreatedPullRequest, ForkCandidate, ForkedRepository, HostingClient, PullRequestSpec};
