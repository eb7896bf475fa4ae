use thiserror::Error;

use crate::link::UnknownForkType;
use crate::mirror::MirrorError;
use crate::platform::HostingError;

/// Why a link sync could not be carried out.
///
/// Display strings are what ends up in the `output.error` of an ERROR
/// status record, so they are written for the link's owner.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Link is not enabled.")]
    LinkDisabled,

    #[error("Please define both an upstream and fork on this link.")]
    LinkMisconfigured,

    #[error(transparent)]
    UnknownForkType(#[from] UnknownForkType),

    #[error("Repository {owner}/{repo} doesn't exist.")]
    RepositoryNotFound { owner: String, repo: String },

    #[error("This repo opted out of backstroke pull requests")]
    OptedOut { owner: String, repo: String },

    /// Pull request creation failed for a reason other than a conflict.
    #[error("{message}")]
    PullRequest {
        owner: String,
        repo: String,
        message: String,
        #[source]
        source: HostingError,
    },

    /// Any other hosting call failed.
    #[error("{}: {}", .context, .source.detail())]
    Hosting {
        context: String,
        #[source]
        source: HostingError,
    },

    #[error("{context}: {source}")]
    Mirror {
        context: String,
        #[source]
        source: MirrorError,
    },

    #[error("Couldn't fetch token rate limit: {}", .0.detail())]
    Quota(#[source] HostingError),
}

impl SyncError {
    pub(crate) fn hosting(context: impl Into<String>, source: HostingError) -> Self {
        Self::Hosting {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn mirror(context: impl Into<String>, source: impl Into<MirrorError>) -> Self {
        Self::Mirror {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Whether the error stems from the link's own configuration rather
    /// than from the hosting platform.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::LinkDisabled | Self::LinkMisconfigured | Self::UnknownForkType(_)
        )
    }
}
