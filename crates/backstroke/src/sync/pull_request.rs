//! Building pull requests and interpreting the platform's answer.

use crate::link::RepoRef;
use crate::platform::{CreatedPullRequest, HostingError, PullRequestSpec};

use super::error::SyncError;

const NO_COMMITS_PREFIX: &str = "No commits between";
const ALREADY_EXISTS_PREFIX: &str = "A pull request already exists for";

pub(crate) const UP_TO_DATE: &str = "The upstream and fork are already up to date.";
pub(crate) const ALREADY_OPEN: &str = "A Backstroke pull request is already open on the fork.";

/// Where the proposed changes come from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Source<'a> {
    /// Directly from the upstream branch.
    Upstream,
    /// From a branch of a bot-owned intermediate repository.
    Mirror {
        owner: &'a str,
        repo: &'a str,
        branch: &'a str,
        git_host: &'a str,
    },
}

pub(crate) fn title(upstream: &RepoRef) -> String {
    format!(
        "Update from upstream repo {}/{}@{}",
        upstream.owner, upstream.repo, upstream.branch
    )
}

fn body(upstream: &RepoRef, source: Source<'_>) -> String {
    let mut body = format!(
        "Hello!\n\nThe upstream repository `{upstream}` has some new changes that aren't in this \
         repository. So, here they are, ready to be merged! :tada:\n\n"
    );

    if let Source::Mirror {
        owner,
        repo,
        branch,
        git_host,
    } = source
    {
        body.push_str(&format!(
            "Since this repository isn't in the same network as the upstream, the upstream's \
             contents were copied into the `{branch}` branch of a [temporary repository]\
             ({}/{owner}/{repo}/tree/{branch}) so they can be proposed here.\n\n",
            git_host.trim_end_matches('/')
        ));
    }

    body.push_str(
        "If this pull request can be merged without conflict, you can publish your software \
         with these new changes. Otherwise, fix any merge conflicts by clicking the \
         `Resolve Conflicts` button.\n\n--------\nCreated by [Backstroke](https://backstroke.co) \
         (I'm a bot!)\n",
    );
    body
}

/// The pull request that brings `upstream` into `target`.
pub(crate) fn build(upstream: &RepoRef, target: &RepoRef, source: Source<'_>) -> PullRequestSpec {
    let head = match source {
        Source::Upstream => format!("{}:{}", upstream.owner, upstream.branch),
        Source::Mirror { owner, branch, .. } => format!("{owner}:{branch}"),
    };

    PullRequestSpec {
        owner: target.owner.clone(),
        repo: target.repo.clone(),
        title: title(upstream),
        head,
        base: target.branch.clone(),
        body: body(upstream, source),
        maintainer_can_modify: false,
    }
}

/// Map the platform's answer to a human-readable result.
///
/// Conflicts (nothing to merge, or a pull request already open) are not
/// failures; they come back as informational messages.
pub(crate) fn interpret(
    result: Result<CreatedPullRequest, HostingError>,
    target: &RepoRef,
) -> Result<String, SyncError> {
    let err = match result {
        Ok(_) => {
            return Ok(format!(
                "Successfully created pull request on {}",
                target.full_name()
            ));
        }
        Err(err) => err,
    };

    match err {
        HostingError::Conflict { message: None } => Ok(format!(
            "There's already a pull request on {}",
            target.full_name()
        )),
        HostingError::Conflict {
            message: Some(message),
        } => Ok(conflict_message(message)),
        HostingError::NotFound { .. } => Err(SyncError::RepositoryNotFound {
            owner: target.owner.clone(),
            repo: target.repo.clone(),
        }),
        HostingError::Server { status, .. } => Err(SyncError::PullRequest {
            owner: target.owner.clone(),
            repo: target.repo.clone(),
            message: format!(
                "Couldn't create pull request on repository {}: A Github api call returned a \
                 500-class status code ({status}). Please try again.",
                target.full_name()
            ),
            source: err,
        }),
        other => Err(SyncError::PullRequest {
            owner: target.owner.clone(),
            repo: target.repo.clone(),
            message: format!(
                "Couldn't create pull request on repository {}: {}",
                target.full_name(),
                other.detail()
            ),
            source: other,
        }),
    }
}

fn conflict_message(message: String) -> String {
    if message.starts_with(NO_COMMITS_PREFIX) {
        UP_TO_DATE.to_string()
    } else if message.starts_with(ALREADY_EXISTS_PREFIX) {
        ALREADY_OPEN.to_string()
    } else {
        message
    }
}
