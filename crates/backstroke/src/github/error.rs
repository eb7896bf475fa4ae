//! GitHub API error types.

use thiserror::Error;

use crate::platform::HostingError;

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No access token available for {0}")]
    MissingToken(&'static str),

    #[error("Unexpected HTTP status {status} from {route}: {body}")]
    Status {
        status: u16,
        route: String,
        body: String,
    },
}

/// The human-readable part of a GitHub error body.
///
/// GitHub answers errors with `{"message": "...", ...}`; anything else is
/// returned unchanged.
pub fn body_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

fn classify_octocrab(err: &octocrab::Error) -> HostingError {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            let status = source.status_code.as_u16();
            if status == 422 {
                let message = source.errors.as_ref().and_then(|errors| {
                    errors
                        .iter()
                        .find_map(|e| e.get("message").and_then(|m| m.as_str()))
                        .map(String::from)
                });
                return HostingError::conflict(message);
            }
            HostingError::from_status(status, source.message.clone())
        }
        octocrab::Error::Json { .. } => HostingError::api(err.to_string()),
        _ => HostingError::network(err.to_string()),
    }
}

impl From<GitHubError> for HostingError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Api(e) => classify_octocrab(&e),
            GitHubError::Http(e) if e.is_decode() => HostingError::api(e.to_string()),
            GitHubError::Http(e) => HostingError::network(e.to_string()),
            GitHubError::MissingToken(what) => {
                HostingError::auth(format!("no access token available for {what}"))
            }
            GitHubError::Status { status, body, .. } if status == 422 => {
                HostingError::from_status(status, body)
            }
            GitHubError::Status { status, body, .. } => {
                HostingError::from_status(status, body_message(&body))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, body: &str) -> HostingError {
        GitHubError::Status {
            status,
            route: "/repos/o/r".into(),
            body: body.into(),
        }
        .into()
    }

    #[test]
    fn status_errors_use_body_message() {
        assert_eq!(
            status(404, r#"{"message":"Not Found"}"#),
            HostingError::not_found("Not Found")
        );
        assert_eq!(
            status(502, "<html>bad gateway</html>"),
            HostingError::server(502, "<html>bad gateway</html>")
        );
    }

    #[test]
    fn unprocessable_status_reads_validation_errors() {
        let body = r#"{"message":"Validation Failed","errors":[{"message":"A pull request already exists for rgaus:master."}]}"#;
        assert_eq!(
            status(422, body),
            HostingError::conflict(Some("A pull request already exists for rgaus:master.".into()))
        );
    }

    #[test]
    fn missing_token_is_an_auth_failure() {
        let err: HostingError = GitHubError::MissingToken("fork listing").into();
        assert!(matches!(err, HostingError::Auth { .. }));
    }

    #[test]
    fn body_message_falls_back_to_raw_body() {
        assert_eq!(body_message(r#"{"message":"Bad credentials"}"#), "Bad credentials");
        assert_eq!(body_message("plain"), "plain");
    }
}
