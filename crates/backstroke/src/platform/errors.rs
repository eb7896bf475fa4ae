use thiserror::Error;

/// Errors returned by a hosting platform, classified by what the caller
/// can do about them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostingError {
    /// The request was rejected as unprocessable (HTTP 422), typically a
    /// duplicate pull request or nothing to merge.
    #[error("Validation failed: {}", message.as_deref().unwrap_or("unprocessable entity"))]
    Conflict { message: Option<String> },

    /// Resource not found (repo, label, etc.).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// The platform answered with a 5xx status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Authentication required or failed.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// Network or connection error.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Any other API error.
    #[error("{message}")]
    Api { message: String },
}

impl HostingError {
    /// Create a conflict error.
    #[inline]
    pub fn conflict(message: Option<String>) -> Self {
        Self::Conflict { message }
    }

    /// Create a not found error.
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a server error.
    #[inline]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Create an authentication error.
    #[inline]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a network error.
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an API error.
    #[inline]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Classify an HTTP failure by status code.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::auth(message),
            404 => Self::not_found(message),
            422 => Self::conflict(first_validation_message(&message)),
            500..=599 => Self::server(status, message),
            _ => Self::api(message),
        }
    }

    /// The platform's own message text without the classification prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Conflict { message } => message.clone().unwrap_or_default(),
            Self::NotFound { resource } => resource.clone(),
            Self::Server { message, .. }
            | Self::Auth { message }
            | Self::Network { message }
            | Self::Api { message } => message.clone(),
        }
    }

    /// [`message`](Self::message), or the full display when the platform
    /// sent no text.
    pub fn detail(&self) -> String {
        let message = self.message();
        if message.is_empty() {
            self.to_string()
        } else {
            message
        }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[inline]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Pull the first `errors[].message` out of a GitHub-style validation body.
///
/// Returns `None` when the body is not JSON or carries no such message.
pub fn first_validation_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("errors")?
        .as_array()?
        .iter()
        .find_map(|e| e.get("message").and_then(|m| m.as_str()))
        .map(String::from)
}

/// Result type for hosting platform operations.
pub type Result<T> = std::result::Result<T, HostingError>;
