//! Link and operation payload types.
//!
//! Links are configured elsewhere and arrive inside queued payloads as JSON.
//! Field names follow the producer's camelCase wire format; unknown fields
//! are preserved in `extra` so a status record echoes the link unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Identifier of a link. Producers send either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkId {
    Number(i64),
    Text(String),
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkId::Number(n) => write!(f, "{n}"),
            LinkId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for LinkId {
    fn from(value: i64) -> Self {
        LinkId::Number(value)
    }
}

impl From<&str> for LinkId {
    fn from(value: &str) -> Self {
        LinkId::Text(value.to_string())
    }
}

/// A hosting-platform user whose token authenticates calls made on their behalf.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Create a user carrying only a token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// The user's token, if one was supplied.
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .finish_non_exhaustive()
    }
}

/// The `forkType` selector of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForkType {
    /// `repo`: a single named fork.
    Direct,
    /// `fork-all`: every fork of the upstream.
    FanOut,
    /// `unrelated-repo`: a repository outside the upstream's fork network,
    /// reached through a bot-owned mirror.
    UnrelatedMirror,
}

impl ForkType {
    pub fn as_str(self) -> &'static str {
        match self {
            ForkType::Direct => "repo",
            ForkType::FanOut => "fork-all",
            ForkType::UnrelatedMirror => "unrelated-repo",
        }
    }
}

impl fmt::Display for ForkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a `forkType` string names no known strategy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No such 'fork' type: {0}")]
pub struct UnknownForkType(pub String);

impl FromStr for ForkType {
    type Err = UnknownForkType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "repo" => Ok(ForkType::Direct),
            "fork-all" => Ok(ForkType::FanOut),
            "unrelated-repo" => Ok(ForkType::UnrelatedMirror),
            other => Err(UnknownForkType(other.to_string())),
        }
    }
}

/// Owner/name coordinates of a repository plus the branch of interest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl RepoRef {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
        }
    }

    /// `owner/repo`.
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.repo, self.branch)
    }
}

/// A configured upstream to fork sync relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: LinkId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub upstream_type: Option<String>,
    #[serde(default)]
    pub upstream_owner: Option<String>,
    #[serde(default)]
    pub upstream_repo: Option<String>,
    #[serde(default)]
    pub upstream_branch: Option<String>,

    #[serde(default)]
    pub fork_type: Option<String>,
    #[serde(default)]
    pub fork_owner: Option<String>,
    #[serde(default)]
    pub fork_repo: Option<String>,
    #[serde(default)]
    pub fork_branch: Option<String>,

    /// The user that owns the link. Dropped before a link is stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<User>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Link {
    /// Whether both sides of the link declare a type.
    pub fn is_configured(&self) -> bool {
        self.upstream_type.as_deref().is_some_and(|t| !t.is_empty())
            && self.fork_type.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// The upstream coordinates, with an empty branch when unset.
    pub fn upstream(&self) -> RepoRef {
        RepoRef::new(
            self.upstream_owner.clone().unwrap_or_default(),
            self.upstream_repo.clone().unwrap_or_default(),
            self.upstream_branch.clone().unwrap_or_default(),
        )
    }

    /// The fork coordinates. An unset fork branch falls back to the upstream branch.
    pub fn fork(&self) -> RepoRef {
        let branch = self
            .fork_branch
            .clone()
            .filter(|b| !b.is_empty())
            .or_else(|| self.upstream_branch.clone())
            .unwrap_or_default();
        RepoRef::new(
            self.fork_owner.clone().unwrap_or_default(),
            self.fork_repo.clone().unwrap_or_default(),
            branch,
        )
    }

    /// A copy of the link with the owning user's credentials removed.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            owner: None,
            ..self.clone()
        }
    }
}

/// The JSON body of a queued operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationPayload {
    /// Producer-defined trigger kind (`MANUAL`, `WEBHOOK`, ...).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub user: Option<User>,

    pub link: Link,

    /// Correlation id of the request that produced this operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_request: Option<String>,
}

impl OperationPayload {
    /// The user whose token drives the sync: the payload user, else the link owner.
    pub fn acting_user(&self) -> Option<&User> {
        self.user.as_ref().or(self.link.owner.as_ref())
    }
}

/// One popped unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub id: Uuid,
    pub payload: OperationPayload,
}

impl Operation {
    /// Decode a raw queued payload.
    pub fn decode(id: Uuid, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id,
            payload: serde_json::from_value(payload)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn link_json() -> Value {
        json!({
            "id": 8,
            "name": "My Link",
            "enabled": true,
            "webhookId": "37948270678a440a97db01ebe71ddda2",
            "upstreamType": "repo",
            "upstreamOwner": "1egoman",
            "upstreamRepo": "backstroke",
            "upstreamBranch": "master",
            "forkType": "repo",
            "forkOwner": "rgaus",
            "forkRepo": "backstroke",
            "forkBranch": "master",
            "owner": {"id": 1, "username": "1egoman", "accessToken": "secret"}
        })
    }

    #[test]
    fn link_deserializes_camel_case_and_keeps_unknown_fields() {
        let link: Link = serde_json::from_value(link_json()).unwrap();
        assert_eq!(link.id, LinkId::Number(8));
        assert_eq!(link.fork_owner.as_deref(), Some("rgaus"));
        assert_eq!(
            link.extra.get("webhookId"),
            Some(&json!("37948270678a440a97db01ebe71ddda2"))
        );
        assert_eq!(
            link.owner.as_ref().and_then(User::token),
            Some("secret")
        );
    }

    #[test]
    fn link_id_accepts_strings() {
        let mut value = link_json();
        value["id"] = json!("abc");
        let link: Link = serde_json::from_value(value).unwrap();
        assert_eq!(link.id.to_string(), "abc");
    }

    #[test]
    fn redacted_link_drops_owner() {
        let link: Link = serde_json::from_value(link_json()).unwrap();
        let redacted = serde_json::to_value(link.redacted()).unwrap();
        assert!(redacted.get("owner").is_none());
        assert_eq!(redacted["webhookId"], link_json()["webhookId"]);
    }

    #[test]
    fn fork_branch_falls_back_to_upstream_branch() {
        let mut link: Link = serde_json::from_value(link_json()).unwrap();
        link.fork_branch = None;
        assert_eq!(link.fork().branch, "master");
        link.fork_branch = Some(String::new());
        assert_eq!(link.fork().branch, "master");
    }

    #[test]
    fn is_configured_requires_both_types() {
        let mut link: Link = serde_json::from_value(link_json()).unwrap();
        assert!(link.is_configured());
        link.upstream_type = None;
        assert!(!link.is_configured());
        link.upstream_type = Some("repo".into());
        link.fork_type = Some(String::new());
        assert!(!link.is_configured());
    }

    #[test]
    fn fork_type_parses_known_values() {
        assert_eq!("repo".parse::<ForkType>(), Ok(ForkType::Direct));
        assert_eq!("fork-all".parse::<ForkType>(), Ok(ForkType::FanOut));
        assert_eq!(
            "unrelated-repo".parse::<ForkType>(),
            Ok(ForkType::UnrelatedMirror)
        );
        let err = "bogus".parse::<ForkType>().unwrap_err();
        assert_eq!(err.to_string(), "No such 'fork' type: bogus");
    }

    #[test]
    fn user_debug_hides_token() {
        let user = User::with_token("hunter2");
        let debug = format!("{user:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn payload_reads_type_and_correlation_id() {
        let payload: OperationPayload = serde_json::from_value(json!({
            "type": "MANUAL",
            "user": {"accessToken": "t"},
            "link": link_json(),
            "fromRequest": "req-1"
        }))
        .unwrap();
        assert_eq!(payload.kind.as_deref(), Some("MANUAL"));
        assert_eq!(payload.from_request.as_deref(), Some("req-1"));
        assert_eq!(payload.acting_user().and_then(User::token), Some("t"));
    }

    #[test]
    fn acting_user_falls_back_to_link_owner() {
        let payload: OperationPayload =
            serde_json::from_value(json!({"type": "MANUAL", "link": link_json()})).unwrap();
        assert_eq!(payload.acting_user().and_then(User::token), Some("secret"));
    }

    #[test]
    fn repo_ref_formats() {
        let r = RepoRef::new("rgaus", "backstroke", "master");
        assert_eq!(r.full_name(), "rgaus/backstroke");
        assert_eq!(r.to_string(), "rgaus/backstroke@master");
    }
}
