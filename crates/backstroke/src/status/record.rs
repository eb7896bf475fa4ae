use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::operation_state::OperationState;
use crate::link::Link;

/// The status record kept for each operation.
///
/// Written once as RUNNING when the operation is popped, then overwritten
/// once with OK or ERROR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    pub status: OperationState,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Strategy result on OK, `{error, stack}` on ERROR.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    /// The link, with its owner's credentials removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,

    /// Tag of the worker host that handled the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handled_by: Option<String>,

    /// Correlation id forwarded from the producing request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_request: Option<String>,
}

impl OperationStatus {
    /// A fresh RUNNING record.
    pub fn running(started_at: DateTime<Utc>) -> Self {
        Self {
            status: OperationState::Running,
            started_at,
            finished_at: None,
            output: None,
            link: None,
            handled_by: None,
            from_request: None,
        }
    }

    /// Transition into a terminal state, stamping the finish time.
    #[must_use]
    pub fn finish(self, status: OperationState, output: Value, finished_at: DateTime<Utc>) -> Self {
        Self {
            status,
            finished_at: Some(finished_at),
            output: Some(output),
            ..self
        }
    }

    /// Time spent between start and finish, if finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}
