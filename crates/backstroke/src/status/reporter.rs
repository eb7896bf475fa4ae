use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::entity::operation_state::OperationState;
use crate::error::Result;
use crate::link::{Link, LinkId};

use super::record::OperationStatus;
use super::store::{DEFAULT_RETENTION, StatusStore};

/// Writes the lifecycle transitions of one operation to a [`StatusStore`].
#[derive(Clone)]
pub struct StatusReporter {
    store: Arc<dyn StatusStore>,
    ttl: Duration,
    handled_by: Option<String>,
}

impl StatusReporter {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self {
            store,
            ttl: DEFAULT_RETENTION,
            handled_by: None,
        }
    }

    /// Expiry applied on every write.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Host tag echoed into finished records.
    #[must_use]
    pub fn with_handled_by(mut self, handled_by: impl Into<String>) -> Self {
        self.handled_by = Some(handled_by.into());
        self
    }

    pub fn store(&self) -> &Arc<dyn StatusStore> {
        &self.store
    }

    /// Mark `id` RUNNING and return the record to finish later.
    pub async fn running(&self, id: Uuid, from_request: Option<String>) -> Result<OperationStatus> {
        let record = OperationStatus {
            from_request,
            ..OperationStatus::running(Utc::now())
        };
        self.store.set(id, &record, self.ttl).await?;
        Ok(record)
    }

    pub async fn attach(&self, link_id: &LinkId, id: Uuid) -> Result<()> {
        self.store.attach_to_link(link_id, id).await
    }

    /// Finish with OK, storing the strategy result.
    pub async fn ok(
        &self,
        id: Uuid,
        started: OperationStatus,
        link: &Link,
        output: Value,
    ) -> Result<OperationStatus> {
        self.finish(id, started, OperationState::Ok, Some(link), output)
            .await
    }

    /// Finish with ERROR. `link` is `None` when the payload could not be decoded.
    pub async fn error(
        &self,
        id: Uuid,
        started: OperationStatus,
        link: Option<&Link>,
        message: &str,
        stack: &str,
    ) -> Result<OperationStatus> {
        let output = json!({ "error": message, "stack": stack });
        self.finish(id, started, OperationState::Error, link, output)
            .await
    }

    async fn finish(
        &self,
        id: Uuid,
        started: OperationStatus,
        status: OperationState,
        link: Option<&Link>,
        output: Value,
    ) -> Result<OperationStatus> {
        let mut record = started.finish(status, output, Utc::now());
        // Credentials never leave the operation.
        record.link = link.map(Link::redacted);
        record.handled_by = self.handled_by.clone();

        self.store.set(id, &record, self.ttl).await?;
        Ok(record)
    }
}
