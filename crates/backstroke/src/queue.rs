//! Durable FIFO of pending operations.
//!
//! Popping removes the row, so delivery is at most once: an operation whose
//! worker dies mid-sync is not retried.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveValue::NotSet, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set,
    TransactionTrait,
};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::entity::queued_operation::{ActiveModel, Column, Entity as QueuedOperation};
use crate::error::Result;
use crate::link::OperationPayload;

/// An operation as it sits in the queue, payload still undecoded.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedItem {
    pub id: Uuid,
    pub payload: Value,
}

/// Push/pop access to the operation queue.
#[async_trait]
pub trait OperationQueue: Send + Sync {
    /// Append a payload, returning the new operation's id.
    async fn push(&self, payload: Value) -> Result<Uuid>;

    /// Remove and return the oldest operation, or `None` when empty.
    async fn pop(&self) -> Result<Option<QueuedItem>>;

    /// Number of operations waiting.
    async fn len(&self) -> Result<u64>;

    /// Append a typed payload.
    async fn push_payload(&self, payload: &OperationPayload) -> Result<Uuid> {
        self.push(serde_json::to_value(payload)?).await
    }
}

/// `OperationQueue` stored in the `operation_queue` table.
#[derive(Clone)]
pub struct SqlQueue {
    db: Arc<DatabaseConnection>,
}

impl SqlQueue {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OperationQueue for SqlQueue {
    async fn push(&self, payload: Value) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let model = ActiveModel {
            seq: NotSet,
            id: Set(id),
            payload: Set(payload),
            enqueued_at: Set(Utc::now().fixed_offset()),
        };

        QueuedOperation::insert(model).exec(self.db.as_ref()).await?;
        debug!(operation_id = %id, "operation enqueued");
        Ok(id)
    }

    async fn pop(&self) -> Result<Option<QueuedItem>> {
        loop {
            let txn = self.db.begin().await?;

            let Some(next) = QueuedOperation::find()
                .order_by_asc(Column::Seq)
                .one(&txn)
                .await?
            else {
                txn.commit().await?;
                return Ok(None);
            };

            let deleted = QueuedOperation::delete_by_id(next.seq).exec(&txn).await?;
            txn.commit().await?;

            // Another consumer took it between select and delete; try the next one.
            if deleted.rows_affected == 0 {
                continue;
            }

            return Ok(Some(QueuedItem {
                id: next.id,
                payload: next.payload,
            }));
        }
    }

    async fn len(&self) -> Result<u64> {
        Ok(QueuedOperation::find().count(self.db.as_ref()).await?)
    }
}
