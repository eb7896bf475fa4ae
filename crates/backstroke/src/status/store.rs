use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::debug;
use uuid::Uuid;

use crate::entity::link_operation::{
    ActiveModel as LinkOperationActiveModel, Column as LinkOperationColumn,
    Entity as LinkOperation,
};
use crate::entity::operation_counter::{
    ActiveModel as CounterActiveModel, Column as CounterColumn, Entity as OperationCounter, names,
};
use crate::entity::operation_state::OperationState;
use crate::entity::operation_status::{
    ActiveModel as StatusActiveModel, Column as StatusColumn, Entity as OperationStatusEntity,
};
use crate::error::Result;
use crate::link::LinkId;

use super::record::OperationStatus;

/// How long status records and link index entries are kept.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Keyed storage of operation status records plus a per-link index.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Write `record` for `id`, replacing any previous record and resetting its expiry.
    async fn set(&self, id: Uuid, record: &OperationStatus, ttl: Duration) -> Result<()>;

    /// Read the record for `id`, or `None` if absent or expired.
    async fn get(&self, id: Uuid) -> Result<Option<OperationStatus>>;

    /// Index `id` under `link_id`, pruning entries older than the retention window first.
    async fn attach_to_link(&self, link_id: &LinkId, id: Uuid) -> Result<()>;
}

/// One entry of a link's operation history.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkOperationEntry {
    pub operation_id: Uuid,
    pub attached_at: DateTime<Utc>,
    /// `None` once the status record has expired.
    pub status: Option<OperationStatus>,
}

/// Totals of finished operations since the store was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounters {
    pub successes: i64,
    pub errors: i64,
}

/// Rows removed by [`SqlStatusStore::purge_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub statuses: u64,
    pub link_entries: u64,
}

/// `StatusStore` over the `operation_status`, `link_operation` and
/// `operation_counter` tables.
#[derive(Clone)]
pub struct SqlStatusStore {
    db: Arc<DatabaseConnection>,
    retention: Duration,
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

impl SqlStatusStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self::with_retention(db, DEFAULT_RETENTION)
    }

    /// Use a custom link index retention window.
    pub fn with_retention(db: Arc<DatabaseConnection>, retention: Duration) -> Self {
        Self { db, retention }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    fn cutoff(&self, now: DateTime<Utc>) -> i64 {
        (now - to_chrono(self.retention)).timestamp()
    }

    /// [`StatusStore::attach_to_link`] with an explicit attach time.
    pub async fn attach_to_link_at(
        &self,
        link_id: &LinkId,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let link_key = link_id.to_string();
        let txn = self.db.begin().await?;

        let pruned = LinkOperation::delete_many()
            .filter(LinkOperationColumn::LinkId.eq(link_key.as_str()))
            .filter(LinkOperationColumn::Score.lte(self.cutoff(at)))
            .exec(&txn)
            .await?;

        let model = LinkOperationActiveModel {
            link_id: Set(link_key.clone()),
            operation_id: Set(id),
            score: Set(at.timestamp()),
        };
        LinkOperation::insert(model)
            .on_conflict(
                OnConflict::columns([LinkOperationColumn::LinkId, LinkOperationColumn::OperationId])
                    .update_column(LinkOperationColumn::Score)
                    .to_owned(),
            )
            .exec(&txn)
            .await?;

        txn.commit().await?;
        debug!(link_id = %link_key, operation_id = %id, pruned = pruned.rows_affected, "attached operation to link");
        Ok(())
    }

    /// Recent operations of a link, oldest first, with their current status.
    pub async fn list_for_link(&self, link_id: &LinkId) -> Result<Vec<LinkOperationEntry>> {
        let now = Utc::now();
        let entries = LinkOperation::find()
            .filter(LinkOperationColumn::LinkId.eq(link_id.to_string()))
            .filter(LinkOperationColumn::Score.gt(self.cutoff(now)))
            .order_by_asc(LinkOperationColumn::Score)
            .all(self.db.as_ref())
            .await?;

        let mut result = Vec::with_capacity(entries.len());
        for entry in entries {
            result.push(LinkOperationEntry {
                operation_id: entry.operation_id,
                attached_at: DateTime::from_timestamp(entry.score, 0).unwrap_or(now),
                status: self.get(entry.operation_id).await?,
            });
        }
        Ok(result)
    }

    /// Delete expired status records and stale link index entries.
    pub async fn purge_expired(&self) -> Result<PurgeStats> {
        let now = Utc::now();

        let statuses = OperationStatusEntity::delete_many()
            .filter(StatusColumn::ExpiresAt.lte(now.fixed_offset()))
            .exec(self.db.as_ref())
            .await?;
        let link_entries = LinkOperation::delete_many()
            .filter(LinkOperationColumn::Score.lte(self.cutoff(now)))
            .exec(self.db.as_ref())
            .await?;

        Ok(PurgeStats {
            statuses: statuses.rows_affected,
            link_entries: link_entries.rows_affected,
        })
    }

    /// Success and error totals.
    pub async fn counters(&self) -> Result<OperationCounters> {
        let rows = OperationCounter::find().all(self.db.as_ref()).await?;
        let mut counters = OperationCounters::default();
        for row in rows {
            match row.name.as_str() {
                names::SUCCESSES => counters.successes = row.value,
                names::ERRORS => counters.errors = row.value,
                _ => {}
            }
        }
        Ok(counters)
    }
}

#[async_trait]
impl StatusStore for SqlStatusStore {
    async fn set(&self, id: Uuid, record: &OperationStatus, ttl: Duration) -> Result<()> {
        let now = Utc::now();
        let model = StatusActiveModel {
            id: Set(id),
            status: Set(record.status),
            record: Set(serde_json::to_value(record)?),
            expires_at: Set((now + to_chrono(ttl)).fixed_offset()),
            updated_at: Set(now.fixed_offset()),
        };

        let txn = self.db.begin().await?;
        OperationStatusEntity::insert(model)
            .on_conflict(
                OnConflict::column(StatusColumn::Id)
                    .update_columns([
                        StatusColumn::Status,
                        StatusColumn::Record,
                        StatusColumn::ExpiresAt,
                        StatusColumn::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&txn)
            .await?;

        let counter = match record.status {
            OperationState::Ok => Some(names::SUCCESSES),
            OperationState::Error => Some(names::ERRORS),
            OperationState::Running => None,
        };
        if let Some(name) = counter {
            OperationCounter::insert(CounterActiveModel {
                name: Set(name.to_string()),
                value: Set(1),
            })
            .on_conflict(
                OnConflict::column(CounterColumn::Name)
                    .value(
                        CounterColumn::Value,
                        Expr::col((OperationCounter, CounterColumn::Value)).add(1),
                    )
                    .to_owned(),
            )
            .exec(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<OperationStatus>> {
        let row = OperationStatusEntity::find_by_id(id)
            .filter(StatusColumn::ExpiresAt.gt(Utc::now().fixed_offset()))
            .one(self.db.as_ref())
            .await?;

        row.map(|r| serde_json::from_value(r.record))
            .transpose()
            .map_err(Into::into)
    }

    async fn attach_to_link(&self, link_id: &LinkId, id: Uuid) -> Result<()> {
        self.attach_to_link_at(link_id, id, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;
    use crate::entity::operation_status::Model as StatusModel;
    use crate::queue::SqlQueue;

    #[tokio::test]
    async fn queue_and_store_share_one_connection() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_query_results([Vec::<StatusModel>::new()])
                .into_connection(),
        );
        let store = SqlStatusStore::new(Arc::clone(&db));
        let queue = SqlQueue::new(Arc::clone(&db));
        let cloned = store.clone();

        assert_eq!(cloned.get(Uuid::new_v4()).await.unwrap(), None);
        assert_eq!(Arc::strong_count(&db), 4);

        drop((store, queue, cloned));
        let db = Arc::try_unwrap(db).unwrap_or_else(|_| panic!("connection still shared"));
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[test]
    fn cutoff_subtracts_retention() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Sqlite).into_connection());
        let store = SqlStatusStore::with_retention(db, Duration::from_secs(3600));
        let now = Utc::now();
        assert_eq!(store.cutoff(now), now.timestamp() - 3600);
        assert_eq!(store.retention(), Duration::from_secs(3600));
    }
}
