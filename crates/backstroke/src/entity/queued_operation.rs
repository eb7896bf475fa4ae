//! QueuedOperation entity - the durable FIFO of pending link sync operations.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A pending operation waiting to be popped by a worker.
///
/// Rows are deleted when popped, so a row's presence means nobody has
/// started on it yet.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "operation_queue")]
pub struct Model {
    /// Monotonic insertion order; the queue pops the lowest value first.
    #[sea_orm(primary_key)]
    pub seq: i64,

    /// Operation id handed back to the producer.
    #[sea_orm(unique)]
    pub id: Uuid,

    /// Opaque operation payload (`{type, user, link, fromRequest?}`).
    #[sea_orm(column_type = "Json")]
    pub payload: Json,

    /// When the operation was pushed.
    pub enqueued_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
