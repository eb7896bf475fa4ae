//! OperationStatus entity - the latest status record of each operation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::operation_state::OperationState;

/// Status row keyed by operation id.
///
/// The full record is kept as JSON in `record`; `status` is duplicated into
/// its own column so history listings can be filtered without decoding.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "operation_status")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub status: OperationState,

    #[sea_orm(column_type = "Json")]
    pub record: Json,

    /// Rows past this instant are treated as absent.
    pub expires_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the row has outlived its retention window.
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.expires_at <= now.fixed_offset()
    }
}
