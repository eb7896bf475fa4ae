//! LinkOperation entity - per-link index of recent operation ids.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One operation attached to a link, ordered by `score`.
///
/// The composite primary key keeps an operation from being listed twice
/// under the same link.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "link_operation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub link_id: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub operation_id: Uuid,

    /// Unix timestamp (seconds) of the most recent attach.
    pub score: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
