//! OperationCounter entity - running totals of finished operations.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Counter names.
pub mod names {
    pub const SUCCESSES: &str = "successes";
    pub const ERRORS: &str = "errors";
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "operation_counter")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,

    pub value: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
