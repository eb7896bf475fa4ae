//! Lifecycle state of a queued operation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Where an operation is in its lifecycle.
///
/// Serialized in upper case (`RUNNING`, `OK`, `ERROR`) both in the database
/// and in status records, which is what external consumers poll for.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationState {
    #[sea_orm(string_value = "RUNNING")]
    Running,
    #[sea_orm(string_value = "OK")]
    Ok,
    #[sea_orm(string_value = "ERROR")]
    Error,
}

impl OperationState {
    /// Whether the operation has reached a terminal state.
    #[inline]
    pub fn is_finished(self) -> bool {
        !matches!(self, OperationState::Running)
    }
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationState::Running => write!(f, "RUNNING"),
            OperationState::Ok => write!(f, "OK"),
            OperationState::Error => write!(f, "ERROR"),
        }
    }
}
