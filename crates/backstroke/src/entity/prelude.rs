//! Common re-exports for convenient entity usage.

pub use super::link_operation::{
    ActiveModel as LinkOperationActiveModel, Column as LinkOperationColumn,
    Entity as LinkOperation, Model as LinkOperationModel,
};
pub use super::operation_counter::{
    ActiveModel as OperationCounterActiveModel, Column as OperationCounterColumn,
    Entity as OperationCounter, Model as OperationCounterModel,
};
pub use super::operation_state::OperationState;
pub use super::operation_status::{
    ActiveModel as OperationStatusActiveModel, Column as OperationStatusColumn,
    Entity as OperationStatusEntity, Model as OperationStatusModel,
};
pub use super::queued_operation::{
    ActiveModel as QueuedOperationActiveModel, Column as QueuedOperationColumn,
    Entity as QueuedOperation, Model as QueuedOperationModel,
};
