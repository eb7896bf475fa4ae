//! SeaORM entity definitions for the worker's queue and status tables.

pub mod link_operation;
pub mod operation_counter;
pub mod operation_state;
pub mod operation_status;
pub mod prelude;
pub mod queued_operation;
