//! Operation status records and where they are kept.
//!
//! Every popped operation gets a record keyed by its id: RUNNING when it
//! starts, then OK or ERROR once. Records expire after a retention window,
//! and a per-link index lists the recent operations of each link.

mod record;
mod reporter;
mod store;

pub use record::OperationStatus;
pub use reporter::StatusReporter;
pub use store::{
    DEFAULT_RETENTION, LinkOperationEntry, OperationCounters, PurgeStats, SqlStatusStore,
    StatusStore,
};
