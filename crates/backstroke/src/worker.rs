//! The operation queue loop.
//!
//! Pops one operation at a time, records RUNNING, hands the link to the
//! [`SyncEngine`] and records OK or ERROR. Operation failures end up in the
//! status record and never stop the loop; only an unavailable queue, store
//! or quota check does.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entity::operation_state::OperationState;
use crate::error::StoreError;
use crate::link::{ForkType, Link, Operation};
use crate::platform::HostingError;
use crate::queue::OperationQueue;
use crate::status::{OperationStatus, StatusReporter};
use crate::sync::SyncEngine;

/// Infrastructure failures that end a drain pass.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Operation queue unavailable: {0}")]
    Queue(#[source] StoreError),

    #[error("Status store unavailable: {0}")]
    Store(#[source] StoreError),

    #[error("Couldn't fetch token rate limit: {}", .0.detail())]
    Quota(#[source] HostingError),
}

/// One operation taken off the queue and brought to a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedOperation {
    pub id: Uuid,
    pub record: OperationStatus,
}

impl ProcessedOperation {
    pub fn status(&self) -> OperationState {
        self.record.status
    }
}

/// Counts from one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl DrainSummary {
    fn record(&mut self, op: &ProcessedOperation) {
        self.processed += 1;
        match op.status() {
            OperationState::Error => self.failed += 1,
            _ => self.succeeded += 1,
        }
    }
}

/// Drains an [`OperationQueue`] through a [`SyncEngine`].
#[derive(Clone)]
pub struct OperationWorker {
    queue: Arc<dyn OperationQueue>,
    reporter: StatusReporter,
    engine: SyncEngine,
}

impl OperationWorker {
    pub fn new(queue: Arc<dyn OperationQueue>, reporter: StatusReporter, engine: SyncEngine) -> Self {
        Self {
            queue,
            reporter,
            engine,
        }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Process operations until the queue is empty.
    pub async fn run(&self) -> Result<DrainSummary, WorkerError> {
        self.drain(None, || true).await
    }

    /// Process at most `max` operations.
    pub async fn run_bounded(&self, max: usize) -> Result<DrainSummary, WorkerError> {
        self.drain(Some(max), || true).await
    }

    /// Process operations until the queue is empty, `limit` is reached, or
    /// `keep_going` returns false. `keep_going` is checked between operations,
    /// so a running operation always finishes.
    pub async fn drain<F>(&self, limit: Option<usize>, keep_going: F) -> Result<DrainSummary, WorkerError>
    where
        F: Fn() -> bool,
    {
        let mut summary = DrainSummary::default();
        while limit.is_none_or(|max| summary.processed < max) && keep_going() {
            match self.process_next().await? {
                Some(op) => summary.record(&op),
                None => break,
            }
        }

        if summary.processed > 0 {
            info!(
                processed = summary.processed,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "queue drained"
            );
        }
        Ok(summary)
    }

    /// Pop and process one operation. `None` when the queue is empty.
    pub async fn process_next(&self) -> Result<Option<ProcessedOperation>, WorkerError> {
        self.engine
            .gate()
            .wait(self.engine.client().as_ref())
            .await
            .map_err(WorkerError::Quota)?;

        let Some(item) = self.queue.pop().await.map_err(WorkerError::Queue)? else {
            debug!("operation queue is empty");
            return Ok(None);
        };

        let started_at = Instant::now();
        let from_request = correlation_id(&item.payload);
        let running = self
            .reporter
            .running(item.id, from_request)
            .await
            .map_err(WorkerError::Store)?;

        let operation = match Operation::decode(item.id, item.payload) {
            Ok(operation) => operation,
            Err(e) => {
                warn!(operation_id = %item.id, error = %e, "malformed operation payload");
                let message = format!("Invalid operation payload: {e}");
                let record = self
                    .reporter
                    .error(item.id, running, None, &message, &error_stack(&e))
                    .await
                    .map_err(WorkerError::Store)?;
                return Ok(Some(ProcessedOperation { id: item.id, record }));
            }
        };

        let link = &operation.payload.link;
        self.reporter
            .attach(&link.id, operation.id)
            .await
            .map_err(WorkerError::Store)?;

        info!(
            operation_id = %operation.id,
            link_id = %link.id,
            source = %link.upstream(),
            destination = %destination(link),
            "processing operation"
        );

        let user = operation.payload.acting_user().cloned().unwrap_or_default();
        let record = match self.engine.execute(link, &user).await {
            Ok(result) => {
                let output = serde_json::to_value(&result)
                    .map_err(|e| WorkerError::Store(StoreError::from(e)))?;
                self.reporter
                    .ok(operation.id, running, link, output)
                    .await
                    .map_err(WorkerError::Store)?
            }
            Err(e) => {
                warn!(operation_id = %operation.id, link_id = %link.id, error = %e, "operation failed");
                self.reporter
                    .error(operation.id, running, Some(link), &e.to_string(), &error_stack(&e))
                    .await
                    .map_err(WorkerError::Store)?
            }
        };

        info!(
            operation_id = %operation.id,
            status = %record.status,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "operation finished"
        );
        Ok(Some(ProcessedOperation {
            id: operation.id,
            record,
        }))
    }
}

fn correlation_id(payload: &Value) -> Option<String> {
    payload
        .get("fromRequest")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Where a link's changes go, for logging.
fn destination(link: &Link) -> String {
    match link.fork_type.as_deref().map(str::parse::<ForkType>) {
        Some(Ok(ForkType::FanOut)) => "all forks".to_string(),
        _ => link.fork().to_string(),
    }
}

/// Render an error and its source chain as trace text.
fn error_stack(err: &(dyn std::error::Error + 'static)) -> String {
    let mut stack = format!("Error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(stack, "\n    caused by: {cause}");
        source = cause.source();
    }
    stack
}
