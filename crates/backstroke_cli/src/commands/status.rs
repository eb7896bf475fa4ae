//! Read-side commands over the status store.

use std::sync::Arc;

use backstroke::status::{LinkOperationEntry, OperationStatus, SqlStatusStore, StatusStore};
use backstroke::{LinkId, OperationState, connect_and_migrate};
use console::style;
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::commands::limits::format_duration;
use crate::commands::{OutputFormat, print_rows};
use crate::config::Config;

/// One operation as a table row.
#[derive(Debug, Clone, Serialize, Tabled)]
pub(crate) struct StatusRow {
    #[tabled(rename = "Operation")]
    pub operation: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Started")]
    pub started: String,
    #[tabled(rename = "Took")]
    pub took: String,
    #[tabled(rename = "Result")]
    pub result: String,
}

fn summarize(output: Option<&serde_json::Value>) -> String {
    let Some(output) = output else {
        return String::new();
    };
    if let Some(error) = output.get("error").and_then(|e| e.as_str()) {
        return error.to_string();
    }
    if let Some(response) = output.get("response").and_then(|r| r.as_str()) {
        return response.to_string();
    }
    match (
        output.pointer("/metrics/successes").and_then(|v| v.as_u64()),
        output.pointer("/metrics/total").and_then(|v| v.as_u64()),
    ) {
        (Some(ok), Some(total)) => format!("{ok}/{total} forks updated"),
        _ => String::new(),
    }
}

fn styled_state(state: OperationState) -> String {
    match state {
        OperationState::Ok => style(state).green().to_string(),
        OperationState::Error => style(state).red().to_string(),
        OperationState::Running => style(state).yellow().to_string(),
    }
}

impl StatusRow {
    fn new(id: Uuid, record: Option<&OperationStatus>, styled: bool) -> Self {
        let Some(record) = record else {
            return Self {
                operation: id.to_string(),
                status: "EXPIRED".to_string(),
                started: String::new(),
                took: String::new(),
                result: String::new(),
            };
        };

        Self {
            operation: id.to_string(),
            status: if styled {
                styled_state(record.status)
            } else {
                record.status.to_string()
            },
            started: record.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            took: record.duration().map(format_duration).unwrap_or_default(),
            result: if record.status.is_finished() {
                summarize(record.output.as_ref())
            } else {
                "in progress".to_string()
            },
        }
    }
}

async fn open_store(
    config: &Config,
    database_url: &str,
) -> Result<SqlStatusStore, Box<dyn std::error::Error>> {
    let db = connect_and_migrate(database_url).await?;
    Ok(config.status_store(Arc::new(db)))
}

/// Print one operation's full record.
pub(crate) async fn handle_status(
    id: Uuid,
    output: OutputFormat,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config, database_url).await?;
    let record = store
        .get(id)
        .await?
        .ok_or_else(|| format!("No status for operation {id} (unknown or expired)"))?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Table => print_rows(&[StatusRow::new(id, Some(&record), true)], output)?,
    }
    Ok(())
}

/// List a link's recent operations, oldest first.
pub(crate) async fn handle_history(
    link_id: &str,
    output: OutputFormat,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config, database_url).await?;
    let entries = store.list_for_link(&LinkId::from(link_id)).await?;

    if entries.is_empty() {
        println!("No recent operations for link {link_id}.");
        return Ok(());
    }

    let styled = output == OutputFormat::Table;
    let rows: Vec<_> = entries
        .iter()
        .map(|LinkOperationEntry { operation_id, status, .. }| {
            StatusRow::new(*operation_id, status.as_ref(), styled)
        })
        .collect();
    print_rows(&rows, output)?;
    Ok(())
}

/// Delete expired records and print totals.
pub(crate) async fn handle_purge(
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config, database_url).await?;
    let stats = store.purge_expired().await?;
    let counters = store.counters().await?;

    println!(
        "Purged {} status records and {} link history entries.",
        stats.statuses, stats.link_entries
    );
    println!(
        "Lifetime totals: {} succeeded, {} failed.",
        counters.successes, counters.errors
    );
    Ok(())
}
