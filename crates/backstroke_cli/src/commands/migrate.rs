use std::sync::Arc;

use backstroke::migration::{Migrator, MigratorTrait};
use backstroke::{OperationQueue, SqlQueue, db};
use tabled::Tabled;

use crate::MigrateAction;
use crate::commands::{OutputFormat, print_rows};

#[derive(Debug, serde::Serialize, Tabled)]
struct MigrationRow {
    #[tabled(rename = "Migration")]
    name: String,
    #[tabled(rename = "State")]
    state: &'static str,
}

/// Why a fresh install must not run, if it must not.
fn fresh_refusal(queued: u64, force: bool) -> Option<String> {
    (queued > 0 && !force).then(|| {
        format!(
            "{queued} operation(s) are still queued and would be lost; \
             drain them with `backstroke run --once` or pass --force"
        )
    })
}

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Arc::new(db::connect(database_url).await?);

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(db.as_ref()).await?;
            if pending.is_empty() {
                println!("Schema is up to date.");
                return Ok(());
            }
            Migrator::up(db.as_ref(), None).await?;
            for migration in &pending {
                println!("Applied {}", migration.name());
            }
        }
        MigrateAction::Down => {
            Migrator::down(db.as_ref(), Some(1)).await?;
            println!("Rolled back the last migration.");
        }
        MigrateAction::Status => {
            let applied = Migrator::get_applied_migrations(db.as_ref()).await?;
            let pending = Migrator::get_pending_migrations(db.as_ref()).await?;
            let rows: Vec<_> = applied
                .iter()
                .map(|m| MigrationRow {
                    name: m.name().to_string(),
                    state: "applied",
                })
                .chain(pending.iter().map(|m| MigrationRow {
                    name: m.name().to_string(),
                    state: "pending",
                }))
                .collect();
            print_rows(&rows, OutputFormat::Table)?;
        }
        MigrateAction::Fresh { force } => {
            let queued = if Migrator::get_applied_migrations(db.as_ref()).await?.is_empty() {
                0
            } else {
                SqlQueue::new(Arc::clone(&db)).len().await?
            };
            if let Some(reason) = fresh_refusal(queued, force) {
                return Err(reason.into());
            }
            Migrator::fresh(db.as_ref()).await?;
            println!("Dropped the queue and status tables and recreated the schema.");
        }
    }

    Ok(())
}
