//! Backstroke CLI - runs the sync worker and inspects its state.

mod commands;
mod config;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::commands::OutputFormat;

#[derive(Parser)]
#[command(name = "backstroke")]
#[command(version)]
#[command(about = "Keeps forks in sync with their upstream")]
#[command(
    long_about = "Backstroke drains a queue of link operations. For each link it proposes a \
pull request carrying upstream changes into a fork, into every fork of the upstream, or, \
for forks outside the upstream's network, through a bot-owned mirror. The outcome of \
every operation is recorded and can be queried by id or by link."
)]
#[command(after_long_help = r#"EXAMPLES
    Drain the queue once and exit:
        $ backstroke run --once

    Keep polling, logging writes instead of making them:
        $ backstroke run --dry-run

    Queue a manual sync and check on it:
        $ backstroke enqueue payload.json
        $ backstroke status 4a6b0c8e-3f1d-4c47-9b5e-0d2d8f3c1a77

    Generate shell completions:
        $ backstroke completions bash > ~/.local/share/bash-completion/completions/backstroke

CONFIGURATION
    Backstroke reads configuration from:
      1. ~/.config/backstroke/config.toml (or $XDG_CONFIG_HOME/backstroke/config.toml)
      2. ./backstroke.toml
      3. Environment variables (BACKSTROKE_* prefix, sections separated by __)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    BACKSTROKE_DATABASE__URL              Database connection string (default: ~/.local/state/backstroke/backstroke.db)
    BACKSTROKE_GITHUB__TOKEN              Bot account token
    BACKSTROKE_GITHUB__BOT_USERNAME       Bot account login (default: backstroke-bot)
    BACKSTROKE_WORKER__POLL_INTERVAL_MS   Pause between queue polls (default: 5000)
    BACKSTROKE_WORKER__THROTTLE_MS        Delay before each operation (default: 0)
    RUST_LOG                              Log filter (default: backstroke=info,backstroke_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drain the operation queue
    Run {
        /// Drain once and exit instead of polling
        #[arg(long)]
        once: bool,

        /// Log pull requests, forks and pushes instead of performing them
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Queue an operation from a JSON payload file
    Enqueue {
        /// Payload file with `type`, `user` and `link` ("-" for stdin)
        file: PathBuf,

        /// Correlation id stored with the operation's status
        #[arg(short = 'r', long)]
        from_request: Option<String>,
    },
    /// Show the status of an operation
    Status {
        /// Operation id
        id: Uuid,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// List recent operations of a link
    History {
        /// Link id
        link_id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show the bot token's API rate limit
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Delete expired status records and link history
    Purge,
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Drop the queue and status tables and recreate the schema
    Fresh {
        /// Drop tables even while operations are still queued
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    shutdown::setup_shutdown_handler();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("backstroke=info,backstroke_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        commands::meta::handle_completions(*shell)?;
        return Ok(());
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set [database] url")?;

    // Ensure the database directory exists for SQLite
    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        // Strip query parameters (e.g., ?mode=rwc) before path operations
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory. \
                 Consider using an absolute path.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Commands::Run { once, dry_run } => {
            commands::run::handle_run(once, dry_run, &config, &database_url).await?;
        }
        Commands::Enqueue { file, from_request } => {
            commands::enqueue::handle_enqueue(&file, from_request, &database_url).await?;
        }
        Commands::Status { id, output } => {
            commands::status::handle_status(id, output, &config, &database_url).await?;
        }
        Commands::History { link_id, output } => {
            commands::status::handle_history(&link_id, output, &config, &database_url).await?;
        }
        Commands::Limits { output } => {
            commands::limits::handle_limits(output, &config).await?;
        }
        Commands::Purge => {
            commands::status::handle_purge(&config, &database_url).await?;
        }
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
