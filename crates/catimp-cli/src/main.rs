mod batch;
mod import;

use std::path::PathBuf;

use batch::BatchCommands;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "catimp")]
#[command(about = "Import product catalogs from CSV into the store database")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import every row of a product CSV as one batch
    Import {
        /// Path to the CSV file (header row required)
        file: PathBuf,

        /// Map and plan every row against the live catalog without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Inspect or undo import batches
    Batch {
        #[command(subcommand)]
        command: BatchCommands,
    },
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = catimp_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::debug!(env = %config.env, ?config, "configuration loaded");

    let pool_config = catimp_db::PoolConfig::from_app_config(&config);
    let pool = catimp_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Import { file, dry_run } => {
            import::run_import(&pool, &config, &file, dry_run).await?;
        }
        Commands::Batch { command } => batch::run_batch_command(&pool, command).await?,
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                catimp_db::ping(&pool).await?;
                println!("database reachable");
            }
            DbCommands::Migrate => {
                let applied = catimp_db::run_migrations(&pool).await?;
                println!("applied {applied} migrations");
            }
        },
    }

    Ok(())
}

/// Marks a batch `failed`, logging rather than propagating a second error.
async fn fail_batch_best_effort(
    pool: &sqlx::PgPool,
    batch_id: i64,
    summary: &catimp_core::BatchSummary,
    message: String,
) {
    if let Err(mark_err) = catimp_db::fail_import_batch(pool, batch_id, summary, &message).await {
        tracing::error!(
            batch_id,
            error = %mark_err,
            "failed to mark import batch as failed"
        );
    }
}
