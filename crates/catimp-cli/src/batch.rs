//! Batch inspection and undo commands.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use uuid::Uuid;

/// Sub-commands available under `batch`.
#[derive(Debug, Subcommand)]
pub enum BatchCommands {
    /// List recent import batches, newest first
    List {
        /// Maximum number of batches to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Show one batch with its counters
    Show {
        /// Batch id printed by `import`
        public_id: Uuid,
    },
    /// Delete every product and variant a batch created
    Undo {
        /// Batch id printed by `import`
        public_id: Uuid,
    },
}

pub(crate) async fn run_batch_command(
    pool: &sqlx::PgPool,
    command: BatchCommands,
) -> anyhow::Result<()> {
    match command {
        BatchCommands::List { limit } => run_batch_list(pool, i64::from(limit)).await,
        BatchCommands::Show { public_id } => run_batch_show(pool, public_id).await,
        BatchCommands::Undo { public_id } => run_batch_undo(pool, public_id).await,
    }
}

/// Prints a table of the most recent batches.
///
/// # Errors
///
/// Returns an error if the database query fails.
async fn run_batch_list(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let batches = catimp_db::list_import_batches(pool, limit).await?;

    if batches.is_empty() {
        println!("no import batches found; run `import` first");
        return Ok(());
    }

    println!(
        "{:<38}{:<11}{:>7}{:>9}{:>9}{:>8}  {:<21}SOURCE",
        "BATCH", "STATUS", "ROWS", "IMPORTED", "SKIPPED", "FAILED", "CREATED"
    );
    for b in &batches {
        println!(
            "{:<38}{:<11}{:>7}{:>9}{:>9}{:>8}  {:<21}{}",
            b.public_id.to_string(),
            b.status,
            b.rows_processed,
            b.rows_imported,
            b.rows_skipped,
            b.rows_failed,
            fmt_timestamp(Some(b.created_at)),
            b.source_file
        );
    }

    Ok(())
}

/// Prints every field of one batch.
///
/// # Errors
///
/// Returns an error if the batch does not exist or the query fails.
async fn run_batch_show(pool: &sqlx::PgPool, public_id: Uuid) -> anyhow::Result<()> {
    let b = match catimp_db::get_import_batch_by_public_id(pool, public_id).await {
        Ok(b) => b,
        Err(catimp_db::DbError::NotFound) => anyhow::bail!("batch {public_id} not found"),
        Err(e) => return Err(e.into()),
    };

    println!("batch     {}", b.public_id);
    println!("source    {}", b.source_file);
    println!("trigger   {}", b.trigger_source);
    println!("status    {}", b.status);
    println!("rows      {}", b.rows_processed);
    println!("imported  {}", b.rows_imported);
    println!("skipped   {}", b.rows_skipped);
    println!("failed    {}", b.rows_failed);
    println!("warnings  {}", b.warnings_count);
    println!("created   {}", fmt_timestamp(Some(b.created_at)));
    println!("started   {}", fmt_timestamp(b.started_at));
    println!("completed {}", fmt_timestamp(b.completed_at));
    if b.undone_at.is_some() {
        println!("undone    {}", fmt_timestamp(b.undone_at));
    }
    if let Some(message) = &b.error_message {
        println!("error     {message}");
    }

    Ok(())
}

/// Deletes the batch's products and variants and marks it `undone`.
///
/// # Errors
///
/// Returns an error if the batch does not exist, is still running, was
/// already undone, or a delete fails.
async fn run_batch_undo(pool: &sqlx::PgPool, public_id: Uuid) -> anyhow::Result<()> {
    let report = match catimp_db::undo_import_batch(pool, public_id).await {
        Ok(report) => report,
        Err(catimp_db::DbError::NotFound) => anyhow::bail!("batch {public_id} not found"),
        Err(catimp_db::DbError::InvalidBatchTransition { .. }) => {
            anyhow::bail!("batch {public_id} is not finished or was already undone")
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "undid batch {public_id}: removed {} products and {} variants",
        report.products_deleted, report.variants_deleted
    );
    Ok(())
}

/// Format an optional timestamp for display, returning `"-"` when `None`.
fn fmt_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(
        || "-".to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}
