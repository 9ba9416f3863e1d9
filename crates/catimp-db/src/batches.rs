//! Database operations for `import_batches`.

use catimp_core::BatchSummary;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `import_batches` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImportBatchRow {
    pub id: i64,
    pub public_id: Uuid,
    pub source_file: String,
    pub trigger_source: String,
    pub status: String,
    pub rows_processed: i32,
    pub rows_imported: i32,
    pub rows_skipped: i32,
    pub rows_failed: i32,
    pub warnings_count: i32,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub undone_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// What an undo removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoReport {
    pub batch_id: i64,
    pub products_deleted: u64,
    pub variants_deleted: u64,
}

const BATCH_COLUMNS: &str = "id, public_id, source_file, trigger_source, status, \
     rows_processed, rows_imported, rows_skipped, rows_failed, warnings_count, \
     error_message, started_at, completed_at, undone_at, created_at";

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Creates a new import batch in `queued` status.
///
/// Generates a UUID in Rust and binds it to `public_id`. Returns the full
/// newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_import_batch(
    pool: &PgPool,
    source_file: &str,
    trigger_source: &str,
) -> Result<ImportBatchRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, ImportBatchRow>(&format!(
        "INSERT INTO import_batches (public_id, source_file, trigger_source, status) \
         VALUES ($1, $2, $3, 'queued') \
         RETURNING {BATCH_COLUMNS}"
    ))
    .bind(public_id)
    .bind(source_file)
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a batch as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidBatchTransition`] if the batch is not `queued`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn start_import_batch(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_batches \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidBatchTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a batch as `succeeded` and records its counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidBatchTransition`] if the batch is not `running`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn complete_import_batch(
    pool: &PgPool,
    id: i64,
    summary: &BatchSummary,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_batches \
         SET status = 'succeeded', completed_at = NOW(), \
             rows_processed = $1, rows_imported = $2, rows_skipped = $3, \
             rows_failed = $4, warnings_count = $5 \
         WHERE id = $6 AND status = 'running'",
    )
    .bind(summary.rows)
    .bind(summary.imported)
    .bind(summary.skipped)
    .bind(summary.failed)
    .bind(summary.warnings)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidBatchTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a batch as `failed`, keeping whatever counters it reached.
///
/// A batch may fail before it started running (e.g. the reference data could
/// not be loaded), so both `queued` and `running` are accepted.
///
/// # Errors
///
/// Returns [`DbError::InvalidBatchTransition`] if the batch already finished,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_import_batch(
    pool: &PgPool,
    id: i64,
    summary: &BatchSummary,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_batches \
         SET status = 'failed', completed_at = NOW(), error_message = $1, \
             rows_processed = $2, rows_imported = $3, rows_skipped = $4, \
             rows_failed = $5, warnings_count = $6 \
         WHERE id = $7 AND status IN ('queued', 'running')",
    )
    .bind(error_message)
    .bind(summary.rows)
    .bind(summary.imported)
    .bind(summary.skipped)
    .bind(summary.failed)
    .bind(summary.warnings)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidBatchTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Fetches a single batch by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_import_batch(pool: &PgPool, id: i64) -> Result<ImportBatchRow, DbError> {
    sqlx::query_as::<_, ImportBatchRow>(&format!(
        "SELECT {BATCH_COLUMNS} FROM import_batches WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Fetches a single batch by the UUID printed to operators.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no batch has that `public_id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_import_batch_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<ImportBatchRow, DbError> {
    sqlx::query_as::<_, ImportBatchRow>(&format!(
        "SELECT {BATCH_COLUMNS} FROM import_batches WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` batches, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_import_batches(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ImportBatchRow>, DbError> {
    let rows = sqlx::query_as::<_, ImportBatchRow>(&format!(
        "SELECT {BATCH_COLUMNS} FROM import_batches \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Undo
// ---------------------------------------------------------------------------

/// Deletes every product and variant stamped with the batch and marks it
/// `undone`.
///
/// Images, option values, properties, translations, taxon memberships and
/// relations go with their product through `ON DELETE CASCADE`. Only
/// finished batches (`succeeded` or `failed`) can be undone.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown `public_id`,
/// [`DbError::InvalidBatchTransition`] if the batch is still running or was
/// already undone, or [`DbError::Sqlx`] if any statement fails. Nothing is
/// deleted unless the whole undo commits.
pub async fn undo_import_batch(pool: &PgPool, public_id: Uuid) -> Result<UndoReport, DbError> {
    let mut tx = pool.begin().await?;

    let (id, status): (i64, String) = sqlx::query_as(
        "SELECT id, status FROM import_batches WHERE public_id = $1 FOR UPDATE",
    )
    .bind(public_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    if status != "succeeded" && status != "failed" {
        return Err(DbError::InvalidBatchTransition {
            id,
            expected_status: "succeeded",
        });
    }

    let variants_deleted = sqlx::query("DELETE FROM variants WHERE batch_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let products_deleted = sqlx::query("DELETE FROM products WHERE batch_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("UPDATE import_batches SET status = 'undone', undone_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        batch_id = id,
        products_deleted,
        variants_deleted,
        "import batch undone"
    );

    Ok(UndoReport {
        batch_id: id,
        products_deleted,
        variants_deleted,
    })
}
