//! Database operations for `images`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `images` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImageRow {
    pub id: i64,
    pub variant_id: i64,
    pub file_name: String,
    pub alt: Option<String>,
    pub content_type: String,
    pub byte_size: i64,
    /// Lowercase hex SHA-256 of the file contents.
    pub sha256: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// An image file already read from the media root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub file_name: String,
    pub alt: String,
    pub content_type: String,
    pub byte_size: i64,
    pub sha256: String,
    pub position: i32,
}

/// Records an image against a variant (the master variant for imports).
///
/// Returns the new row's `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_image(
    pool: &PgPool,
    variant_id: i64,
    image: &NewImage,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO images \
             (variant_id, file_name, alt, content_type, byte_size, sha256, position) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id",
    )
    .bind(variant_id)
    .bind(&image.file_name)
    .bind(&image.alt)
    .bind(&image.content_type)
    .bind(image.byte_size)
    .bind(&image.sha256)
    .bind(image.position)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_variant_images(pool: &PgPool, variant_id: i64) -> Result<Vec<ImageRow>, DbError> {
    let rows = sqlx::query_as::<_, ImageRow>(
        "SELECT id, variant_id, file_name, alt, content_type, byte_size, sha256, position, \
                created_at \
         FROM images \
         WHERE variant_id = $1 \
         ORDER BY position, id",
    )
    .bind(variant_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
