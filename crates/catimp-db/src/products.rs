//! Database operations for `products`, `variants` and the tables that hang
//! off a product.

use catimp_core::ProductPlan;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub sku_pattern: Option<String>,
    pub available_on: Option<NaiveDate>,
    pub shipping_category_id: i64,
    pub tax_category_id: Option<i64>,
    pub batch_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `variants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VariantRow {
    pub id: i64,
    pub product_id: i64,
    pub sku: String,
    pub is_master: bool,
    pub price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub tax_category_id: Option<i64>,
    pub batch_id: Option<i64>,
    pub position: i32,
}

/// Ids written by [`save_product`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedProduct {
    pub product_id: i64,
    pub master_variant_id: i64,
    /// Generated variants, in plan order.
    pub variant_ids: Vec<i64>,
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// Returns `true` when any variant (master or not) already carries `sku`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn variant_sku_exists(pool: &PgPool, sku: &str) -> Result<bool, DbError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM variants WHERE sku = $1)")
            .bind(sku)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Finds the product owning the variant with `sku`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn product_id_by_sku(pool: &PgPool, sku: &str) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>("SELECT product_id FROM variants WHERE sku = $1")
        .bind(sku)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has `id`, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_product(pool: &PgPool, id: i64) -> Result<ProductRow, DbError> {
    sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, description, meta_description, meta_keywords, sku_pattern, \
                available_on, shipping_category_id, tax_category_id, batch_id, \
                created_at, updated_at \
         FROM products \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// All variants of a product, master first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_variants(pool: &PgPool, product_id: i64) -> Result<Vec<VariantRow>, DbError> {
    let rows = sqlx::query_as::<_, VariantRow>(
        "SELECT id, product_id, sku, is_master, price, cost_price, tax_category_id, \
                batch_id, position \
         FROM variants \
         WHERE product_id = $1 \
         ORDER BY is_master DESC, position, id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_taxon_ids(pool: &PgPool, product_id: i64) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT taxon_id FROM products_taxons WHERE product_id = $1 ORDER BY taxon_id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Adds taxon memberships, ignoring ones the product already has.
///
/// Returns the number of memberships actually inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn attach_taxons(
    pool: &PgPool,
    product_id: i64,
    taxon_ids: &[i64],
) -> Result<u64, DbError> {
    let mut conn = pool.acquire().await?;
    insert_taxons(&mut conn, product_id, taxon_ids).await
}

/// Persists a product plan in one transaction.
///
/// Writes the product, its master variant, the generated variants with their
/// option values, option types, properties, taxon memberships and
/// translations. The batch id and tax category are stamped on the product
/// and on every variant. Images and relations are separate steps.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails (for example a generated
/// SKU colliding with an existing variant). Nothing is written in that case.
pub async fn save_product(
    pool: &PgPool,
    batch_id: i64,
    plan: &ProductPlan,
) -> Result<SavedProduct, DbError> {
    let mut tx = pool.begin().await?;

    let product_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products \
             (name, description, meta_description, meta_keywords, sku_pattern, \
              available_on, shipping_category_id, tax_category_id, batch_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id",
    )
    .bind(&plan.name)
    .bind(&plan.description)
    .bind(&plan.meta_description)
    .bind(&plan.meta_keywords)
    .bind(&plan.sku_pattern)
    .bind(plan.available_on)
    .bind(plan.shipping_category_id)
    .bind(plan.tax_category_id)
    .bind(batch_id)
    .fetch_one(&mut *tx)
    .await?;

    let master_variant_id =
        insert_variant(&mut tx, product_id, batch_id, plan, &plan.sku, true, 0).await?;

    let mut variant_ids = Vec::with_capacity(plan.variants.len());
    for (position, variant) in (1_i32..).zip(&plan.variants) {
        let variant_id =
            insert_variant(&mut tx, product_id, batch_id, plan, &variant.sku, false, position)
                .await?;
        for option_value_id in &variant.option_value_ids {
            sqlx::query(
                "INSERT INTO option_value_variants (variant_id, option_value_id) \
                 VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(variant_id)
            .bind(option_value_id)
            .execute(&mut *tx)
            .await?;
        }
        variant_ids.push(variant_id);
    }

    for (position, option_type_id) in (0_i32..).zip(&plan.option_type_ids) {
        sqlx::query(
            "INSERT INTO product_option_types (product_id, option_type_id, position) \
             VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(product_id)
        .bind(option_type_id)
        .bind(position)
        .execute(&mut *tx)
        .await?;
    }

    for property in &plan.properties {
        sqlx::query(
            "INSERT INTO product_properties (product_id, property_id, value) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (product_id, property_id) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(product_id)
        .bind(property.property_id)
        .bind(&property.value)
        .execute(&mut *tx)
        .await?;
    }

    insert_taxons(&mut tx, product_id, &plan.taxon_ids).await?;

    for translation in &plan.translations {
        sqlx::query(
            "INSERT INTO product_translations \
                 (product_id, locale, name, description, meta_keywords, meta_description) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (product_id, locale) DO UPDATE SET \
                 name             = EXCLUDED.name, \
                 description      = EXCLUDED.description, \
                 meta_keywords    = EXCLUDED.meta_keywords, \
                 meta_description = EXCLUDED.meta_description",
        )
        .bind(product_id)
        .bind(&translation.locale)
        .bind(&translation.name)
        .bind(&translation.description)
        .bind(&translation.meta_keywords)
        .bind(&translation.meta_description)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(SavedProduct {
        product_id,
        master_variant_id,
        variant_ids,
    })
}

async fn insert_variant(
    conn: &mut PgConnection,
    product_id: i64,
    batch_id: i64,
    plan: &ProductPlan,
    sku: &str,
    is_master: bool,
    position: i32,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO variants \
             (product_id, sku, is_master, price, cost_price, tax_category_id, batch_id, position) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id",
    )
    .bind(product_id)
    .bind(sku)
    .bind(is_master)
    .bind(plan.price)
    .bind(plan.cost_price)
    .bind(plan.tax_category_id)
    .bind(batch_id)
    .bind(position)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

async fn insert_taxons(
    conn: &mut PgConnection,
    product_id: i64,
    taxon_ids: &[i64],
) -> Result<u64, DbError> {
    let mut inserted = 0;
    for taxon_id in taxon_ids {
        inserted += sqlx::query(
            "INSERT INTO products_taxons (product_id, taxon_id) \
             VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(product_id)
        .bind(taxon_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    }
    Ok(inserted)
}
