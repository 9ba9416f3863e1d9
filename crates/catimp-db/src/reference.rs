//! Loads the catalog lookup tables into a [`CatalogReference`] snapshot.

use catimp_core::{
    CatalogReference, OptionTypeRef, OptionValueRef, PropertyRef, RelationTypeRef,
    ShippingCategoryRef, TaxCategoryRef, TaxonRef,
};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, sqlx::FromRow)]
struct NamedRow {
    id: i64,
    name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct PresentedRow {
    id: i64,
    name: String,
    presentation: String,
}

#[derive(Debug, sqlx::FromRow)]
struct OptionValueRow {
    id: i64,
    option_type_id: i64,
    name: String,
    presentation: String,
}

/// Reads every lookup table a batch resolves rows against.
///
/// Option values are attached to their option type in `position` order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn load_catalog_reference(pool: &PgPool) -> Result<CatalogReference, DbError> {
    let shipping_categories =
        sqlx::query_as::<_, NamedRow>("SELECT id, name FROM shipping_categories ORDER BY id")
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|r| ShippingCategoryRef {
                id: r.id,
                name: r.name,
            })
            .collect();

    let tax_categories =
        sqlx::query_as::<_, NamedRow>("SELECT id, name FROM tax_categories ORDER BY id")
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|r| TaxCategoryRef {
                id: r.id,
                name: r.name,
            })
            .collect();

    let taxons = sqlx::query_as::<_, NamedRow>("SELECT id, name FROM taxons ORDER BY id")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|r| TaxonRef {
            id: r.id,
            name: r.name,
        })
        .collect();

    let option_value_rows = sqlx::query_as::<_, OptionValueRow>(
        "SELECT id, option_type_id, name, presentation \
         FROM option_values \
         ORDER BY option_type_id, position, id",
    )
    .fetch_all(pool)
    .await?;

    let option_types = sqlx::query_as::<_, PresentedRow>(
        "SELECT id, name, presentation FROM option_types ORDER BY position, id",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|t| OptionTypeRef {
        values: option_value_rows
            .iter()
            .filter(|v| v.option_type_id == t.id)
            .map(|v| OptionValueRef {
                id: v.id,
                name: v.name.clone(),
                presentation: v.presentation.clone(),
            })
            .collect(),
        id: t.id,
        name: t.name,
        presentation: t.presentation,
    })
    .collect();

    let properties = sqlx::query_as::<_, PresentedRow>(
        "SELECT id, name, presentation FROM properties ORDER BY id",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|p| PropertyRef {
        id: p.id,
        name: p.name,
        presentation: p.presentation,
    })
    .collect();

    let relation_types = sqlx::query_as::<_, NamedRow>(
        "SELECT id, name FROM relation_types WHERE applies_to = 'Product' ORDER BY id",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|r| RelationTypeRef {
        id: r.id,
        name: r.name,
    })
    .collect();

    Ok(CatalogReference {
        shipping_categories,
        tax_categories,
        taxons,
        option_types,
        properties,
        relation_types,
    })
}
