//! Database operations for `relations` (related products).

use catimp_core::{symmetric_edges, CatalogReference, RelationEdge, RelationIntent};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::products::product_id_by_sku;
use crate::DbError;

/// A row from the `relations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RelationRow {
    pub id: i64,
    pub relation_type_id: i64,
    pub relatable_id: i64,
    pub related_to_id: i64,
    pub discount_amount: Decimal,
    pub position: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Products `product_id` already points at under `relation_type_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn related_product_ids(
    pool: &PgPool,
    relation_type_id: i64,
    product_id: i64,
) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT related_to_id FROM relations \
         WHERE relation_type_id = $1 AND relatable_id = $2 \
         ORDER BY related_to_id",
    )
    .bind(relation_type_id)
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Inserts relation edges in one transaction, skipping ones that already
/// exist. New edges get `discount_amount = 0` and no position.
///
/// Returns the number of edges actually inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; no edge is kept then.
pub async fn insert_relation_edges(pool: &PgPool, edges: &[RelationEdge]) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;
    for edge in edges {
        inserted += sqlx::query(
            "INSERT INTO relations \
                 (relation_type_id, relatable_id, related_to_id, discount_amount, position) \
             VALUES ($1, $2, $3, 0, NULL) \
             ON CONFLICT (relation_type_id, relatable_id, related_to_id) DO NOTHING",
        )
        .bind(edge.relation_type_id)
        .bind(edge.relatable_id)
        .bind(edge.related_to_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }
    tx.commit().await?;
    Ok(inserted)
}

/// Every relation where `product_id` is the relatable side.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_relations(pool: &PgPool, product_id: i64) -> Result<Vec<RelationRow>, DbError> {
    let rows = sqlx::query_as::<_, RelationRow>(
        "SELECT id, relation_type_id, relatable_id, related_to_id, discount_amount, \
                position, created_at \
         FROM relations \
         WHERE relatable_id = $1 \
         ORDER BY relation_type_id, related_to_id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Writes the edges a [`RelationIntent`] calls for, with `product_id` as the
/// freshly imported product.
///
/// A group join links the product to the previous product and to every
/// product already related to it under the same relation type. A direct link
/// pairs the product with the one owning the key SKU. Every pairing is
/// written in both directions.
///
/// Returns the number of edges inserted.
///
/// # Errors
///
/// Returns [`DbError::MissingRelationType`] when the intent carries no
/// relation type, [`DbError::Unresolved`] when the relation type or the
/// target SKU is unknown, or [`DbError::Sqlx`] on query failure.
pub async fn apply_relation_intent(
    pool: &PgPool,
    reference: &CatalogReference,
    product_id: i64,
    intent: &RelationIntent,
) -> Result<u64, DbError> {
    let (relation_type, targets) = match intent {
        RelationIntent::None => return Ok(0),
        RelationIntent::JoinGroup {
            previous,
            relation_type,
        } => {
            let type_id = resolve_relation_type(reference, relation_type.as_deref())?;
            let mut targets = vec![previous.id];
            targets.extend(related_product_ids(pool, type_id, previous.id).await?);
            (type_id, targets)
        }
        RelationIntent::Direct { key, relation_type } => {
            let type_id = resolve_relation_type(reference, relation_type.as_deref())?;
            let target = product_id_by_sku(pool, key)
                .await?
                .ok_or_else(|| DbError::Unresolved {
                    kind: "relation target",
                    reference: key.clone(),
                })?;
            (type_id, vec![target])
        }
    };

    let edges = symmetric_edges(relation_type, product_id, &targets);
    if edges.is_empty() {
        return Ok(0);
    }
    insert_relation_edges(pool, &edges).await
}

fn resolve_relation_type(
    reference: &CatalogReference,
    relation_type: Option<&str>,
) -> Result<i64, DbError> {
    let relation_type = relation_type
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or(DbError::MissingRelationType)?;
    reference
        .relation_type(relation_type)
        .map(|r| r.id)
        .ok_or_else(|| DbError::Unresolved {
            kind: "relation type",
            reference: relation_type.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use catimp_core::RelationTypeRef;

    use super::*;

    fn reference() -> CatalogReference {
        CatalogReference {
            relation_types: vec![RelationTypeRef {
                id: 4,
                name: "Related Products".to_string(),
            }],
            ..CatalogReference::default()
        }
    }

    #[test]
    fn relation_type_resolves_by_id_or_name() {
        let reference = reference();
        assert_eq!(resolve_relation_type(&reference, Some("4")).ok(), Some(4));
        assert_eq!(
            resolve_relation_type(&reference, Some(" related products ")).ok(),
            Some(4)
        );
    }

    #[test]
    fn missing_relation_type_is_reported() {
        let reference = reference();
        assert!(matches!(
            resolve_relation_type(&reference, None),
            Err(DbError::MissingRelationType)
        ));
        assert!(matches!(
            resolve_relation_type(&reference, Some("  ")),
            Err(DbError::MissingRelationType)
        ));
    }

    #[test]
    fn unknown_relation_type_is_unresolved() {
        let reference = reference();
        let err = resolve_relation_type(&reference, Some("Accessories")).unwrap_err();
        assert_eq!(err.to_string(), "relation type not found: Accessories");
    }
}
