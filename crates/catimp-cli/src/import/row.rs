//! Processing of a single CSV row.

use catimp_core::{
    CatalogReference, Headers, LinkedProduct, ProductPlan, RelationLinker, Row, RowMapper,
    RowOutcome,
};
use catimp_db::NewImage;

use super::media::MediaRoot;

/// Everything a row needs that stays fixed for the whole batch.
pub(crate) struct RowContext<'a> {
    pub pool: &'a sqlx::PgPool,
    pub mapper: &'a RowMapper<'a>,
    pub headers: &'a Headers,
    pub reference: &'a CatalogReference,
    pub media: &'a MediaRoot,
    /// `None` for a dry run: rows are planned but nothing is written.
    pub batch_id: Option<i64>,
}

/// Maps, plans and (unless dry-running) persists one row.
///
/// Never returns an error: every failure is folded into the outcome so the
/// batch moves on to the next row. The linker only advances after the
/// product itself was saved.
pub(crate) async fn process_row(
    ctx: &RowContext<'_>,
    row: &Row,
    linker: &mut RelationLinker,
) -> RowOutcome {
    let line = row.line;

    let identity = match ctx.mapper.identify(ctx.headers, row) {
        Ok(identity) => identity,
        Err(e) => return failed(line, None, &e.to_string()),
    };

    match catimp_db::variant_sku_exists(ctx.pool, &identity.sku).await {
        Ok(true) => {
            tracing::warn!(row = line, sku = %identity.sku, "skipping row, SKU already exists");
            return RowOutcome::Skipped {
                line,
                sku: identity.sku,
                reason: "duplicate sku".to_string(),
            };
        }
        Ok(false) => {}
        Err(e) => return failed(line, Some(&identity.sku), &e.to_string()),
    }

    let mapped = match ctx.mapper.map(ctx.headers, row) {
        Ok(mapped) => mapped,
        Err(e) => return failed(line, Some(&identity.sku), &e.to_string()),
    };

    let plan = ProductPlan::build(mapped);
    if let Err(e) = plan.validate() {
        return failed(line, Some(&plan.sku), &e.to_string());
    }

    let Some(batch_id) = ctx.batch_id else {
        return RowOutcome::Planned {
            line,
            sku: plan.sku.clone(),
            variants: plan.variant_count(),
            warnings: plan.warnings,
        };
    };

    let saved = match catimp_db::save_product(ctx.pool, batch_id, &plan).await {
        Ok(saved) => saved,
        Err(e) => return failed(line, Some(&plan.sku), &e.to_string()),
    };

    let mut warnings = plan.warnings.clone();
    attach_images(ctx, &plan, saved.master_variant_id, &mut warnings).await;

    let intent = linker.intent(plan.relation.as_ref());
    if let Err(e) =
        catimp_db::apply_relation_intent(ctx.pool, ctx.reference, saved.product_id, &intent).await
    {
        tracing::warn!(row = line, sku = %plan.sku, error = %e, "relation step failed");
        warnings.push(format!("relation: {e}"));
    }
    linker.advance(LinkedProduct {
        id: saved.product_id,
        sku: plan.sku.clone(),
    });

    tracing::info!(
        row = line,
        sku = %plan.sku,
        product_id = saved.product_id,
        variants = plan.variant_count(),
        "product imported"
    );

    RowOutcome::Imported {
        line,
        sku: plan.sku,
        product_id: saved.product_id,
        variants: saved.variant_ids.len() + 1,
        warnings,
    }
}

async fn attach_images(
    ctx: &RowContext<'_>,
    plan: &ProductPlan,
    variant_id: i64,
    warnings: &mut Vec<String>,
) {
    for (position, image) in (0_i32..).zip(&plan.images) {
        let loaded = match ctx.media.load(&image.filename).await {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(row = plan.line, sku = %plan.sku, error = %e, "image skipped");
                warnings.push(format!("image: {e}"));
                continue;
            }
        };

        let new_image = NewImage {
            file_name: loaded.file_name,
            alt: image.alt.clone(),
            content_type: loaded.content_type.to_string(),
            byte_size: loaded.byte_size,
            sha256: loaded.sha256,
            position,
        };
        if let Err(e) = catimp_db::insert_image(ctx.pool, variant_id, &new_image).await {
            tracing::warn!(row = plan.line, sku = %plan.sku, error = %e, "image not recorded");
            warnings.push(format!("image {}: {e}", image.filename));
        }
    }
}

fn failed(line: u64, sku: Option<&str>, error: &str) -> RowOutcome {
    tracing::warn!(row = line, sku = sku.unwrap_or("-"), error, "row failed");
    RowOutcome::Failed {
        line,
        error: error.to_string(),
    }
}
