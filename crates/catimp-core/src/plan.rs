//! The intended writes for one product, derived from a [`MappedRow`].
//!
//! Building a plan never touches the database. The db crate persists a plan
//! as one transaction.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::row::{MappedRow, PropertyValue, RelationRef, Translation};
use crate::RowError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPlan {
    pub locale: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_description: Option<String>,
}

/// One option type and the option values the row selected for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionAxis {
    pub option_type_id: i64,
    /// `(option_value_id, option_value_name)` in cell order, without duplicates.
    pub values: Vec<(i64, String)>,
}

/// A generated (non-master) variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPlan {
    pub sku: String,
    pub option_value_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePlan {
    pub filename: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPlan {
    pub line: u64,
    /// Master variant SKU.
    pub sku: String,
    pub sku_pattern: String,
    pub name: String,
    pub description: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_description: Option<String>,
    pub price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub available_on: Option<NaiveDate>,
    pub shipping_category_id: i64,
    pub tax_category_id: Option<i64>,
    pub taxon_ids: Vec<i64>,
    pub option_type_ids: Vec<i64>,
    /// Option type → selected option values; drives variant generation.
    pub option_matrix: Vec<OptionAxis>,
    pub variants: Vec<VariantPlan>,
    pub properties: Vec<PropertyValue>,
    pub translations: Vec<TranslationPlan>,
    pub images: Vec<ImagePlan>,
    pub relation: Option<RelationRef>,
    /// Non-fatal findings, e.g. option values that did not match the catalog.
    pub warnings: Vec<String>,
}

impl ProductPlan {
    /// Builds the plan for a mapped row.
    ///
    /// Rows with an explicit SKU get no generated variants; otherwise one
    /// variant per combination of the option matrix, each with a SKU rendered
    /// from the product's pattern.
    #[must_use]
    pub fn build(mapped: MappedRow) -> Self {
        let MappedRow {
            line,
            identity,
            price,
            cost_price,
            available_on,
            primary_locale,
            translations,
            shipping_category_id,
            tax_category_id,
            taxon_ids,
            option_cells,
            properties,
            images,
            relation,
        } = mapped;

        let mut warnings = Vec::new();
        let mut option_type_ids = Vec::new();
        let mut option_matrix = Vec::new();

        for cell in &option_cells {
            option_type_ids.push(cell.option_type.id);
            let mut values: Vec<(i64, String)> = Vec::new();
            for field in &cell.fields {
                match cell.option_type.match_value(field) {
                    Some(v) => {
                        if !values.iter().any(|(id, _)| *id == v.id) {
                            values.push((v.id, v.name.clone()));
                        }
                    }
                    None => warnings.push(format!(
                        "option value \"{}\" not found for option type \"{}\"",
                        field.sanitized, cell.option_type.name
                    )),
                }
            }
            if !values.is_empty() {
                option_matrix.push(OptionAxis {
                    option_type_id: cell.option_type.id,
                    values,
                });
            }
        }

        let variants = if identity.explicit {
            Vec::new()
        } else {
            generate_variants(
                &option_matrix,
                &identity.sku_pattern,
                &identity.name,
                &identity.sku,
            )
        };

        let primary = translations
            .get(&primary_locale)
            .or_else(|| translations.values().next())
            .cloned()
            .unwrap_or_default();
        let translations = translations
            .into_iter()
            .map(|(locale, t)| translation_plan(locale, t))
            .collect();

        let images = images
            .into_iter()
            .map(|filename| ImagePlan {
                filename,
                alt: identity.name.clone(),
            })
            .collect();

        Self {
            line,
            sku: identity.sku,
            sku_pattern: identity.sku_pattern,
            name: identity.name,
            description: primary.description,
            meta_keywords: primary.meta_keywords,
            meta_description: primary.meta_description,
            price,
            cost_price,
            available_on,
            shipping_category_id,
            tax_category_id,
            taxon_ids,
            option_type_ids,
            option_matrix,
            variants,
            properties,
            translations,
            images,
            relation,
            warnings,
        }
    }

    /// Checks the fields the catalog refuses to store.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::Validation`] listing every failed check.
    pub fn validate(&self) -> Result<(), RowError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("name can't be blank".to_string());
        }
        if self.sku.trim().is_empty() {
            errors.push("sku can't be blank".to_string());
        }
        match self.price {
            None => errors.push("price can't be blank".to_string()),
            Some(p) if p.is_sign_negative() => {
                errors.push("price must be greater than or equal to 0".to_string());
            }
            Some(_) => {}
        }
        if self.cost_price.is_some_and(|c| c.is_sign_negative()) {
            errors.push("cost price must be greater than or equal to 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RowError::Validation(errors))
        }
    }

    /// Total variants the product ends up with, master included.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.variants.len() + 1
    }
}

fn translation_plan(locale: String, t: Translation) -> TranslationPlan {
    TranslationPlan {
        locale,
        name: t.name,
        description: t.description,
        meta_keywords: t.meta_keywords,
        meta_description: t.meta_description,
    }
}

/// Cartesian product of the matrix axes, in axis order.
fn generate_variants(
    matrix: &[OptionAxis],
    pattern: &str,
    name: &str,
    master_sku: &str,
) -> Vec<VariantPlan> {
    if matrix.is_empty() {
        return Vec::new();
    }

    let mut combinations: Vec<Vec<&(i64, String)>> = vec![Vec::new()];
    for axis in matrix {
        combinations = combinations
            .into_iter()
            .flat_map(|prefix| {
                axis.values.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push(value);
                    next
                })
            })
            .collect();
    }

    let mut taken: HashSet<String> = HashSet::from([master_sku.to_string()]);
    combinations
        .into_iter()
        .enumerate()
        .map(|(idx, combo)| {
            let labels: Vec<&str> = combo.iter().map(|(_, n)| n.as_str()).collect();
            let base = render_sku(pattern, name, &labels);
            let mut sku = base.clone();
            let mut suffix = idx + 1;
            while taken.contains(&sku) {
                sku = format!("{base}-{suffix}");
                suffix += 1;
            }
            taken.insert(sku.clone());
            VariantPlan {
                sku,
                option_value_ids: combo.iter().map(|(id, _)| *id).collect(),
            }
        })
        .collect()
}

/// Renders a SKU pattern.
///
/// `{name}` becomes the slugged product name and `{options}` the slugged
/// option value names joined by `-`. Slugs keep letters and digits of any
/// script, lowercased. Repeated dashes collapse and leading or
/// trailing dashes are dropped, so `"{name}-{options}"` with no options
/// renders as the bare name slug.
#[must_use]
pub fn render_sku(pattern: &str, name: &str, options: &[&str]) -> String {
    let options = options
        .iter()
        .map(|o| slugify(o))
        .filter(|o| !o.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let rendered = pattern
        .trim()
        .replace("{name}", &slugify(name))
        .replace("{options}", &options);

    let mut out = String::with_capacity(rendered.len());
    for c in rendered.chars() {
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('-').to_string()
}

fn slugify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
