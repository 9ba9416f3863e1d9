//! Mapping of one CSV row onto catalog references.
//!
//! Column roles are decided once per file by [`RowMapper::headers`]; every
//! row is then read through the resulting [`Headers`]. Catalog lookups go
//! against the [`CatalogReference`] snapshot, never the database.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::aliases::{normalize_header, HeaderAliases, LogicalField};
use crate::app_config::ImportSettings;
use crate::field::{eq_ignore_case, FieldParser, ParsedField};
use crate::plan::render_sku;
use crate::reference::{CatalogReference, OptionTypeRef};
use crate::RowError;

/// Translatable product text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TextField {
    Name,
    Description,
    MetaKeywords,
    MetaDescription,
}

impl TextField {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix.trim_start_matches('_') {
            "name" => Some(TextField::Name),
            "description" => Some(TextField::Description),
            "metakeywords" | "meta_keywords" => Some(TextField::MetaKeywords),
            "metadescription" | "meta_description" => Some(TextField::MetaDescription),
            _ => None,
        }
    }
}

/// What a column contributes to a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRole {
    Logical(LogicalField),
    Translation { locale: String, field: TextField },
    OptionType { option_type_id: i64 },
    Property { property_id: i64 },
    Ignored,
}

/// The header row, with a role assigned to each column.
#[derive(Debug, Clone)]
pub struct Headers {
    names: Vec<String>,
    roles: Vec<ColumnRole>,
}

impl Headers {
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn roles(&self) -> &[ColumnRole] {
        &self.roles
    }

    /// First non-blank value among columns mapped to `field`.
    fn logical<'s>(&'s self, values: &'s [String], field: LogicalField) -> Option<&'s str> {
        self.cells(values)
            .find(|(role, _)| *role == &ColumnRole::Logical(field))
            .map(|(_, value)| value)
    }

    /// Non-blank cells paired with their column role, in header order.
    fn cells<'s>(
        &'s self,
        values: &'s [String],
    ) -> impl Iterator<Item = (&'s ColumnRole, &'s str)> + 's {
        self.roles
            .iter()
            .zip(values.iter())
            .map(|(role, value)| (role, value.trim()))
            .filter(|(_, value)| !value.is_empty())
    }
}

/// One CSV data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 1-based line number in the source file, header included.
    pub line: u64,
    pub values: Vec<String>,
}

/// SKU data needed for the duplicate guard, resolved before anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductIdentity {
    /// Master variant SKU, either explicit or rendered from the pattern.
    pub sku: String,
    /// `true` when the row supplied `sku` or `master_sku`.
    pub explicit: bool,
    pub sku_pattern: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    pub name: Option<String>,
    pub description: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_description: Option<String>,
}

impl Translation {
    fn set(&mut self, field: TextField, value: &str) {
        let slot = match field {
            TextField::Name => &mut self.name,
            TextField::Description => &mut self.description,
            TextField::MetaKeywords => &mut self.meta_keywords,
            TextField::MetaDescription => &mut self.meta_description,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.meta_keywords.is_none()
            && self.meta_description.is_none()
    }
}

/// An option-type column with its parsed tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionCell {
    pub option_type: OptionTypeRef,
    pub fields: Vec<ParsedField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue {
    pub property_id: i64,
    pub value: String,
}

/// A relation request carried by a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationRef {
    /// Usually another product's SKU.
    pub key: String,
    /// Relation type id or name; `None` when neither the row nor the config has one.
    pub relation_type: Option<String>,
}

/// A row with every column resolved against the catalog reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedRow {
    pub line: u64,
    pub identity: ProductIdentity,
    pub price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub available_on: Option<NaiveDate>,
    /// Locale that owns the untranslated text columns.
    pub primary_locale: String,
    /// Keyed by locale code.
    pub translations: BTreeMap<String, Translation>,
    pub shipping_category_id: i64,
    pub tax_category_id: Option<i64>,
    pub taxon_ids: Vec<i64>,
    pub option_cells: Vec<OptionCell>,
    pub properties: Vec<PropertyValue>,
    pub images: Vec<String>,
    pub relation: Option<RelationRef>,
}

/// Maps rows for one batch.
#[derive(Debug, Clone, Copy)]
pub struct RowMapper<'a> {
    settings: &'a ImportSettings,
    aliases: &'a HeaderAliases,
    reference: &'a CatalogReference,
}

impl<'a> RowMapper<'a> {
    #[must_use]
    pub fn new(
        settings: &'a ImportSettings,
        aliases: &'a HeaderAliases,
        reference: &'a CatalogReference,
    ) -> Self {
        Self {
            settings,
            aliases,
            reference,
        }
    }

    /// Assigns a role to each header.
    ///
    /// Precedence: logical alias, locale translation column, option type,
    /// property. Anything else is ignored.
    #[must_use]
    pub fn headers(&self, names: &[String]) -> Headers {
        let roles = names
            .iter()
            .map(|name| {
                let role = self.classify(name);
                if role == ColumnRole::Ignored {
                    tracing::debug!(header = %name, "ignoring unrecognized column");
                }
                role
            })
            .collect();

        Headers {
            names: names.to_vec(),
            roles,
        }
    }

    fn classify(&self, header: &str) -> ColumnRole {
        if let Some(field) = self.aliases.resolve(header) {
            return ColumnRole::Logical(field);
        }

        let normalized = normalize_header(header);
        for locale in &self.settings.locales {
            if let Some(field) = normalized
                .strip_prefix(locale.as_str())
                .and_then(TextField::from_suffix)
            {
                return ColumnRole::Translation {
                    locale: locale.clone(),
                    field,
                };
            }
        }

        if let Some(option_type) = self.reference.option_type_named(header) {
            return ColumnRole::OptionType {
                option_type_id: option_type.id,
            };
        }

        if let Some(property) = self.reference.property_named(header) {
            return ColumnRole::Property {
                property_id: property.id,
            };
        }

        ColumnRole::Ignored
    }

    /// Resolves the SKU a row would create, without touching the rest of it.
    ///
    /// `master_sku` wins over `sku`; with neither, the SKU is rendered from
    /// the row's pattern (or the configured default) and the product name.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::Validation`] if the row has no product name, or if
    /// no explicit SKU is given and the rendered one contains no letters.
    pub fn identify(&self, headers: &Headers, row: &Row) -> Result<ProductIdentity, RowError> {
        let values = &row.values;
        let name = self
            .product_name(headers, values)
            .ok_or_else(|| RowError::Validation(vec!["name can't be blank".to_string()]))?;

        let sku_pattern = headers
            .logical(values, LogicalField::SkuPattern)
            .unwrap_or(self.settings.default_sku_pattern.as_str())
            .to_string();

        let explicit_sku = headers
            .logical(values, LogicalField::MasterSku)
            .or_else(|| headers.logical(values, LogicalField::Sku));

        let (sku, explicit) = match explicit_sku {
            Some(sku) => (sku.to_string(), true),
            None => {
                let sku = render_sku(&sku_pattern, &name, &[]);
                // An empty or all-digit SKU would collide across unrelated rows.
                if !sku.chars().any(char::is_alphabetic) {
                    return Err(RowError::Validation(vec![format!(
                        "sku \"{sku}\" derived from name \"{name}\" and pattern \"{sku_pattern}\" \
                         has no letters; set a sku column"
                    )]));
                }
                (sku, false)
            }
        };

        Ok(ProductIdentity {
            sku,
            explicit,
            sku_pattern,
            name,
        })
    }

    /// Fully maps a row.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::NotFound`] when the shipping or tax category does
    /// not exist, [`RowError::InvalidValue`] for malformed numbers or dates,
    /// and [`RowError::Validation`] when the row has no name.
    pub fn map(&self, headers: &Headers, row: &Row) -> Result<MappedRow, RowError> {
        let identity = self.identify(headers, row)?;
        let values = &row.values;
        let parser = FieldParser::new(self.settings);

        let price = parse_decimal(headers.logical(values, LogicalField::Price), "price")?;
        let cost_price =
            parse_decimal(headers.logical(values, LogicalField::CostPrice), "cost_price")?;
        let available_on = headers
            .logical(values, LogicalField::AvailableOn)
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| RowError::InvalidValue {
                    field: "available_on",
                    value: raw.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let shipping_name = headers
            .logical(values, LogicalField::Shipping)
            .unwrap_or(self.settings.default_shipping_category.as_str());
        let shipping_category_id = self
            .reference
            .shipping_category_named(shipping_name)
            .map(|c| c.id)
            .ok_or_else(|| RowError::NotFound {
                kind: "shipping category",
                reference: shipping_name.to_string(),
            })?;

        let tax_category_id = headers
            .logical(values, LogicalField::Tax)
            .map(|raw| self.resolve_tax_category(raw))
            .transpose()?;

        let taxon_ids = match headers.logical(values, LogicalField::Category) {
            Some(raw) => {
                let names = parser.taxon_names(raw);
                let taxons = self.reference.taxons_named(&names);
                for name in &names {
                    if !taxons.iter().any(|t| eq_ignore_case(&t.name, name)) {
                        tracing::warn!(row = row.line, taxon = %name, "taxon not found; skipping");
                    }
                }
                let mut ids: Vec<i64> = taxons.iter().map(|t| t.id).collect();
                ids.dedup();
                ids
            }
            None => Vec::new(),
        };

        let mut translations: BTreeMap<String, Translation> = BTreeMap::new();
        let mut option_cells: Vec<OptionCell> = Vec::new();
        let mut properties: Vec<PropertyValue> = Vec::new();

        for (role, value) in headers.cells(values) {
            match role {
                ColumnRole::Translation { locale, field } => {
                    translations
                        .entry(locale.clone())
                        .or_default()
                        .set(*field, value);
                }
                ColumnRole::OptionType { option_type_id } => {
                    if option_cells
                        .iter()
                        .any(|c| c.option_type.id == *option_type_id)
                    {
                        continue;
                    }
                    if let Some(option_type) = self
                        .reference
                        .option_types
                        .iter()
                        .find(|o| o.id == *option_type_id)
                    {
                        option_cells.push(OptionCell {
                            option_type: option_type.clone(),
                            fields: parser.fields(value).collect(),
                        });
                    }
                }
                ColumnRole::Property { property_id } => {
                    if !properties.iter().any(|p| p.property_id == *property_id) {
                        properties.push(PropertyValue {
                            property_id: *property_id,
                            value: value.to_string(),
                        });
                    }
                }
                ColumnRole::Logical(_) | ColumnRole::Ignored => {}
            }
        }

        // Untranslated text columns belong to the primary locale unless that
        // locale has its own column.
        let primary_locale = self.settings.locales.first().cloned().unwrap_or_default();
        {
            let base = translations.entry(primary_locale.clone()).or_default();
            for (field, logical) in [
                (TextField::Name, LogicalField::Name),
                (TextField::Description, LogicalField::Description),
                (TextField::MetaKeywords, LogicalField::MetaKeywords),
                (TextField::MetaDescription, LogicalField::MetaDescription),
            ] {
                if let Some(value) = headers.logical(values, logical) {
                    base.set(field, value);
                }
            }
        }
        translations.retain(|_, t| !t.is_empty());

        let images = headers
            .logical(values, LogicalField::Photo)
            .map(|raw| parser.items(raw).map(str::to_string).collect())
            .unwrap_or_default();

        let relation = headers
            .logical(values, LogicalField::Relations)
            .map(|key| RelationRef {
                key: key.to_string(),
                relation_type: headers
                    .logical(values, LogicalField::RelationType)
                    .map(str::to_string)
                    .or_else(|| self.settings.default_relation_type.clone()),
            });

        Ok(MappedRow {
            line: row.line,
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
        })
    }

    /// Name in the primary locale, falling back to the untranslated column
    /// and then to any other locale in configured order.
    fn product_name(&self, headers: &Headers, values: &[String]) -> Option<String> {
        let localized = |locale: &str| {
            headers.cells(values).find_map(|(role, value)| match role {
                ColumnRole::Translation {
                    locale: l,
                    field: TextField::Name,
                } if l == locale => Some(value),
                _ => None,
            })
        };

        let mut locales = self.settings.locales.iter();
        let primary = locales.next().and_then(|l| localized(l));
        primary
            .or_else(|| headers.logical(values, LogicalField::Name))
            .or_else(|| locales.find_map(|l| localized(l)))
            .map(str::to_string)
    }

    fn resolve_tax_category(&self, raw: &str) -> Result<i64, RowError> {
        let id = raw.parse::<i64>().map_err(|e| RowError::InvalidValue {
            field: "tax",
            value: raw.to_string(),
            reason: e.to_string(),
        })?;
        self.reference
            .tax_category(id)
            .map(|c| c.id)
            .ok_or_else(|| RowError::NotFound {
                kind: "tax category",
                reference: raw.to_string(),
            })
    }
}

fn parse_decimal(raw: Option<&str>, field: &'static str) -> Result<Option<Decimal>, RowError> {
    raw.map(|raw| {
        Decimal::from_str(raw).map_err(|e| RowError::InvalidValue {
            field,
            value: raw.to_string(),
            reason: e.to_string(),
        })
    })
    .transpose()
}

#[cfg(test)]
#[path = "row_test.rs"]
mod tests;
