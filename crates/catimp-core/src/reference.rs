//! Snapshot of the catalog lookup tables a batch resolves rows against.
//!
//! Loaded once per batch by the db layer. Everything here is read-only while
//! a batch runs; products themselves are looked up live.

use crate::field::{eq_ignore_case, ParsedField};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingCategoryRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxCategoryRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionValueRef {
    pub id: i64,
    pub name: String,
    pub presentation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionTypeRef {
    pub id: i64,
    pub name: String,
    pub presentation: String,
    pub values: Vec<OptionValueRef>,
}

impl OptionTypeRef {
    /// Finds the option value whose name or presentation equals the field's
    /// key or label, ignoring case. Keys are tried before labels.
    #[must_use]
    pub fn match_value(&self, field: &ParsedField) -> Option<&OptionValueRef> {
        field.candidates().find_map(|candidate| {
            self.values.iter().find(|v| {
                eq_ignore_case(&v.name, candidate)
                    || eq_ignore_case(&v.presentation, candidate)
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRef {
    pub id: i64,
    pub name: String,
    pub presentation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTypeRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogReference {
    pub shipping_categories: Vec<ShippingCategoryRef>,
    pub tax_categories: Vec<TaxCategoryRef>,
    pub taxons: Vec<TaxonRef>,
    pub option_types: Vec<OptionTypeRef>,
    pub properties: Vec<PropertyRef>,
    pub relation_types: Vec<RelationTypeRef>,
}

impl CatalogReference {
    #[must_use]
    pub fn shipping_category_named(&self, name: &str) -> Option<&ShippingCategoryRef> {
        let name = name.trim();
        self.shipping_categories
            .iter()
            .find(|c| eq_ignore_case(&c.name, name))
    }

    /// Tax categories are referenced by numeric id.
    #[must_use]
    pub fn tax_category(&self, id: i64) -> Option<&TaxCategoryRef> {
        self.tax_categories.iter().find(|c| c.id == id)
    }

    /// All taxons carrying one of `names`. Several taxons may share a name in
    /// different parts of the tree; each of them is returned.
    #[must_use]
    pub fn taxons_named(&self, names: &[String]) -> Vec<&TaxonRef> {
        self.taxons
            .iter()
            .filter(|t| names.iter().any(|n| eq_ignore_case(&t.name, n)))
            .collect()
    }

    #[must_use]
    pub fn option_type_named(&self, name: &str) -> Option<&OptionTypeRef> {
        let name = name.trim();
        self.option_types
            .iter()
            .find(|o| eq_ignore_case(&o.name, name))
    }

    #[must_use]
    pub fn property_named(&self, name: &str) -> Option<&PropertyRef> {
        let name = name.trim();
        self.properties
            .iter()
            .find(|p| eq_ignore_case(&p.name, name))
    }

    /// Resolves a relation type given either its numeric id or its name.
    #[must_use]
    pub fn relation_type(&self, reference: &str) -> Option<&RelationTypeRef> {
        let reference = reference.trim();
        if let Ok(id) = reference.parse::<i64>() {
            return self.relation_types.iter().find(|r| r.id == id);
        }
        self.relation_types
            .iter()
            .find(|r| eq_ignore_case(&r.name, reference))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A small catalog used across core tests.
    pub(crate) fn catalog() -> CatalogReference {
        CatalogReference {
            shipping_categories: vec![
                ShippingCategoryRef {
                    id: 1,
                    name: "Default".to_string(),
                },
                ShippingCategoryRef {
                    id: 2,
                    name: "Oversized".to_string(),
                },
            ],
            tax_categories: vec![TaxCategoryRef {
                id: 7,
                name: "Clothing".to_string(),
            }],
            taxons: vec![
                TaxonRef {
                    id: 10,
                    name: "Shirts".to_string(),
                },
                TaxonRef {
                    id: 11,
                    name: "Sale".to_string(),
                },
                TaxonRef {
                    id: 12,
                    name: "Shirts".to_string(),
                },
            ],
            option_types: vec![
                OptionTypeRef {
                    id: 20,
                    name: "color".to_string(),
                    presentation: "Color".to_string(),
                    values: vec![
                        OptionValueRef {
                            id: 201,
                            name: "red".to_string(),
                            presentation: "Red".to_string(),
                        },
                        OptionValueRef {
                            id: 202,
                            name: "blue".to_string(),
                            presentation: "Blue".to_string(),
                        },
                        OptionValueRef {
                            id: 203,
                            name: "green".to_string(),
                            presentation: "Green".to_string(),
                        },
                    ],
                },
                OptionTypeRef {
                    id: 21,
                    name: "size".to_string(),
                    presentation: "Size".to_string(),
                    values: vec![
                        OptionValueRef {
                            id: 211,
                            name: "s".to_string(),
                            presentation: "Small".to_string(),
                        },
                        OptionValueRef {
                            id: 212,
                            name: "m".to_string(),
                            presentation: "Medium".to_string(),
                        },
                    ],
                },
            ],
            properties: vec![PropertyRef {
                id: 30,
                name: "material".to_string(),
                presentation: "Material".to_string(),
            }],
            relation_types: vec![RelationTypeRef {
                id: 40,
                name: "Related Products".to_string(),
            }],
        }
    }
}
