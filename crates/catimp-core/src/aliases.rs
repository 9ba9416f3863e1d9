//! Header alias map: which spreadsheet column feeds which logical field.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// A column the importer understands regardless of the catalog contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalField {
    Sku,
    MasterSku,
    SkuPattern,
    Name,
    Description,
    MetaDescription,
    MetaKeywords,
    Price,
    CostPrice,
    AvailableOn,
    Category,
    Shipping,
    Tax,
    Photo,
    Relations,
    RelationType,
}

impl LogicalField {
    pub const ALL: [LogicalField; 16] = [
        LogicalField::Sku,
        LogicalField::MasterSku,
        LogicalField::SkuPattern,
        LogicalField::Name,
        LogicalField::Description,
        LogicalField::MetaDescription,
        LogicalField::MetaKeywords,
        LogicalField::Price,
        LogicalField::CostPrice,
        LogicalField::AvailableOn,
        LogicalField::Category,
        LogicalField::Shipping,
        LogicalField::Tax,
        LogicalField::Photo,
        LogicalField::Relations,
        LogicalField::RelationType,
    ];

    /// Built-in header names for this field. The first entry is the canonical one.
    #[must_use]
    pub fn default_aliases(self) -> &'static [&'static str] {
        match self {
            LogicalField::Sku => &["sku"],
            LogicalField::MasterSku => &["master_sku", "mastersku"],
            LogicalField::SkuPattern => &["sku_pattern", "skupattern"],
            LogicalField::Name => &["name"],
            LogicalField::Description => &["description"],
            LogicalField::MetaDescription => &["meta_description", "metadescription"],
            LogicalField::MetaKeywords => &["meta_keywords", "metakeywords"],
            LogicalField::Price => &["price"],
            LogicalField::CostPrice => &["cost_price", "costprice"],
            LogicalField::AvailableOn => &["available_on", "availableon"],
            LogicalField::Category => &["category", "categories", "taxons"],
            LogicalField::Shipping => &["shipping", "shipping_category"],
            LogicalField::Tax => &["tax", "tax_category", "tax_category_id"],
            LogicalField::Photo => &["photo", "photos", "images"],
            LogicalField::Relations => &["relations", "related", "relation"],
            LogicalField::RelationType => &["relation_type", "relationtype"],
        }
    }
}

impl std::fmt::Display for LogicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.default_aliases()[0])
    }
}

#[derive(Debug, Deserialize)]
struct AliasFile {
    #[serde(default)]
    aliases: BTreeMap<LogicalField, Vec<String>>,
}

/// Case-insensitive lookup from header name to [`LogicalField`].
#[derive(Debug, Clone)]
pub struct HeaderAliases {
    by_header: HashMap<String, LogicalField>,
}

impl Default for HeaderAliases {
    fn default() -> Self {
        let mut by_header = HashMap::new();
        for field in LogicalField::ALL {
            for alias in field.default_aliases() {
                by_header.insert(normalize_header(alias), field);
            }
        }
        Self { by_header }
    }
}

impl HeaderAliases {
    /// Returns the logical field a header maps to, if any.
    #[must_use]
    pub fn resolve(&self, header: &str) -> Option<LogicalField> {
        self.by_header.get(&normalize_header(header)).copied()
    }

    /// Adds extra aliases on top of the built-in set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if an alias is blank or already
    /// belongs to a different field.
    pub fn extend<I, S>(&mut self, field: LogicalField, aliases: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for alias in aliases {
            let key = normalize_header(alias.as_ref());
            if key.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "blank alias for field '{field}'"
                )));
            }
            match self.by_header.get(&key) {
                Some(existing) if *existing != field => {
                    return Err(ConfigError::Validation(format!(
                        "alias '{key}' is mapped to both '{existing}' and '{field}'"
                    )));
                }
                _ => {
                    self.by_header.insert(key, field);
                }
            }
        }
        Ok(())
    }
}

/// Load the header alias map, merging a YAML override file into the built-in
/// aliases when `path` is given.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_header_aliases(path: Option<&Path>) -> Result<HeaderAliases, ConfigError> {
    let mut aliases = HeaderAliases::default();
    let Some(path) = path else {
        return Ok(aliases);
    };

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::AliasFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: AliasFile = serde_yaml::from_str(&content).map_err(ConfigError::AliasFileParse)?;
    for (field, extra) in file.aliases {
        aliases.extend(field, extra)?;
    }

    Ok(aliases)
}

/// Lowercase and trim a header, folding spaces and dashes to underscores.
pub(crate) fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn resolves_canonical_names_case_insensitively() {
        let aliases = HeaderAliases::default();
        assert_eq!(aliases.resolve("SKU"), Some(LogicalField::Sku));
        assert_eq!(aliases.resolve(" Master SKU "), Some(LogicalField::MasterSku));
        assert_eq!(aliases.resolve("relationType"), Some(LogicalField::RelationType));
        assert_eq!(aliases.resolve("Photos"), Some(LogicalField::Photo));
        assert_eq!(aliases.resolve("color"), None);
    }

    #[test]
    fn every_field_has_a_canonical_alias() {
        let aliases = HeaderAliases::default();
        for field in LogicalField::ALL {
            assert_eq!(aliases.resolve(&field.to_string()), Some(field));
        }
    }

    #[test]
    fn extend_rejects_conflicting_alias() {
        let mut aliases = HeaderAliases::default();
        let err = aliases
            .extend(LogicalField::Photo, ["sku"])
            .expect_err("expected conflict");
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("sku")));
    }

    #[test]
    fn extend_accepts_repeated_alias_for_same_field() {
        let mut aliases = HeaderAliases::default();
        aliases
            .extend(LogicalField::Photo, ["photo", "Bilder"])
            .expect("expected ok");
        assert_eq!(aliases.resolve("bilder"), Some(LogicalField::Photo));
    }

    #[test]
    fn load_without_path_returns_defaults() {
        let aliases = load_header_aliases(None).expect("expected ok");
        assert_eq!(aliases.resolve("category"), Some(LogicalField::Category));
    }

    #[test]
    fn load_merges_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "aliases:\n  category: [\"Kategorie\"]\n  photo: [bild, bilder]\n"
        )
        .expect("write");

        let aliases = load_header_aliases(Some(file.path())).expect("expected ok");
        assert_eq!(aliases.resolve("kategorie"), Some(LogicalField::Category));
        assert_eq!(aliases.resolve("BILD"), Some(LogicalField::Photo));
        assert_eq!(aliases.resolve("category"), Some(LogicalField::Category));
    }

    #[test]
    fn load_rejects_unknown_field() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "aliases:\n  colour: [farbe]\n").expect("write");

        let err = load_header_aliases(Some(file.path())).expect_err("expected parse error");
        assert!(matches!(err, ConfigError::AliasFileParse(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_header_aliases(Some(Path::new("/nonexistent/headers.yaml")))
            .expect_err("expected io error");
        assert!(matches!(err, ConfigError::AliasFileIo { .. }));
    }
}
