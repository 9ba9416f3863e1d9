use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Settings that shape how a CSV row is read and mapped onto catalog records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    /// Separates items inside one cell, e.g. `"Red|Blue"`.
    pub item_delimiter: String,
    /// Separates an explicit key from its label inside one item, e.g. `"red:Red"`.
    pub key_separator: String,
    /// Separates taxonomy path segments, e.g. `"Clothing > Shirts"`.
    pub taxon_separator: String,
    /// Used when the row carries no `sku_pattern` column.
    pub default_sku_pattern: String,
    /// Shipping category name used when the shipping column is blank.
    pub default_shipping_category: String,
    /// Relation type (id or name) used when the row has a relation key but no type.
    pub default_relation_type: Option<String>,
    /// Locale codes whose `<locale><field>` translation columns are recognized.
    pub locales: Vec<String>,
    /// Image filenames are resolved relative to this directory.
    pub media_root: PathBuf,
    /// Optional YAML file overriding the built-in header aliases.
    pub header_aliases_path: Option<PathBuf>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            item_delimiter: "|".to_string(),
            key_separator: ":".to_string(),
            taxon_separator: ">".to_string(),
            default_sku_pattern: "{name}-{options}".to_string(),
            default_shipping_category: "Default".to_string(),
            default_relation_type: None,
            locales: vec!["en".to_string()],
            media_root: PathBuf::from("./media"),
            header_aliases_path: None,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub import: ImportSettings,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("import", &self.import)
            .finish()
    }
}
