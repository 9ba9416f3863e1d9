pub mod aliases;
pub mod app_config;
pub mod config;
pub mod field;
pub mod outcome;
pub mod plan;
pub mod reference;
pub mod relation;
pub mod row;

pub use aliases::{load_header_aliases, HeaderAliases, LogicalField};
pub use app_config::{AppConfig, Environment, ImportSettings};
pub use config::{load_app_config, load_app_config_from_env};
pub use field::{FieldParser, ParsedField};
pub use outcome::{BatchSummary, RowOutcome};
pub use plan::{ImagePlan, OptionAxis, ProductPlan, TranslationPlan, VariantPlan};
pub use reference::{
    CatalogReference, OptionTypeRef, OptionValueRef, PropertyRef, RelationTypeRef,
    ShippingCategoryRef, TaxCategoryRef, TaxonRef,
};
pub use relation::{symmetric_edges, LinkedProduct, RelationEdge, RelationIntent, RelationLinker};
pub use row::{Headers, MappedRow, ProductIdentity, PropertyValue, RelationRef, Row, RowMapper};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read header alias file {path}: {source}")]
    AliasFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse header alias file: {0}")]
    AliasFileParse(#[source] serde_yaml::Error),

    #[error("header alias validation failed: {0}")]
    Validation(String),
}

/// A condition that fails a single row. The batch continues with the next row.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("{kind} not found: {reference}")]
    NotFound {
        kind: &'static str,
        reference: String,
    },

    #[error("invalid {field} value \"{value}\": {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}
