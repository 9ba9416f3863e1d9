use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment, ImportSettings};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let non_empty = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        if raw.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(raw.trim().to_string())
    };

    // Separators are stored as given; a tab or space is a valid delimiter.
    let separator = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        if raw.is_empty() {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(raw)
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("CATIMP_ENV", "development"))?;
    let log_level = or_default("CATIMP_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("CATIMP_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("CATIMP_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("CATIMP_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let defaults = ImportSettings::default();
    let item_delimiter = separator("CATIMP_ITEM_DELIMITER", &defaults.item_delimiter)?;
    let key_separator = separator("CATIMP_KEY_SEPARATOR", &defaults.key_separator)?;
    let taxon_separator = separator("CATIMP_TAXON_SEPARATOR", &defaults.taxon_separator)?;

    if key_separator == item_delimiter {
        return Err(ConfigError::InvalidEnvVar {
            var: "CATIMP_KEY_SEPARATOR".to_string(),
            reason: "must differ from CATIMP_ITEM_DELIMITER".to_string(),
        });
    }

    let default_sku_pattern =
        non_empty("CATIMP_DEFAULT_SKU_PATTERN", &defaults.default_sku_pattern)?;
    let default_shipping_category = non_empty(
        "CATIMP_DEFAULT_SHIPPING_CATEGORY",
        &defaults.default_shipping_category,
    )?;
    let default_relation_type = optional("CATIMP_DEFAULT_RELATION_TYPE");
    let locales = parse_locales(&or_default("CATIMP_LOCALES", "en"))?;
    let media_root = PathBuf::from(or_default("CATIMP_MEDIA_ROOT", "./media"));
    let header_aliases_path = optional("CATIMP_HEADER_ALIASES_PATH").map(PathBuf::from);

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        import: ImportSettings {
            item_delimiter,
            key_separator,
            taxon_separator,
            default_sku_pattern,
            default_shipping_category,
            default_relation_type,
            locales,
            media_root,
            header_aliases_path,
        },
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CATIMP_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

/// Split a comma-separated locale list, lowercasing and dropping blanks.
fn parse_locales(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut locales: Vec<String> = Vec::new();
    for code in raw.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidEnvVar {
                var: "CATIMP_LOCALES".to_string(),
                reason: format!("locale \"{code}\" must be alphabetic"),
            });
        }
        let code = code.to_ascii_lowercase();
        if !locales.contains(&code) {
            locales.push(code);
        }
    }

    if locales.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "CATIMP_LOCALES".to_string(),
            reason: "at least one locale is required".to_string(),
        });
    }

    Ok(locales)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
