//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use crate::{DEFAULT_MAX_POOL_SIZE, DEFAULT_SCHEMA};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Where the two schemas come from
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    /// Reference database (or snapshot file)
    pub left_uri: String,
    /// Target database (or snapshot file)
    pub right_uri: String,
    /// Database schema (namespace) to inspect
    pub schema: String,
    /// Connections per inspected database
    pub max_pool_size: usize,
}

/// Where the results are written
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub info_file: PathBuf,
    pub errors_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            info_file: PathBuf::from("compare_info.json"),
            errors_file: PathBuf::from("compare_errors.json"),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub sources: SourcesConfig,
    /// Raw ignore clauses, parsed later so errors point at the clause
    pub ignores: Vec<String>,
    /// Tables left out of the comparison entirely
    pub ignore_tables: Vec<String>,
    pub output: OutputConfig,
}

impl Settings {
    /// Load settings from the environment, after reading `.env` if present
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is not an error
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; `load` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };

        let max_pool_size = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(format!("DB_MAX_CONNECTIONS={} is not a positive integer", raw))
                })?,
            None => DEFAULT_MAX_POOL_SIZE,
        };

        let sources = SourcesConfig {
            left_uri: required("LEFT_DATABASE_URL")?,
            right_uri: required("RIGHT_DATABASE_URL")?,
            schema: lookup("SCHEMADIFF_SCHEMA")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            max_pool_size,
        };

        let ignores = lookup("SCHEMADIFF_IGNORES")
            .map(|s| split_list(&s))
            .unwrap_or_default();
        let ignore_tables = lookup("SCHEMADIFF_IGNORE_TABLES")
            .map(|s| split_list(&s))
            .unwrap_or_default();

        let defaults = OutputConfig::default();
        let output = OutputConfig {
            info_file: lookup("SCHEMADIFF_INFO_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.info_file),
            errors_file: lookup("SCHEMADIFF_ERRORS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.errors_file),
        };

        Ok(Self {
            sources,
            ignores,
            ignore_tables,
            output,
        })
    }
}

/// Comma separated entries; blank entries are skipped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_output_config() {
        let config = OutputConfig::default();
        assert_eq!(config.info_file, PathBuf::from("compare_info.json"));
        assert_eq!(config.errors_file, PathBuf::from("compare_errors.json"));
    }

    #[test]
    fn test_minimal_settings() {
        let settings = Settings::from_lookup(lookup(&[
            ("LEFT_DATABASE_URL", "postgres://u:p@a/db"),
            ("RIGHT_DATABASE_URL", "postgres://u:p@b/db"),
        ]))
        .unwrap();

        assert_eq!(settings.sources.schema, DEFAULT_SCHEMA);
        assert_eq!(settings.sources.max_pool_size, DEFAULT_MAX_POOL_SIZE);
        assert!(settings.ignores.is_empty());
        assert!(settings.ignore_tables.is_empty());
    }

    #[test]
    fn test_ignores_are_split_on_commas() {
        let settings = Settings::from_lookup(lookup(&[
            ("LEFT_DATABASE_URL", "left.json"),
            ("RIGHT_DATABASE_URL", "right.json"),
            ("SCHEMADIFF_IGNORES", "users.col.nickname, orders.pk.id,,"),
            ("SCHEMADIFF_IGNORE_TABLES", " alembic_version , "),
        ]))
        .unwrap();

        assert_eq!(settings.ignores, vec!["users.col.nickname", "orders.pk.id"]);
        assert_eq!(settings.ignore_tables, vec!["alembic_version"]);
    }

    #[test]
    fn test_missing_uri() {
        let err = Settings::from_lookup(lookup(&[("LEFT_DATABASE_URL", "left.json")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "RIGHT_DATABASE_URL"));
    }

    #[test]
    fn test_invalid_pool_size() {
        let err = Settings::from_lookup(lookup(&[
            ("LEFT_DATABASE_URL", "left.json"),
            ("RIGHT_DATABASE_URL", "right.json"),
            ("DB_MAX_CONNECTIONS", "zero"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
