use std::env;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, AppResult};

pub const DEFAULT_SOURCE_TABLE: &str = "YeryuzuDoktorlari_Project";

// Plain or schema-qualified identifier, optionally bracket-quoted per part.
static RE_TABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\[?[A-Za-z_][A-Za-z0-9_]*\]?\.)?\[?[A-Za-z_][A-Za-z0-9_]*\]?$").unwrap()
});

#[derive(Clone, Debug)]
pub struct Config {
    /// ADO.NET connection string of the legacy SQL Server database
    pub source_database_url: String,
    /// PostgreSQL URL of the destination database
    pub database_url: String,
    pub source_table: String,
    pub report_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let source_table =
            env::var("SOURCE_TABLE").unwrap_or_else(|_| DEFAULT_SOURCE_TABLE.to_string());

        let config = Config {
            source_database_url: required("SOURCE_DATABASE_URL")?,
            database_url: required("DATABASE_URL")?,
            source_table,
            report_path: env::var("MIGRATION_REPORT_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    /// The source table is interpolated into the extraction query, so only
    /// identifiers are accepted.
    pub fn validate(&self) -> AppResult<()> {
        if !RE_TABLE_NAME.is_match(&self.source_table) {
            return Err(AppError::Config(format!(
                "SOURCE_TABLE is not a valid table name: {}",
                self.source_table
            )));
        }
        Ok(())
    }
}

fn required(key: &str) -> AppResult<String> {
    env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{} must be set", key)))
}
