use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{EtlError, Result};

pub const DEFAULT_CSV_PATH: &str = "data/2020-2025.csv";

/// Runtime settings. Read from an optional YAML file, then overridden by
/// `GDP_*` environment variables. Credentials have no built-in values.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub csv_path: PathBuf,
    /// Rows printed after extraction.
    pub head_rows: usize,
    pub target: TargetTable,
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            head_rows: 5,
            target: TargetTable::default(),
            database: DatabaseConfig::Postgres(PostgresParams::default()),
        }
    }
}

/// Destination table layout.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TargetTable {
    pub name: String,
    pub key_column: String,
    pub numeric_columns: Vec<String>,
    /// Issue `CREATE TABLE IF NOT EXISTS` before loading.
    pub create: bool,
}

impl Default for TargetTable {
    fn default() -> Self {
        TargetTable {
            name: "gdp".into(),
            key_column: "Country".into(),
            numeric_columns: (2020..=2025).map(|y| y.to_string()).collect(),
            create: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Postgres(PostgresParams),
    Duckdb(DuckDbParams),
}

#[derive(Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PostgresParams {
    pub host: String,
    pub port: u16,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for PostgresParams {
    fn default() -> Self {
        PostgresParams {
            host: "localhost".into(),
            port: 5432,
            dbname: None,
            user: None,
            password: None,
        }
    }
}

impl fmt::Debug for PostgresParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// `path` must be set before loading; an unset path only passes through
/// configuration so `validate` can report it.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DuckDbParams {
    pub path: Option<PathBuf>,
}

impl Config {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Config::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        debug!(?cfg, "configuration loaded");
        Ok(cfg)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| EtlError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| EtlError::Config(e.to_string()))
    }

    /// Apply `GDP_*` overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GDP_CSV_PATH") {
            self.csv_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("GDP_TABLE") {
            self.target.name = v;
        }

        match lookup("GDP_DB_KIND").as_deref() {
            None => {}
            Some("postgres") => {
                if !matches!(self.database, DatabaseConfig::Postgres(_)) {
                    self.database = DatabaseConfig::Postgres(PostgresParams::default());
                }
            }
            Some("duckdb") => {
                if !matches!(self.database, DatabaseConfig::Duckdb(_)) {
                    self.database = DatabaseConfig::Duckdb(DuckDbParams::default());
                }
            }
            Some(other) => {
                return Err(EtlError::Config(format!(
                    "GDP_DB_KIND must be `postgres` or `duckdb`, got `{}`",
                    other
                )))
            }
        }

        match &mut self.database {
            DatabaseConfig::Postgres(pg) => {
                if let Some(v) = lookup("GDP_DB_HOST") {
                    pg.host = v;
                }
                if let Some(v) = lookup("GDP_DB_PORT") {
                    pg.port = v
                        .parse()
                        .map_err(|_| EtlError::Config(format!("GDP_DB_PORT: bad port `{}`", v)))?;
                }
                if let Some(v) = lookup("GDP_DB_NAME") {
                    pg.dbname = Some(v);
                }
                if let Some(v) = lookup("GDP_DB_USER") {
                    pg.user = Some(v);
                }
                if let Some(v) = lookup("GDP_DB_PASSWORD") {
                    pg.password = Some(v);
                }
            }
            DatabaseConfig::Duckdb(duck) => {
                if let Some(v) = lookup("GDP_DUCKDB_PATH") {
                    duck.path = Some(PathBuf::from(v));
                }
            }
        }
        Ok(())
    }

    /// Check everything a load needs is present.
    pub fn validate(&self) -> Result<()> {
        if self.target.name.trim().is_empty() {
            return Err(EtlError::Config("target table name is empty".into()));
        }
        if self.target.key_column.trim().is_empty() {
            return Err(EtlError::Config("key column is empty".into()));
        }
        if let DatabaseConfig::Postgres(pg) = &self.database {
            let required = [
                ("database name (GDP_DB_NAME)", &pg.dbname),
                ("user (GDP_DB_USER)", &pg.user),
                ("password (GDP_DB_PASSWORD)", &pg.password),
            ];
            for (what, value) in required {
                if value.as_deref().map_or(true, str::is_empty) {
                    return Err(EtlError::Config(format!("postgres {} is not set", what)));
                }
            }
        }
        if let DatabaseConfig::Duckdb(DuckDbParams { path: None }) = &self.database {
            // an in-memory database would be discarded at exit
            return Err(EtlError::Config(
                "duckdb path (GDP_DUCKDB_PATH) is not set".into(),
            ));
        }
        Ok(())
    }
}
