// src/load/mod.rs
pub mod duck;
pub mod postgres;

pub use duck::DuckDbSink;
pub use postgres::PostgresSink;

use crate::config::{DatabaseConfig, TargetTable};
use crate::error::{EtlError, Result};
use crate::prepare::{ColumnKind, PreparedColumn, PreparedTable};
use std::fmt::Display;

/// Bind-parameter ceiling shared by the supported backends.
pub const MAX_PARAMS: usize = 65_535;
/// Upper bound on rows packed into one `INSERT`.
pub const MAX_ROWS_PER_STATEMENT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    pub rows: usize,
    pub statements: usize,
}

/// Write side of the pipeline. A sink owns its connection; every `load`
/// runs in one transaction that is either committed whole or rolled back.
#[async_trait::async_trait]
pub trait Sink: Send {
    async fn load(&mut self, target: &TargetTable, data: &PreparedTable) -> Result<LoadSummary>;

    /// Release the connection. Dropping the sink releases it too.
    async fn close(&mut self) -> Result<()>;
}

/// Connect to whatever `database` describes.
pub async fn open_sink(database: &DatabaseConfig) -> Result<Box<dyn Sink>> {
    match database {
        DatabaseConfig::Postgres(params) => Ok(Box::new(PostgresSink::connect(params).await?)),
        DatabaseConfig::Duckdb(params) => Ok(Box::new(DuckDbSink::open(params)?)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    DuckDb,
}

impl Dialect {
    /// Number slots carry an explicit `float8` cast in Postgres so the bound
    /// `f64` also assigns into `NUMERIC` or `REAL` columns.
    fn placeholder(self, n: usize, kind: ColumnKind) -> String {
        match (self, kind) {
            (Dialect::Postgres, ColumnKind::Number) => format!("${}::float8", n),
            (Dialect::Postgres, ColumnKind::Text) => format!("${}", n),
            (Dialect::DuckDb, _) => "?".to_string(),
        }
    }

    fn float_type(self) -> &'static str {
        match self {
            Dialect::Postgres => "DOUBLE PRECISION",
            Dialect::DuckDb => "DOUBLE",
        }
    }
}

/// Double-quote an identifier, doubling embedded quotes. Dotted names are
/// quoted per part so `public.gdp` stays schema-qualified.
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

pub fn create_table_sql(dialect: Dialect, table: &str, columns: &[PreparedColumn]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .map(|c| {
            let ty = match c.kind {
                ColumnKind::Text => "TEXT",
                ColumnKind::Number => dialect.float_type(),
            };
            format!("{} {}", quote_ident(&c.name), ty)
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        defs.join(", ")
    )
}

/// Multi-row parameterized insert for `rows` rows of `columns`.
pub fn insert_sql(dialect: Dialect, table: &str, columns: &[PreparedColumn], rows: usize) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();
    let width = columns.len();
    let tuples: Vec<String> = (0..rows)
        .map(|r| {
            let slots: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(c, col)| dialect.placeholder(r * width + c + 1, col.kind))
                .collect();
            format!("({})", slots.join(", "))
        })
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table),
        names.join(", "),
        tuples.join(", ")
    )
}

pub fn rows_per_statement(columns: usize) -> usize {
    (MAX_PARAMS / columns.max(1)).clamp(1, MAX_ROWS_PER_STATEMENT)
}

pub(crate) fn insert_error(table: &str, err: impl Display) -> EtlError {
    EtlError::Insert {
        table: table.to_string(),
        message: err.to_string(),
    }
}
