use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("failed to open {path:?}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error: {0}")]
    Parse(String),

    #[error("column `{0}` not found in CSV header")]
    MissingColumn(String),

    #[error("row {row}, column `{column}`: cannot coerce {value:?} to a number")]
    Coerce {
        row: usize,
        column: String,
        value: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    #[error("insert into `{table}` failed: {message}")]
    Insert { table: String, message: String },
}

impl From<csv::Error> for EtlError {
    fn from(err: csv::Error) -> Self {
        EtlError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
