use duckdb::{params_from_iter, types::Value, Connection, Transaction};
use tracing::{info, warn};

use super::{
    create_table_sql, insert_error, insert_sql, rows_per_statement, Dialect, LoadSummary, Sink,
};
use crate::config::{DuckDbParams, TargetTable};
use crate::error::{EtlError, Result};
use crate::prepare::{LoadValue, PreparedTable};

/// Embedded DuckDB target backed by a database file.
pub struct DuckDbSink {
    conn: Option<Connection>,
}

impl DuckDbSink {
    /// Open the database at `params.path`, creating the file if it doesn't
    /// exist.
    pub fn open(params: &DuckDbParams) -> Result<Self> {
        let path = params
            .path
            .as_ref()
            .ok_or_else(|| EtlError::Config("duckdb path is not set".into()))?;
        let conn =
            Connection::open(path).map_err(|e| EtlError::DatabaseConnection(e.to_string()))?;
        Ok(DuckDbSink { conn: Some(conn) })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EtlError::DatabaseConnection(e.to_string()))?;
        Ok(DuckDbSink { conn: Some(conn) })
    }

    /// `None` once the sink has been closed.
    pub fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }
}

fn to_duck(value: &LoadValue) -> Value {
    match value {
        LoadValue::Text(Some(s)) => Value::Text(s.clone()),
        LoadValue::Number(Some(n)) => Value::Double(*n),
        LoadValue::Text(None) | LoadValue::Number(None) => Value::Null,
    }
}

fn insert_all(
    tx: &Transaction<'_>,
    target: &TargetTable,
    data: &PreparedTable,
) -> duckdb::Result<LoadSummary> {
    if target.create {
        tx.execute_batch(&create_table_sql(Dialect::DuckDb, &target.name, &data.columns))?;
    }

    let mut summary = LoadSummary::default();
    for chunk in data.rows.chunks(rows_per_statement(data.columns.len())) {
        let sql = insert_sql(Dialect::DuckDb, &target.name, &data.columns, chunk.len());
        let values: Vec<Value> = chunk.iter().flatten().map(to_duck).collect();
        summary.rows += tx.execute(&sql, params_from_iter(values))?;
        summary.statements += 1;
    }
    Ok(summary)
}

#[async_trait::async_trait]
impl Sink for DuckDbSink {
    async fn load(&mut self, target: &TargetTable, data: &PreparedTable) -> Result<LoadSummary> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| EtlError::DatabaseConnection("connection already closed".into()))?;
        let tx = conn
            .transaction()
            .map_err(|e| insert_error(&target.name, e))?;

        match insert_all(&tx, target, data) {
            Ok(summary) => {
                tx.commit().map_err(|e| insert_error(&target.name, e))?;
                info!(table = %target.name, rows = summary.rows, statements = summary.statements, "committed");
                Ok(summary)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback() {
                    warn!(table = %target.name, error = %rb, "rollback failed");
                }
                Err(insert_error(&target.name, e))
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, e)| EtlError::DatabaseConnection(e.to_string()))?;
        }
        Ok(())
    }
}
