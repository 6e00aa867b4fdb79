use tokio::task::JoinHandle;
use tokio_postgres::{
    tls::NoTlsStream, types::ToSql, Client, Connection, NoTls, Socket, Transaction,
};
use tracing::{error, info, warn};

use super::{
    create_table_sql, insert_error, insert_sql, rows_per_statement, Dialect, LoadSummary, Sink,
};
use crate::config::{PostgresParams, TargetTable};
use crate::error::{EtlError, Result};
use crate::prepare::{LoadValue, PreparedTable};

/// PostgreSQL target. Owns the client and the task driving its connection;
/// both are released on `close` or drop.
pub struct PostgresSink {
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
}

impl PostgresSink {
    pub async fn connect(params: &PostgresParams) -> Result<Self> {
        info!(host = %params.host, port = params.port, dbname = ?params.dbname, "connecting to postgres");
        let mut cfg = tokio_postgres::Config::new();
        cfg.host(params.host.as_str()).port(params.port);
        if let Some(dbname) = &params.dbname {
            cfg.dbname(dbname.as_str());
        }
        if let Some(user) = &params.user {
            cfg.user(user.as_str());
        }
        if let Some(password) = &params.password {
            cfg.password(password.as_str());
        }
        let (client, connection) = cfg
            .connect(NoTls)
            .await
            .map_err(|e| EtlError::DatabaseConnection(e.to_string()))?;
        Ok(Self::spawn(client, connection))
    }

    /// Connect with a libpq-style URL or key/value string.
    pub async fn connect_url(url: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| EtlError::DatabaseConnection(e.to_string()))?;
        Ok(Self::spawn(client, connection))
    }

    fn spawn(client: Client, connection: Connection<Socket, NoTlsStream>) -> Self {
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("postgres connection error: {}", e);
            }
        });
        PostgresSink {
            client: Some(client),
            driver: Some(driver),
        }
    }

    pub fn client(&self) -> Option<&Client> {
        self.client.as_ref()
    }
}

impl Drop for PostgresSink {
    fn drop(&mut self) {
        self.client.take();
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

fn to_param(value: &LoadValue) -> &(dyn ToSql + Sync) {
    match value {
        LoadValue::Text(s) => s as &(dyn ToSql + Sync),
        LoadValue::Number(n) => n as &(dyn ToSql + Sync),
    }
}

async fn insert_all(
    tx: &Transaction<'_>,
    target: &TargetTable,
    data: &PreparedTable,
) -> std::result::Result<LoadSummary, tokio_postgres::Error> {
    if target.create {
        tx.batch_execute(&create_table_sql(Dialect::Postgres, &target.name, &data.columns))
            .await?;
    }

    let mut summary = LoadSummary::default();
    for chunk in data.rows.chunks(rows_per_statement(data.columns.len())) {
        let sql = insert_sql(Dialect::Postgres, &target.name, &data.columns, chunk.len());
        let params: Vec<&(dyn ToSql + Sync)> = chunk.iter().flatten().map(to_param).collect();
        summary.rows += tx.execute(sql.as_str(), &params).await? as usize;
        summary.statements += 1;
    }
    Ok(summary)
}

#[async_trait::async_trait]
impl Sink for PostgresSink {
    async fn load(&mut self, target: &TargetTable, data: &PreparedTable) -> Result<LoadSummary> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| EtlError::DatabaseConnection("connection already closed".into()))?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| insert_error(&target.name, e))?;

        match insert_all(&tx, target, data).await {
            Ok(summary) => {
                tx.commit().await.map_err(|e| insert_error(&target.name, e))?;
                info!(table = %target.name, rows = summary.rows, statements = summary.statements, "committed");
                Ok(summary)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    warn!(table = %target.name, error = %rb, "rollback failed");
                }
                Err(insert_error(&target.name, e))
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.client.take();
        if let Some(driver) = self.driver.take() {
            driver
                .await
                .map_err(|e| EtlError::DatabaseConnection(e.to_string()))?;
        }
        Ok(())
    }
}
