// src/pipeline.rs
//
// Extract -> diagnose -> prepare -> load, one stage after another.

use tracing::{error, info};

use crate::config::Config;
use crate::diagnose::{self, Diagnostics};
use crate::error::Result;
use crate::extract::{self, GdpTable};
use crate::load::{self, LoadSummary, Sink};
use crate::prepare;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows_read: usize,
    pub diagnostics: Diagnostics,
    /// `None` when the load stage was skipped.
    pub load: Option<LoadSummary>,
}

/// Read the configured CSV and print its first rows.
pub fn extract(config: &Config) -> Result<GdpTable> {
    let table = extract::load_csv(&config.csv_path)?;
    println!("{}", table.head(config.head_rows));
    Ok(table)
}

/// Run every check and print the report to stdout.
pub fn diagnose(table: &GdpTable, config: &Config) -> Diagnostics {
    let diagnostics = diagnose::run(table, &config.target.key_column);
    println!("{}", diagnostics);
    diagnostics
}

/// Prepare `table` and write it through `sink` in one transaction.
pub async fn load(table: &GdpTable, config: &Config, sink: &mut dyn Sink) -> Result<LoadSummary> {
    let prepared = prepare::prepare(table, &config.target)?;
    let summary = sink.load(&config.target, &prepared).await?;
    info!(
        table = %config.target.name,
        rows = summary.rows,
        "load complete"
    );
    Ok(summary)
}

/// All stages. Diagnostics are printed before the database is opened. With
/// `with_load` unset the run stops after them. The sink is closed whether or
/// not the load succeeds.
pub async fn run(config: &Config, with_load: bool) -> Result<RunSummary> {
    let table = extract(config)?;
    let diagnostics = diagnose(&table, config);

    let loaded = if with_load {
        let mut sink = load::open_sink(&config.database).await?;
        let result = load(&table, config, sink.as_mut()).await;
        let closed = sink.close().await;
        match (result, closed) {
            (Ok(summary), Ok(())) => Some(summary),
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    error!("closing database connection: {}", close_err);
                }
                return Err(e);
            }
        }
    } else {
        info!("load skipped");
        None
    };

    Ok(RunSummary {
        rows_read: table.len(),
        diagnostics,
        load: loaded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, DuckDbParams};
    use crate::load::DuckDbSink;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,gdpload=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn config_for(csv: &NamedTempFile, db_dir: &TempDir) -> Config {
        Config {
            csv_path: csv.path().to_path_buf(),
            database: DatabaseConfig::Duckdb(DuckDbParams {
                path: Some(db_dir.path().join("gdp.duckdb")),
            }),
            ..Config::default()
        }
    }

    fn csv_file(content: &str) -> anyhow::Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(content.as_bytes())?;
        Ok(tmp)
    }

    /// Reopen the database file a run wrote and count rows matching `sql`.
    fn query_count(db_dir: &TempDir, sql: &str) -> anyhow::Result<i64> {
        let path = db_dir.path().join("gdp.duckdb");
        let conn = duckdb::Connection::open(path)?;
        Ok(conn.query_row(sql, [], |r| r.get(0))?)
    }

    #[tokio::test]
    async fn scenario_end_to_end() -> anyhow::Result<()> {
        init_test_logging();
        let csv = csv_file("Country,2020,2021\nFrance,100,\nFrance,100,110\n")?;
        let db_dir = tempfile::tempdir()?;
        let config = config_for(&csv, &db_dir);
        config.validate()?;

        let summary = run(&config, true).await?;

        assert_eq!(summary.rows_read, 2);
        assert_eq!(summary.diagnostics.duplicate_rows, 0);
        assert_eq!(summary.diagnostics.missing[2], ("2021".to_string(), 1));
        assert_eq!(
            summary.diagnostics.key_unique,
            Some(("Country".to_string(), false))
        );
        assert_eq!(summary.load.map(|l| l.rows), Some(2));

        assert_eq!(query_count(&db_dir, "SELECT COUNT(*) FROM gdp")?, 2);
        assert_eq!(
            query_count(&db_dir, "SELECT COUNT(*) FROM gdp WHERE \"2021\" IS NULL")?,
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn full_year_range_with_empty_column() -> anyhow::Result<()> {
        init_test_logging();
        let csv = csv_file(
            "Country,2020,2021,2022,2023,2024,2025\n\
             France,2630.3,2957.9,2779.1,3031.8,3130.0,\n\
             Chad,10.7,11.8,12.7,13.1,14.0,\n\
             Peru,201.9,226.4,244.4,267.6,283.3,\n",
        )?;
        let db_dir = tempfile::tempdir()?;
        let config = config_for(&csv, &db_dir);

        let summary = run(&config, true).await?;

        assert_eq!(summary.diagnostics.empty_columns, vec!["2025".to_string()]);
        assert_eq!(summary.load.map(|l| l.rows), Some(3));
        assert_eq!(query_count(&db_dir, "SELECT COUNT(*) FROM gdp")?, 3);
        assert_eq!(query_count(&db_dir, "SELECT COUNT(\"2025\") FROM gdp")?, 0);
        assert_eq!(
            query_count(&db_dir, "SELECT COUNT(*) FROM gdp WHERE \"2025\" = 0")?,
            0
        );
        Ok(())
    }

    #[tokio::test]
    async fn without_load_the_database_is_untouched() -> anyhow::Result<()> {
        let csv = csv_file("Country,2020\nPeru,1\n")?;
        let db_dir = tempfile::tempdir()?;
        let summary = run(&config_for(&csv, &db_dir), false).await?;
        assert_eq!(summary.rows_read, 1);
        assert!(summary.load.is_none());
        assert!(!db_dir.path().join("gdp.duckdb").exists());
        Ok(())
    }

    #[tokio::test]
    async fn coerce_failure_loads_nothing() -> anyhow::Result<()> {
        let csv = csv_file("Country,2020\nPeru,1\nChad,unknown\n")?;
        let db_dir = tempfile::tempdir()?;
        let config = config_for(&csv, &db_dir);

        assert!(run(&config, true).await.is_err());
        assert_eq!(
            query_count(
                &db_dir,
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'gdp'"
            )?,
            0
        );
        Ok(())
    }

    #[tokio::test]
    async fn load_stage_writes_through_any_sink() -> anyhow::Result<()> {
        let table = extract::from_reader("Country,2020\nPeru,1\nChad,\n".as_bytes())?;
        let config = Config::default();
        let mut sink = DuckDbSink::open_in_memory()?;
        let summary = load(&table, &config, &mut sink).await?;
        assert_eq!(summary.rows, 2);
        Ok(())
    }
}
