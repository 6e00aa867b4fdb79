use anyhow::{Context, Result};
use clap::Parser;
use gdpload::{config::Config, pipeline};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Check a GDP CSV for data-quality problems and load it into a table.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// YAML configuration file; GDP_* environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV to read instead of the configured path.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print diagnostics and stop before touching the database.
    #[arg(long)]
    skip_load: bool,

    /// Expect the target table to exist already.
    #[arg(long)]
    no_create_table: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let dotenv_loaded = dotenv::dotenv();
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) configuration ────────────────────────────────────────────
    if let Err(e) = dotenv_loaded {
        tracing::debug!("no .env loaded: {}", e);
    }
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(csv) = cli.csv {
        config.csv_path = csv;
    }
    if cli.no_create_table {
        config.target.create = false;
    }
    if !cli.skip_load {
        config.validate().context("invalid configuration")?;
    }
    info!(csv = %config.csv_path.display(), table = %config.target.name, "startup");

    // ─── 3) extract → diagnose → load ───────────────────────────────
    let summary = pipeline::run(&config, !cli.skip_load)
        .await
        .with_context(|| {
            format!(
                "running {} into `{}`",
                config.csv_path.display(),
                config.target.name
            )
        })?;

    match summary.load {
        Some(load) => info!(
            rows_read = summary.rows_read,
            rows = load.rows,
            statements = load.statements,
            "done"
        ),
        None => info!(rows_read = summary.rows_read, "done (load skipped)"),
    }
    Ok(())
}
