//! oxide-dbupdater CLI
//!
//! Command-line tool that converges a database to a schema document.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use sqlx::any::AnyPoolOptions;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_dbupdater::prelude::*;

/// Declarative schema reconciliation.
#[derive(Parser)]
#[command(name = "oxide-dbupdater")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL.
    #[arg(short, long, env = "DATABASE_URL")]
    database: String,

    /// Dialect used to render DDL and read the catalog.
    #[arg(long, default_value = "mysql")]
    dialect: String,

    /// Schema documents (JSON) to converge to.
    #[arg(short, long = "schema", required = true, num_args = 1..)]
    schemas: Vec<PathBuf>,

    /// Show SQL without executing (dry run).
    #[arg(long)]
    dry_run: bool,

    /// Stop at the first failed statement.
    #[arg(long)]
    abort_on_error: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn read_document(path: &Path) -> anyhow::Result<SchemaDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Resolve everything that can fail before touching the database
    let registry = DialectRegistry::default();
    let policy = if cli.abort_on_error {
        ErrorPolicy::Abort
    } else {
        ErrorPolicy::ContinueOnError
    };
    let mut manager = TableManager::from_registry(&registry, &cli.dialect)?.with_policy(policy);

    let documents = cli
        .schemas
        .iter()
        .map(|path| read_document(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    sqlx::any::install_default_drivers();
    let mut pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect(&cli.database)
        .await?;

    let report = if cli.dry_run {
        info!("Dry run mode - SQL will be printed but not executed.");
        for document in &documents {
            manager.load(document)?;
        }
        manager.introspect(&mut pool).await?;
        manager.compute_diff()?;
        for sql in manager.take_pending() {
            println!("{};", sql);
        }
        None
    } else {
        Some(manager.converge(&mut pool, &documents).await?)
    };

    pool.close().await;

    match report {
        Some(report) if !report.is_success() => {
            for failure in &report.failed {
                eprintln!("failed: {}", failure.error);
            }
            Ok(ExitCode::FAILURE)
        }
        _ => Ok(ExitCode::SUCCESS),
    }
}
