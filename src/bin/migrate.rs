//! `migrate`: bring the database schema in line with the model registry.
//!
//! Sub-commands:
//! - `upgrade`: apply every pending step in one transaction (default).
//! - `plan`: print the pending SQL without touching the schema.
//! - `revision`: write the pending SQL to a timestamped file.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use service_layout::config::AppSettings;
use service_layout::core::telemetry;
use service_layout::db::migrations;
use service_layout::modules::model_registry;

#[derive(Parser)]
#[command(name = "migrate", about = "Registry-driven schema migrations", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations.
    Upgrade,
    /// Print pending migration SQL.
    Plan,
    /// Write pending migration SQL to a revision file.
    Revision {
        /// Short description used in the file name.
        #[arg(short, long)]
        message: String,
        /// Directory receiving revision files.
        #[arg(long, default_value = "migrations")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = AppSettings::from_env().context("failed to load configuration")?;
    settings.validate()?;
    telemetry::init_tracing(&settings)?;

    let registry = model_registry()?;
    let pool = settings
        .database
        .create_single_connection_pool()
        .await
        .context("failed to connect to database")?;

    match cli.command.unwrap_or(Command::Upgrade) {
        Command::Upgrade => {
            let applied = migrations::upgrade(&pool, &registry)
                .await
                .context("migration failed")?;
            tracing::info!(steps = applied.len(), "Migrations applied successfully");
        }
        Command::Plan => {
            let plan = migrations::pending(&pool, &registry).await?;
            if plan.is_empty() {
                println!("-- schema is up to date");
            } else {
                println!("{}", plan.to_sql());
            }
        }
        Command::Revision { message, dir } => {
            let plan = migrations::pending(&pool, &registry).await?;
            if plan.is_empty() {
                tracing::info!("No changes detected, revision not written");
            } else {
                let path = migrations::write_revision(&dir, &message, &plan)?;
                println!("{}", path.display());
            }
        }
    }

    pool.close().await;
    Ok(())
}
