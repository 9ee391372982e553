use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod analytics;
mod auth;
mod community;
mod complaints;
mod config;
mod db;
mod error;
mod guidance;
mod insights;
mod intake;
mod models;
mod report;
mod server;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "complaint-portal")]
#[command(about = "Citizen corruption complaint portal and accountability analytics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demonstration users, complaints and reference data
    Seed,
    /// Import complaints from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate a markdown analytics report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Run the HTTP API
    Serve {
        /// Overrides BIND_ADDRESS
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} complaints from {}.", csv.display());
        }
        Commands::Report { out } => {
            let snapshot = db::load_snapshot(&pool).await?;
            let report = report::build_report(&snapshot, analytics::today());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            server::serve(config, pool).await?;
        }
    }

    Ok(())
}
