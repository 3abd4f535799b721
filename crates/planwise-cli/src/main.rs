mod config;
mod coverage_cmd;
mod serve_cmd;
mod suggest_cmd;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use planwise_core::{CoverageFilter, CurriculumStore, PgStore};
use planwise_db::config::DbConfig;
use planwise_db::pool;

use config::PlanwiseConfig;

#[derive(Parser)]
#[command(name = "planwise", about = "Curriculum coverage and weekly activity suggestions")]
struct Cli {
    /// Database URL (overrides PLANWISE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a planwise config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the planwise database if needed and run migrations
    DbInit,
    /// Show coverage status per curriculum outcome
    Coverage {
        /// Only outcomes in this subject
        #[arg(long)]
        subject: Option<String>,
        /// Only outcomes for this grade
        #[arg(long)]
        grade: Option<i32>,
        /// Only outcomes declared by this milestone
        #[arg(long)]
        milestone: Option<Uuid>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Suggest activities to schedule for a week
    Suggest {
        /// First day of the week, YYYY-MM-DD (default: Monday of this week)
        #[arg(long)]
        week: Option<NaiveDate>,
        /// Only milestones owned by this user
        #[arg(long)]
        user: Option<Uuid>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Serve the coverage and suggestion HTTP API
    Serve {
        /// Address to bind (default: server.bind from config, else 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (default: server.port from config, else 3000)
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Execute the `planwise init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        server: config::ServerSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  server = {}:{}", cfg.server.bind, cfg.server.port);
    println!();
    println!("Next: run `planwise db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `planwise db-init` command: create database and run migrations.
async fn cmd_db_init(db_config: &DbConfig) -> anyhow::Result<()> {
    println!("Initializing planwise database...");

    pool::ensure_database_exists(db_config).await?;

    let db_pool = pool::create_pool(db_config).await?;
    let result = async {
        pool::run_migrations(&db_pool).await?;
        pool::table_counts(&db_pool).await
    }
    .await;
    db_pool.close().await;

    let counts = result?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    println!("planwise db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            let resolved = PlanwiseConfig::resolve(cli.database_url.as_deref())?;
            cmd_db_init(&resolved.db_config).await?;
        }
        Commands::Coverage {
            subject,
            grade,
            milestone,
            json,
        } => {
            let resolved = PlanwiseConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let store = PgStore::new(db_pool.clone());
            let filter = CoverageFilter {
                subject,
                grade,
                milestone_id: milestone,
            };
            let result = coverage_cmd::run_coverage(&store, &filter, json).await;
            db_pool.close().await;
            result?;
        }
        Commands::Suggest { week, user, json } => {
            let resolved = PlanwiseConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let store = PgStore::new(db_pool.clone());
            let week = suggest_cmd::resolve_week(week);
            let result = suggest_cmd::run_suggest(&store, week, user, json).await;
            db_pool.close().await;
            result?;
        }
        Commands::Serve { bind, port } => {
            let resolved = PlanwiseConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let store: Arc<dyn CurriculumStore> = Arc::new(PgStore::new(db_pool.clone()));
            let bind = bind.unwrap_or(resolved.bind);
            let port = port.unwrap_or(resolved.port);
            let result = serve_cmd::run_serve(store, &bind, port).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
