use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use coursesync_cli::{Command, Config, Settings};
use coursesync_client::CatalogClient;
use coursesync_core::config::load_config;
use coursesync_core::error::AppError;
use coursesync_core::sync::{SyncMode, SyncOrchestrator, SyncReport};
use coursesync_core::traits::EntityStore;
use coursesync_db::CatalogRepository;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::parse();

    // Logs go to stderr, stats go to stdout
    let level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {}", e);
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<AppError>() {
                Some(app_error) => eprintln!("\n{}\n", app_error.user_message()),
                None => eprintln!("\n{:#}\n", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let file = load_config(config.config.as_deref())?;
    let settings = Settings::resolve(&config, &file);

    // Reject a bad selector before touching the database
    let mode = config.command.sync_mode().transpose()?;

    let pool = connect(&settings).await?;
    let repo = CatalogRepository::new(pool);

    match config.command {
        Command::InitDb => {
            repo.ensure_schema().await?;
        }
        Command::Sync { .. } => {
            repo.ensure_schema().await?;
            let mode = mode.unwrap_or(SyncMode::Full);
            sync(&repo, &settings, mode).await?;
        }
        Command::Stats => {
            show_stats(&repo).await?;
        }
    }

    Ok(())
}

async fn connect(settings: &Settings) -> anyhow::Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(settings.db().max_connections)
        .connect(settings.database_url()?)
        .await
        .map_err(AppError::DatabaseError)
        .context("Failed to connect to database")?;
    Ok(pool)
}

/// Runs one sync invocation and logs its outcome
async fn sync(repo: &CatalogRepository, settings: &Settings, mode: SyncMode) -> anyhow::Result<()> {
    let client = CatalogClient::new(settings.catalog_api()?, settings.http())?;

    info!("Starting {} sync", mode);
    let report = SyncOrchestrator::new(&client, repo).run(mode).await?;
    log_report(&report);

    Ok(())
}

fn log_report(report: &SyncReport) {
    for stage in report.stages_run() {
        info!(
            "{:<12} {:>5} requests {:>7} records {:>7} rows",
            stage.stage.as_str(),
            stage.fetches,
            stage.records,
            stage.rows_written
        );
    }

    let joins = &report.joins;
    if !joins.unresolved.is_empty() {
        warn!(
            "{} course rows have no matching instructor ({} names), stored with instructor 0",
            joins.fallback_rows,
            joins.unresolved.len()
        );
    }
    if !joins.ambiguous.is_empty() {
        warn!(
            "{} instructor names are shared by several instructors: {}",
            joins.ambiguous.len(),
            joins.ambiguous.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    let seconds = report
        .duration()
        .map(|d| d.num_milliseconds() as f64 / 1000.0)
        .unwrap_or_default();
    info!(
        "Sync {} complete: {} requests, {} rows written in {:.1}s",
        report.run_id,
        report.total_fetches(),
        report.total_rows_written(),
        seconds
    );
}

/// Show database statistics
async fn show_stats(repo: &CatalogRepository) -> anyhow::Result<()> {
    let stats = repo.stats().await?;

    println!("\nCatalog Statistics\n");
    println!("  Terms:                   {}", stats.terms);
    println!("  Schools:                 {}", stats.schools);
    println!("  Subjects:                {}", stats.subjects);
    println!("  Subject availabilities:  {}", stats.subject_availabilities);
    println!("  Instructors:             {}", stats.instructors);
    println!("  Instructor subjects:     {}", stats.instructor_subjects);
    println!("  Buildings:               {}", stats.buildings);
    println!("  Rooms:                   {}", stats.rooms);
    println!("  Courses:                 {}", stats.courses);
    println!("  Course descriptions:     {}", stats.course_descriptions);
    println!("  Course components:       {}", stats.course_components);
    println!();

    Ok(())
}
