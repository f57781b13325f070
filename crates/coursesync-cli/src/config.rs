use clap::{Parser, Subcommand};
use std::path::PathBuf;

use coursesync_core::config::{
    CatalogApiConfig, DbConfig, FileConfig, HttpConfig, DEFAULT_API_KEY_PARAMETER,
};
use coursesync_core::error::AppError;
use coursesync_core::sync::SyncMode;

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "coursesync")]
#[command(
    author,
    version,
    about = "Mirror a university course catalog API into PostgreSQL"
)]
#[command(after_help = "Examples:
  coursesync init-db
  coursesync sync
  coursesync sync --term \"2024 Fall\"
  coursesync sync --courses \"2024 Fall\"
  coursesync stats")]
pub struct Config {
    /// PostgreSQL database connection URL
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Base URL of the course data API
    #[arg(long, env = "CATALOG_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Key for the course data API
    #[arg(long, env = "CATALOG_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Query parameter that carries the API key
    #[arg(long, env = "CATALOG_API_KEY_PARAM", global = true)]
    pub api_key_param: Option<String>,

    /// Custom path to config.toml
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log at DEBUG level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the catalog from the API and write it to the database
    #[command(after_help = "Examples:
  coursesync sync                        # Everything except courses
  coursesync sync --term \"2024 Fall\"     # Subject availability of one term
  coursesync sync --courses \"2024 Fall\"  # Only courses of one term")]
    Sync {
        /// Rebuild the subject availability of this term
        #[arg(short, long, value_name = "NAME")]
        term: Option<String>,

        /// Refresh only the courses of this term
        #[arg(long, value_name = "NAME", conflicts_with = "term")]
        courses: Option<String>,
    },
    /// Create the database tables
    InitDb,
    /// Show row counts per table
    Stats,
}

impl Command {
    /// Invocation selector for `sync`; `None` for the other commands.
    pub fn sync_mode(&self) -> Option<Result<SyncMode, AppError>> {
        match self {
            Command::Sync { term, courses } => {
                Some(SyncMode::from_selector(term.clone(), courses.clone()))
            }
            _ => None,
        }
    }
}

/// Fully resolved settings: flags and environment first, then the config file,
/// then built-in defaults.
#[derive(Debug)]
pub struct Settings {
    database_url: Option<String>,
    db: DbConfig,
    catalog_api: Option<CatalogApiConfig>,
    http: HttpConfig,
    missing_api: Vec<&'static str>,
}

impl Settings {
    pub fn resolve(config: &Config, file: &FileConfig) -> Self {
        let database_url = pick(&config.database_url, &file.database.url);
        let base_url = pick(&config.api_url, &file.catalog_api.base_url);
        let api_key = pick(&config.api_key, &file.catalog_api.api_key);
        let api_key_parameter = pick(&config.api_key_param, &file.catalog_api.api_key_parameter)
            .unwrap_or_else(|| DEFAULT_API_KEY_PARAMETER.to_string());

        let mut missing_api = Vec::new();
        if base_url.is_none() {
            missing_api.push("CATALOG_API_URL");
        }
        if api_key.is_none() {
            missing_api.push("CATALOG_API_KEY");
        }

        let catalog_api = match (base_url, api_key) {
            (Some(base_url), Some(api_key)) => Some(CatalogApiConfig {
                base_url,
                api_key,
                api_key_parameter,
            }),
            _ => None,
        };

        Self {
            database_url,
            db: file.db_config(),
            catalog_api,
            http: file.http_config(),
            missing_api,
        }
    }

    pub fn database_url(&self) -> Result<&str, AppError> {
        self.database_url.as_deref().ok_or_else(|| {
            AppError::ConfigError(
                "database URL is not set (use --database-url, DATABASE_URL or [database] url)"
                    .to_string(),
            )
        })
    }

    pub fn db(&self) -> &DbConfig {
        &self.db
    }

    pub fn catalog_api(&self) -> Result<&CatalogApiConfig, AppError> {
        self.catalog_api.as_ref().ok_or_else(|| {
            AppError::ConfigError(format!(
                "course data API is not configured, missing {}",
                self.missing_api.join(", ")
            ))
        })
    }

    pub fn http(&self) -> &HttpConfig {
        &self.http
    }
}

/// Prefers the flag/env value over the file value. Blank values count as unset.
fn pick(flag: &Option<String>, file: &Option<String>) -> Option<String> {
    let set = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    set(flag).or_else(|| set(file))
}
