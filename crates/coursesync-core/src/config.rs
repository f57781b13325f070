//! Configuration types for coursesync components.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then CLI
//! flags and environment variables (merged by the CLI crate).
//!
//! ```toml
//! [database]
//! url = "postgresql://localhost/courses"
//! max_connections = 5
//!
//! [catalog_api]
//! base_url = "https://api.asg.northwestern.edu/"
//! api_key = "..."
//! api_key_parameter = "key"
//! timeout_secs = 30
//! max_retries = 3
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;

/// Query parameter carrying the API key when none is configured.
pub const DEFAULT_API_KEY_PARAMETER: &str = "key";

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self { max_connections: 5 }
    }
}

/// HTTP client configuration for the course data API.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// Where and how to reach the course data API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_key_parameter: String,
}

/// Contents of `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub database: DatabaseSection,
    pub catalog_api: CatalogApiSection,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogApiSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub api_key_parameter: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

impl FileConfig {
    pub fn db_config(&self) -> DbConfig {
        let defaults = DbConfig::default();
        DbConfig {
            max_connections: self
                .database
                .max_connections
                .unwrap_or(defaults.max_connections),
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            timeout: self
                .catalog_api
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: self.catalog_api.max_retries.unwrap_or(defaults.max_retries),
            retry_base_delay: defaults.retry_base_delay,
        }
    }
}

/// Returns `<config dir>/coursesync/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("coursesync").join("config.toml"))
}

/// Loads configuration from `path`, or from [`default_config_path`] when `None`.
///
/// A missing default file yields an empty configuration; a missing explicit file
/// is an error.
pub fn load_config(path: Option<&Path>) -> Result<FileConfig, AppError> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => return Ok(FileConfig::default()),
        },
    };

    if !path.exists() {
        if explicit {
            return Err(AppError::ConfigError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(FileConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        AppError::ConfigError(format!("cannot read {}: {}", path.display(), e))
    })?;

    parse_config(&content)
        .map_err(|e| AppError::ConfigError(format!("invalid {}: {}", path.display(), e)))
}

fn parse_config(content: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_base_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            [database]
            url = "postgresql://localhost/courses"
            max_connections = 2

            [catalog_api]
            base_url = "https://api.example.edu/"
            api_key = "secret"
            timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(
            config.database.url.as_deref(),
            Some("postgresql://localhost/courses")
        );
        assert_eq!(config.db_config().max_connections, 2);
        assert_eq!(config.catalog_api.api_key.as_deref(), Some("secret"));
        assert_eq!(config.catalog_api.api_key_parameter, None);
        assert_eq!(config.http_config().timeout, Duration::from_secs(10));
        assert_eq!(config.http_config().max_retries, 3);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        assert!(parse_config("[database]\nmax_connections = \"many\"").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[catalog_api]\napi_key_parameter = \"apikey\"").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(
            config.catalog_api.api_key_parameter.as_deref(),
            Some("apikey")
        );
    }

    #[test]
    fn test_load_config_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");

        let err = load_config(Some(&missing)).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_default_config_path_suffix() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("coursesync/config.toml"));
        }
    }
}
