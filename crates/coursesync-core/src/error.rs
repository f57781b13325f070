use thiserror::Error;

use crate::sync::Stage;

/// Application-wide error types.
///
/// Every failure the sync pipeline can observe ends up here. The orchestrator does
/// not distinguish between variants when deciding what to do next: any error aborts
/// the current invocation. The classification in [`ErrorKind`] exists for reporting.
///
/// # Error Conversion
///
/// - `sqlx::Error` → `AppError::DatabaseError`
/// - `serde_json::Error` → `AppError::SerializationError`
///
/// # Examples
///
/// ```
/// use coursesync_core::error::{AppError, ErrorKind};
///
/// let err = AppError::TermNotFound("Fall 2024".to_string());
/// assert_eq!(err.kind(), ErrorKind::Precondition);
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// Wraps connection failures, constraint violations and transaction errors.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// HTTP request to the course data API failed or returned a non-success status.
    #[error("API Client error: {0}")]
    ClientError(String),

    /// JSON payload from the course data API could not be decoded.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network or connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimitExceeded,

    /// A term-scoped invocation named a term that is not in the store.
    #[error("Term not found: {0}")]
    TermNotFound(String),

    /// Configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A sync stage failed; later stages were not attempted.
    #[error("Sync aborted during {stage} stage: {source}")]
    SyncAborted {
        stage: Stage,
        #[source]
        source: Box<AppError>,
    },

    /// Generic application error for cases not covered by specific variants.
    #[error("Error: {0}")]
    Generic(String),
}

/// Coarse failure classes used when reporting an aborted invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport, non-success response or malformed payload.
    Gateway,
    /// Connection, constraint or transaction failure.
    Store,
    /// The invocation's preconditions did not hold.
    Precondition,
    /// Configuration could not be resolved.
    Config,
}

impl AppError {
    /// Wraps `source` as the failure that aborted `stage`.
    pub fn aborted(stage: Stage, source: AppError) -> Self {
        AppError::SyncAborted {
            stage,
            source: Box::new(source),
        }
    }

    /// Classifies this error. `SyncAborted` reports the kind of its cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::DatabaseError(_) => ErrorKind::Store,
            AppError::ClientError(_)
            | AppError::SerializationError(_)
            | AppError::InvalidUrl(_)
            | AppError::NetworkError(_)
            | AppError::Timeout(_)
            | AppError::RateLimitExceeded => ErrorKind::Gateway,
            AppError::TermNotFound(_) => ErrorKind::Precondition,
            AppError::ConfigError(_) | AppError::Generic(_) => ErrorKind::Config,
            AppError::SyncAborted { source, .. } => source.kind(),
        }
    }

    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(e) => {
                if e.to_string().contains("connection") {
                    "Cannot connect to database. Is PostgreSQL running?\n   Check DATABASE_URL."
                        .to_string()
                } else {
                    format!("Database error: {}", e)
                }
            }
            AppError::ClientError(msg) => {
                if msg.contains("timeout") || msg.contains("timed out") {
                    "Request timed out. The course data API may be slow or unreachable.\n   Try again later.".to_string()
                } else if msg.contains("connect") {
                    format!(
                        "Cannot connect to the course data API: {}\n   Check CATALOG_API_URL.",
                        msg
                    )
                } else {
                    format!("API error: {}", msg)
                }
            }
            AppError::NetworkError(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => {
                format!(
                    "Request timed out after {} seconds.\n   The API may be overloaded. Try again later.",
                    secs
                )
            }
            AppError::RateLimitExceeded => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            AppError::TermNotFound(name) => {
                format!(
                    "Term \"{}\" is not in the database.\n   Run a full sync first: coursesync sync",
                    name
                )
            }
            AppError::SyncAborted { stage, source } => {
                format!("{} stage failed. {}", stage, source.user_message())
            }
            _ => self.to_string(),
        }
    }

    /// Returns true if a single request failing with this error may succeed on retry.
    ///
    /// Only the HTTP client consults this, per request. A failed stage is never retried.
    ///
    /// # Examples
    ///
    /// ```
    /// use coursesync_core::error::AppError;
    ///
    /// assert!(AppError::NetworkError("connection reset".to_string()).is_retryable());
    /// assert!(!AppError::TermNotFound("Fall 2024".to_string()).is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::RateLimitExceeded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::TermNotFound("Fall 2024".to_string());
        assert_eq!(err.to_string(), "Term not found: Fall 2024");
    }

    #[test]
    fn test_sync_aborted_display_names_stage() {
        let err = AppError::aborted(Stage::Subjects, AppError::ClientError("HTTP 500".into()));
        assert_eq!(
            err.to_string(),
            "Sync aborted during subjects stage: API Client error: HTTP 500"
        );
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::PoolTimedOut).kind(),
            ErrorKind::Store
        );
        assert_eq!(AppError::Timeout(30).kind(), ErrorKind::Gateway);
        assert_eq!(
            AppError::TermNotFound("x".into()).kind(),
            ErrorKind::Precondition
        );
        assert_eq!(AppError::ConfigError("x".into()).kind(), ErrorKind::Config);
    }

    #[test]
    fn test_kind_of_aborted_follows_source() {
        let err = AppError::aborted(
            Stage::Rooms,
            AppError::DatabaseError(sqlx::Error::RowNotFound),
        );
        assert_eq!(err.kind(), ErrorKind::Store);
    }

    #[test]
    fn test_error_from_serde() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("{ invalid json }");
        let app_err: AppError = result.unwrap_err().into();
        assert!(matches!(app_err, AppError::SerializationError(_)));
        assert_eq!(app_err.kind(), ErrorKind::Gateway);
    }

    #[test]
    fn test_user_message_term_not_found() {
        let msg = AppError::TermNotFound("Spring 2025".into()).user_message();
        assert!(msg.contains("Spring 2025"));
        assert!(msg.contains("full sync"));
    }

    #[test]
    fn test_user_message_database_connection() {
        let err = AppError::DatabaseError(sqlx::Error::PoolTimedOut);
        let msg = err.user_message();
        assert!(msg.contains("Cannot connect to database") || msg.contains("Database error"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(AppError::NetworkError("timeout".to_string()).is_retryable());
        assert!(AppError::Timeout(30).is_retryable());
        assert!(AppError::RateLimitExceeded.is_retryable());
        assert!(!AppError::ClientError("HTTP 404".to_string()).is_retryable());
        assert!(!AppError::InvalidUrl("bad".to_string()).is_retryable());
    }
}
