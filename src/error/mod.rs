//! Unified error handling for the authorization core

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Misconfigured: {0}")]
    Misconfigured(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Errors a policy raises on purpose to deny access.
    ///
    /// Anything else is a fault in the stores or the configuration.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            AppError::Unauthorized(_) | AppError::Forbidden(_) | AppError::NotFound(_)
        )
    }

    /// Stable machine-readable code, used as a log and metric label.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Misconfigured(_) => "misconfigured",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}
