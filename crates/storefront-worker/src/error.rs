//! Storefront worker: startup and runtime error types.

use thiserror::Error;

/// Startup and runtime errors for the worker process.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection, pool, or migration error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(sqlx::Error::Migrate(Box::new(err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message_names_the_problem() {
        let err = AppError::Config("PORT must be a valid u16".into());

        assert_eq!(
            err.to_string(),
            "configuration error: PORT must be a valid u16"
        );
    }

    #[test]
    fn test_io_error_converts_to_server_error() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");

        let err = AppError::from(io);

        assert!(matches!(err, AppError::Server(_)));
    }
}
