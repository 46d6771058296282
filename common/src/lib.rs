use arrow::error::ArrowError;
use thiserror::Error;

pub mod config;
pub mod telemetry;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Load into {table} failed: {message}")]
    Load { table: String, message: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn load(table: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::Load {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Connectivity failures abort a run before any step executes.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Connectivity(_) | Error::SchemaMismatch(_) | Error::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_names_the_table() {
        let err = Error::load("dim_riders", "duplicate key");
        assert_eq!(err.to_string(), "Load into dim_riders failed: duplicate key");
        assert!(!err.is_fatal());
    }

    #[test]
    fn connectivity_is_fatal() {
        assert!(Error::Connectivity("refused".into()).is_fatal());
        assert!(Error::SchemaMismatch("Riders.age".into()).is_fatal());
        assert!(!Error::InvalidInput("x".into()).is_fatal());
    }
}
