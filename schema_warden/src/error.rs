//! Error types for SchemaWarden

use thiserror::Error;

/// Result type for SchemaWarden operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for SchemaWarden
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid change description: {0}")]
    InvalidChangeDescription(String),

    #[error("SQL parse error: {0}")]
    ParseError(String),

    #[error("Catalog error: {0}")]
    CatalogError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Scaffold error: {0}")]
    ScaffoldError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Convert Serde JSON errors to SchemaWarden errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to SchemaWarden errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
