//! Error types for the factory

use thiserror::Error;

/// Result type for factory operations
pub type Result<T> = std::result::Result<T, FactoryError>;

/// Errors surfaced by the factory
#[derive(Debug, Error)]
pub enum FactoryError {
    /// Operation needs an initialised factory
    #[error("Factory is not initialised")]
    Uninitialized,

    /// Config file could not be parsed
    #[error("Invalid factory config: {0}")]
    Config(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
