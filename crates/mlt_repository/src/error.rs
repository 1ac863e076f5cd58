//! Error types for the repository

use std::path::PathBuf;
use thiserror::Error;

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Errors that can occur while loading service modules
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Failed to load dynamic library
    #[error("Failed to load module '{path}': {message}")]
    LoadError {
        path: PathBuf,
        message: String,
    },

    /// Module does not export a required symbol
    #[error("Symbol '{symbol}' not found in module '{module}'")]
    SymbolNotFound {
        module: String,
        symbol: String,
    },

    /// Module was built against a different ABI
    #[error("Module '{module}' has ABI version {found}, expected {expected}")]
    AbiMismatch {
        module: String,
        found: u32,
        expected: u32,
    },

    /// Module already loaded
    #[error("Module '{0}' is already loaded")]
    AlreadyLoaded(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RepositoryError {
    /// Create a load error
    pub fn load_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        RepositoryError::LoadError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a symbol not found error
    pub fn symbol_not_found(module: impl Into<String>, symbol: impl Into<String>) -> Self {
        RepositoryError::SymbolNotFound {
            module: module.into(),
            symbol: symbol.into(),
        }
    }
}
