/// Core error types for Tibrah
use thiserror::Error;

/// Result type alias using `TibrahError`
pub type Result<T> = std::result::Result<T, TibrahError>;

/// Core error type for Tibrah
#[derive(Error, Debug)]
pub enum TibrahError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl TibrahError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
