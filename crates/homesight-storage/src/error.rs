//! Error types for the storage crate.

/// Storage error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization failure while persisting or loading documents.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Embedding dimension mismatch.
    #[error("Invalid embedding dimension: expected {expected}, found {found}")]
    InvalidDimension { expected: usize, found: usize },

    /// Collection does not exist.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_error_display() {
        let err = Error::InvalidDimension {
            expected: 256,
            found: 8,
        };
        assert!(err.to_string().contains("256"));
        assert!(err.to_string().contains("8"));
    }
}
