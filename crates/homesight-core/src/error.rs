//! Unified error handling for HomeSight.
//!
//! This module provides a common error type that can be used across all
//! crates, reducing boilerplate and making error handling consistent.

/// Unified error type for HomeSight.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM-related errors.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Storage/database errors.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Device-related errors.
    #[error("Device error: {0}")]
    Device(String),

    /// Device lacks a required universal id.
    #[error("Missing device id: {0}")]
    MissingId(String),

    /// Malformed universal device id.
    #[error("Invalid device id: {0}")]
    InvalidId(String),

    /// Not found errors.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Timeout errors.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Network/transport errors.
    #[error("Network error: {0}")]
    Network(String),

    /// The vector store backing the semantic index is unreachable.
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// The semantic index was used before `initialize()` succeeded.
    #[error("Index not initialized: {0}")]
    IndexNotInitialized(String),

    /// Metadata attached to an index document is not flat-typed.
    #[error("Invalid metadata: {0}")]
    MetadataInvalid(String),

    /// Validation errors.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Parse errors with location context.
    #[error("Parse error at {location}: {message}")]
    Parse { location: String, message: String },

    /// Generic internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, Error>;

// Error conversion helpers
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Internal(e.to_string())
    }
}

// Convenience constructors for common errors
impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn parse(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            location: location.into(),
            message: message.into(),
        }
    }

    /// True for error kinds the diagnostic workflow treats as "no data"
    /// rather than a failure worth surfacing.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("smartthings:abc".to_string());
        assert!(err.to_string().contains("smartthings:abc"));
    }

    #[test]
    fn test_convenience_constructors() {
        let err = Error::not_found("device-1");
        assert!(matches!(err, Error::NotFound(_)));

        let err = Error::timeout("status call expired");
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_parse_error_location() {
        let err = Error::parse("llm response", "unexpected token");
        assert!(err.to_string().contains("llm response"));
        assert!(err.to_string().contains("unexpected token"));
    }

    #[test]
    fn test_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_is_no_data() {
        assert!(Error::not_found("x").is_no_data());
        assert!(!Error::timeout("x").is_no_data());
    }
}
