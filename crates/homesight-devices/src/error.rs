//! Error types for the devices crate.
//!
//! This crate uses the unified error type from core; only `MissingId` and
//! `NotFound` ever surface out of the registry.

// Re-export the core error type
pub use homesight_core::error::Error as HomeSightError;
pub use homesight_core::error::Result;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HomeSightError::NotFound("smartthings:abc".to_string());
        assert!(err.to_string().contains("smartthings:abc"));
    }
}
