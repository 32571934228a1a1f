//! HomeSight core crate.
//!
//! Shared foundation for the diagnostic pipeline:
//! - Unified error type used across all crates
//! - Read-only configuration snapshot
//! - Chat message model and the abstract [`LlmRuntime`] backend contract
//! - Process-wide logging initialiser
//!
//! Everything else (devices, index, classifier, patterns, workflow) builds
//! on these types.

pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod message;

pub use config::DiagnosticsConfig;
pub use error::{Error, Result};
pub use llm::{
    BackendId, FinishReason, GenerationParams, LlmInput, LlmOutput, LlmRuntime, MockLlm, ToolCall,
    ToolDefinition,
};
pub use logging::init_logging;
pub use message::{Message, MessageRole};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
