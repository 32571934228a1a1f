//! HomeSight semantic device index.
//!
//! Maintains a vector-store-backed mirror of the device registry and
//! answers natural-language device queries:
//!
//! - **MetadataDocument**: one device rendered as searchable text plus
//!   flat metadata
//! - **SemanticDeviceIndex**: search, diff-based registry sync, periodic
//!   sync, keyword fallback when the store is unreachable
//! - **EmbeddingProvider / HashEmbedder**: pluggable embeddings with a
//!   deterministic built-in model
//!
//! The registry stays the source of truth; the index converges on it and
//! never holds state the registry cannot rebuild.

pub mod config;
pub mod document;
pub mod embedding;
pub mod index;

pub use config::{IndexConfig, VectorStoreConfig, DEFAULT_COLLECTION};
pub use document::{flatten_metadata, DocumentMetadata, MetadataDocument};
pub use embedding::{EmbeddingProvider, HashEmbedder, DEFAULT_DIMENSION};
pub use index::{
    DeviceSearchResult, IndexStats, SearchFilters, SearchOptions, SemanticDeviceIndex, SyncReport,
};
