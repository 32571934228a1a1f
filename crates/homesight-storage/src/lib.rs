//! HomeSight storage crate.
//!
//! Embedded vector store used by the semantic device index: named
//! collections of embedded documents with an in-memory cosine index and
//! optional redb persistence. The store persists its own data; nothing
//! else in the pipeline survives a process restart.

pub mod error;
pub mod vector;

pub use error::{Error, Result};
pub use vector::{
    CollectionMetadata, Embedding, SearchOptions, SearchResult, SimilarityMetric, VectorCollection,
    VectorDocument, VectorStore,
};
