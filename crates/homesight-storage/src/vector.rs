//! Vector storage for semantic search.
//!
//! Provides named collections of embedded documents with an in-memory
//! cosine index and optional redb persistence. Collections carry
//! recognised metadata (`description`, `embedding_model`) so a consumer
//! can verify it attached to an index built with a compatible embedder.

use std::collections::HashMap;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Error, Result};

// Single table holding every collection; key = "<collection>\t<doc id>".
const VECTORS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("vectors");

/// Vector embedding (fixed-size list of floats).
pub type Embedding = Vec<f32>;

/// Recognised collection metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    /// Human-readable purpose of the collection.
    pub description: String,
    /// Name of the embedding model the collection was built with.
    pub embedding_model: String,
}

/// Vector document with embedding and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDocument {
    /// Unique identifier within the collection.
    pub id: String,
    /// Vector embedding.
    pub embedding: Embedding,
    /// Associated metadata (flat-typed by convention; callers flatten).
    pub metadata: serde_json::Value,
    /// Tags for filtering.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Timestamp when the document was created.
    #[serde(default)]
    pub created_at: i64,
}

impl VectorDocument {
    /// Create a new vector document.
    pub fn new(id: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            id: id.into(),
            embedding,
            metadata: serde_json::json!({}),
            tags: Vec::new(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Set metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Check if the document matches every key-value pair in the filter.
    fn matches_filter(&self, filter: &HashMap<String, serde_json::Value>) -> bool {
        for (key, expected) in filter {
            let actual = if key == "tags" {
                Some(serde_json::json!(self.tags))
            } else {
                self.metadata.get(key).cloned()
            };
            match actual {
                Some(actual) if actual == *expected => continue,
                _ => return false,
            }
        }
        true
    }
}

/// Vector search result.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// ID of the matched document.
    pub id: String,
    /// Similarity score (0-1, where 1 is identical).
    pub score: f32,
    /// Associated metadata.
    pub metadata: serde_json::Value,
}

/// Vector search options.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Maximum number of results to return.
    pub top_k: usize,
    /// Minimum similarity threshold (0-1).
    pub min_score: Option<f32>,
    /// Metadata filter - only return results matching all key-value pairs.
    pub metadata_filter: Option<HashMap<String, serde_json::Value>>,
}

impl SearchOptions {
    /// Create new search options with top_k.
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            ..Default::default()
        }
    }

    /// Set minimum score threshold.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Add a metadata filter requirement.
    pub fn with_filter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata_filter
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

/// Similarity metric for vector comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityMetric {
    /// Cosine similarity (default).
    #[default]
    Cosine,
    /// Euclidean distance (converted to similarity).
    Euclidean,
}

impl SimilarityMetric {
    fn similarity(&self, a: &Embedding, b: &Embedding) -> f32 {
        match self {
            SimilarityMetric::Cosine => cosine_similarity(a, b),
            SimilarityMetric::Euclidean => 1.0 / (1.0 + euclidean_distance(a, b)),
        }
    }
}

fn cosine_similarity(a: &Embedding, b: &Embedding) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn euclidean_distance(a: &Embedding, b: &Embedding) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// One named collection of embedded documents.
///
/// Reads and writes go through an in-memory map; when the owning store was
/// opened with persistence, every mutation is mirrored to redb.
pub struct VectorCollection {
    name: String,
    metadata: CollectionMetadata,
    docs: RwLock<HashMap<String, VectorDocument>>,
    db: Option<Arc<Database>>,
    metric: SimilarityMetric,
    /// Locked in by the first document; every later embedding must match.
    dimension: RwLock<Option<usize>>,
}

impl VectorCollection {
    fn new(name: String, metadata: CollectionMetadata, db: Option<Arc<Database>>) -> Self {
        Self {
            name,
            metadata,
            docs: RwLock::new(HashMap::new()),
            db,
            metric: SimilarityMetric::default(),
            dimension: RwLock::new(None),
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recognised collection metadata.
    pub fn metadata(&self) -> &CollectionMetadata {
        &self.metadata
    }

    /// Insert or replace a document by id.
    pub async fn upsert(&self, doc: VectorDocument) -> Result<()> {
        {
            let mut dimension = self.dimension.write().await;
            match *dimension {
                Some(expected) if doc.embedding.len() != expected => {
                    return Err(Error::InvalidDimension {
                        expected,
                        found: doc.embedding.len(),
                    });
                }
                Some(_) => {}
                None => *dimension = Some(doc.embedding.len()),
            }
        }

        if let Some(db) = &self.db {
            persist(db, &self.name, &doc)?;
        }

        let mut docs = self.docs.write().await;
        docs.insert(doc.id.clone(), doc);
        Ok(())
    }

    /// Insert or replace multiple documents.
    pub async fn upsert_batch(&self, batch: Vec<VectorDocument>) -> Result<()> {
        for doc in batch {
            self.upsert(doc).await?;
        }
        Ok(())
    }

    /// Delete a document. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        if let Some(db) = &self.db {
            unpersist(db, &self.name, id)?;
        }
        let mut docs = self.docs.write().await;
        Ok(docs.remove(id).is_some())
    }

    /// Get a document by id.
    pub async fn get(&self, id: &str) -> Option<VectorDocument> {
        let docs = self.docs.read().await;
        docs.get(id).cloned()
    }

    /// All document ids in the collection.
    pub async fn ids(&self) -> Vec<String> {
        let docs = self.docs.read().await;
        docs.keys().cloned().collect()
    }

    /// Number of documents in the collection.
    pub async fn count(&self) -> usize {
        let docs = self.docs.read().await;
        docs.len()
    }

    /// Remove every document.
    pub async fn clear(&self) -> Result<()> {
        let ids: Vec<String> = self.ids().await;
        if let Some(db) = &self.db {
            for id in &ids {
                unpersist(db, &self.name, id)?;
            }
        }
        let mut docs = self.docs.write().await;
        docs.clear();
        Ok(())
    }

    /// Search for the documents most similar to the query embedding.
    pub async fn query(&self, query: &Embedding, options: SearchOptions) -> Result<Vec<SearchResult>> {
        if let Some(expected) = *self.dimension.read().await {
            if query.len() != expected {
                return Err(Error::InvalidDimension {
                    expected,
                    found: query.len(),
                });
            }
        }

        let docs = self.docs.read().await;
        let mut results: Vec<SearchResult> = Vec::new();

        for doc in docs.values() {
            if let Some(filter) = &options.metadata_filter {
                if !doc.matches_filter(filter) {
                    continue;
                }
            }

            let score = self.metric.similarity(query, &doc.embedding);
            if let Some(min) = options.min_score {
                if score < min {
                    continue;
                }
            }

            results.push(SearchResult {
                id: doc.id.clone(),
                score,
                metadata: doc.metadata.clone(),
            });
        }

        // Descending score, then id for deterministic ordering of ties.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(options.top_k);
        Ok(results)
    }

    async fn load(&self, docs: Vec<VectorDocument>) {
        let mut dimension = self.dimension.write().await;
        let mut map = self.docs.write().await;
        for doc in docs {
            if dimension.is_none() {
                *dimension = Some(doc.embedding.len());
            }
            map.insert(doc.id.clone(), doc);
        }
    }
}

fn storage_key(collection: &str, id: &str) -> String {
    format!("{}\t{}", collection, id)
}

fn persist(db: &Database, collection: &str, doc: &VectorDocument) -> Result<()> {
    let txn = db
        .begin_write()
        .map_err(|e| Error::Database(e.to_string()))?;
    {
        let mut table = txn
            .open_table(VECTORS_TABLE)
            .map_err(|e| Error::Database(e.to_string()))?;
        let value = serde_json::to_vec(doc)?;
        table
            .insert(storage_key(collection, &doc.id).as_str(), value.as_slice())
            .map_err(|e| Error::Database(e.to_string()))?;
    }
    txn.commit().map_err(|e| Error::Database(e.to_string()))
}

fn unpersist(db: &Database, collection: &str, id: &str) -> Result<()> {
    let txn = db
        .begin_write()
        .map_err(|e| Error::Database(e.to_string()))?;
    {
        let mut table = txn
            .open_table(VECTORS_TABLE)
            .map_err(|e| Error::Database(e.to_string()))?;
        table
            .remove(storage_key(collection, id).as_str())
            .map_err(|e| Error::Database(e.to_string()))?;
    }
    txn.commit().map_err(|e| Error::Database(e.to_string()))
}

/// Vector store: a set of named collections behind one connection.
pub struct VectorStore {
    db: Option<Arc<Database>>,
    collections: RwLock<HashMap<String, Arc<VectorCollection>>>,
}

impl VectorStore {
    /// Create an in-memory store with no persistence.
    pub fn in_memory() -> Self {
        Self {
            db: None,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Open a store persisted at the given path.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = if path.exists() {
            Database::open(path).map_err(|e| Error::Database(e.to_string()))?
        } else {
            Database::create(path).map_err(|e| Error::Database(e.to_string()))?
        };

        // Make sure the table exists so reads never fail on a fresh file.
        let txn = db
            .begin_write()
            .map_err(|e| Error::Database(e.to_string()))?;
        txn.open_table(VECTORS_TABLE)
            .map_err(|e| Error::Database(e.to_string()))?;
        txn.commit().map_err(|e| Error::Database(e.to_string()))?;

        Ok(Self {
            db: Some(Arc::new(db)),
            collections: RwLock::new(HashMap::new()),
        })
    }

    /// Create the collection if absent, otherwise attach to it (loading
    /// any persisted documents). Attaching with a different embedding
    /// model than the collection was created with is a warning, not an
    /// error; the caller decides whether to re-index.
    pub async fn get_or_create_collection(
        &self,
        name: &str,
        metadata: CollectionMetadata,
    ) -> Result<Arc<VectorCollection>> {
        {
            let collections = self.collections.read().await;
            if let Some(existing) = collections.get(name) {
                if existing.metadata().embedding_model != metadata.embedding_model {
                    tracing::warn!(
                        collection = name,
                        existing = %existing.metadata().embedding_model,
                        requested = %metadata.embedding_model,
                        "Attaching to collection built with a different embedding model"
                    );
                }
                return Ok(existing.clone());
            }
        }

        let collection = Arc::new(VectorCollection::new(
            name.to_string(),
            metadata,
            self.db.clone(),
        ));

        if let Some(db) = &self.db {
            collection.load(load_collection(db, name)?).await;
        }

        let mut collections = self.collections.write().await;
        let entry = collections
            .entry(name.to_string())
            .or_insert_with(|| collection);
        Ok(entry.clone())
    }

    /// Names of the collections currently attached.
    pub async fn collection_names(&self) -> Vec<String> {
        let collections = self.collections.read().await;
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        names
    }
}

fn load_collection(db: &Database, collection: &str) -> Result<Vec<VectorDocument>> {
    let txn = db
        .begin_read()
        .map_err(|e| Error::Database(e.to_string()))?;
    let table = txn
        .open_table(VECTORS_TABLE)
        .map_err(|e| Error::Database(e.to_string()))?;

    let prefix = format!("{}\t", collection);
    let mut docs = Vec::new();
    for entry in table.iter().map_err(|e| Error::Database(e.to_string()))? {
        let (key, value) = entry.map_err(|e| Error::Database(e.to_string()))?;
        if !key.value().starts_with(&prefix) {
            continue;
        }
        match serde_json::from_slice::<VectorDocument>(value.value()) {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                tracing::warn!(key = key.value(), "Skipping undecodable vector document: {}", e);
            }
        }
    }
    Ok(docs)
}
