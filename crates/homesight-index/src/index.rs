//! Semantic Device Index.
//!
//! Maintains a searchable mirror of the device registry in a vector store
//! and answers natural-language device queries. The registry stays the
//! source of truth; the index converges on it through diff-based sync and
//! answers from a keyword fallback whenever the backing store is
//! unavailable.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use homesight_core::{Error, Result};
use homesight_devices::{fuzzy, DeviceRegistry, UnifiedDevice, UniversalDeviceId};
use homesight_storage::{
    CollectionMetadata, SearchOptions as StorageSearchOptions, VectorCollection, VectorDocument,
    VectorStore,
};

use crate::config::IndexConfig;
use crate::document::MetadataDocument;
use crate::embedding::{EmbeddingProvider, HashEmbedder};

/// Filters applied to a device search.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub room: Option<String>,
    pub capabilities: Option<Vec<String>>,
    pub platform: Option<String>,
    pub online: Option<bool>,
}

/// Options for [`SemanticDeviceIndex::search_devices`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub min_similarity: f32,
    pub filters: Option<SearchFilters>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_similarity: 0.0,
            filters: None,
        }
    }
}

impl SearchOptions {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn filters(mut self, filters: SearchFilters) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// One search hit.
#[derive(Debug, Clone)]
pub struct DeviceSearchResult {
    pub device_id: UniversalDeviceId,
    /// Similarity in [0, 1].
    pub score: f32,
    /// Registry snapshot, when the registry knows the device.
    pub device: Option<UnifiedDevice>,
}

/// Outcome of one registry sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub errors: Vec<String>,
}

/// Index health snapshot.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub total_devices: usize,
    pub collection_name: String,
    pub embedding_model: String,
    pub healthy: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Clone)]
enum Backend {
    Uninitialized,
    Ready {
        _store: Arc<VectorStore>,
        collection: Arc<VectorCollection>,
    },
    Unavailable(String),
}

/// Vector-store-backed mirror of the device registry.
pub struct SemanticDeviceIndex {
    config: IndexConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    backend: RwLock<Backend>,
    registry: RwLock<Option<Arc<DeviceRegistry>>>,
    /// Foreground and periodic sync are mutually exclusive.
    sync_in_progress: AtomicBool,
    periodic: Mutex<Option<JoinHandle<()>>>,
    last_sync: RwLock<Option<DateTime<Utc>>>,
}

impl SemanticDeviceIndex {
    /// Index with a custom embedder and configuration.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, config: IndexConfig) -> Self {
        Self {
            config,
            embedder,
            backend: RwLock::new(Backend::Uninitialized),
            registry: RwLock::new(None),
            sync_in_progress: AtomicBool::new(false),
            periodic: Mutex::new(None),
            last_sync: RwLock::new(None),
        }
    }

    /// Index with the built-in hash embedder and default configuration.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(HashEmbedder::default()), IndexConfig::default())
    }

    /// Wire the registry used for keyword fallback and sync.
    pub async fn set_device_registry(&self, registry: Arc<DeviceRegistry>) {
        *self.registry.write().await = Some(registry);
    }

    /// Connect to the vector store and create or attach to the collection.
    ///
    /// Fails with `IndexUnavailable` when the backing store cannot be
    /// reached; searches then degrade to the keyword fallback.
    pub async fn initialize(&self) -> Result<()> {
        let store = match self.config.store.path.as_ref() {
            Some(path) => match VectorStore::open(path) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    let reason = format!("{} ({})", e, self.config.store.endpoint());
                    *self.backend.write().await = Backend::Unavailable(reason.clone());
                    return Err(Error::IndexUnavailable(reason));
                }
            },
            None => Arc::new(VectorStore::in_memory()),
        };

        let metadata = CollectionMetadata {
            description: "Semantic index over smart-home devices".to_string(),
            embedding_model: self.embedder.name().to_string(),
        };
        let collection = match store
            .get_or_create_collection(&self.config.collection_name, metadata)
            .await
        {
            Ok(collection) => collection,
            Err(e) => {
                let reason = e.to_string();
                *self.backend.write().await = Backend::Unavailable(reason.clone());
                return Err(Error::IndexUnavailable(reason));
            }
        };

        tracing::info!(
            collection = %self.config.collection_name,
            endpoint = %self.config.store.endpoint(),
            model = %self.embedder.name(),
            "Semantic device index initialized"
        );
        *self.backend.write().await = Backend::Ready {
            _store: store,
            collection,
        };
        Ok(())
    }

    async fn collection(&self) -> Result<Arc<VectorCollection>> {
        match &*self.backend.read().await {
            Backend::Ready { collection, .. } => Ok(collection.clone()),
            Backend::Uninitialized => Err(Error::IndexNotInitialized(
                "call initialize() before indexing".to_string(),
            )),
            Backend::Unavailable(reason) => Err(Error::IndexUnavailable(reason.clone())),
        }
    }

    fn build_vector_document(&self, doc: &MetadataDocument) -> Result<VectorDocument> {
        let flat = doc.flat_metadata()?;
        Ok(
            VectorDocument::new(doc.device_id.as_str(), self.embedder.embed(&doc.content))
                .with_metadata(serde_json::Value::Object(flat))
                .with_tags(doc.metadata.tags.clone()),
        )
    }

    /// Upsert one document by device id. Idempotent.
    pub async fn index_device(&self, doc: &MetadataDocument) -> Result<()> {
        let collection = self.collection().await?;
        let vector_doc = self.build_vector_document(doc)?;
        collection
            .upsert(vector_doc)
            .await
            .map_err(|e| Error::storage(e.to_string()))
    }

    /// Batch upsert.
    pub async fn index_devices(&self, docs: &[MetadataDocument]) -> Result<()> {
        for doc in docs {
            self.index_device(doc).await?;
        }
        Ok(())
    }

    /// Natural-language device search.
    ///
    /// Any backing-store failure silently degrades to a keyword search
    /// over the registry snapshot (logged as a warning); results carry a
    /// similarity score either way.
    pub async fn search_devices(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<DeviceSearchResult>> {
        let backend = self.backend.read().await.clone();
        match backend {
            Backend::Ready { collection, .. } => {
                match self.vector_search(&collection, query, &options).await {
                    Ok(results) => Ok(results),
                    Err(e) => {
                        tracing::warn!(
                            "Vector search failed ({}); falling back to keyword search",
                            e
                        );
                        self.keyword_fallback(query, &options).await
                    }
                }
            }
            Backend::Uninitialized | Backend::Unavailable(_) => {
                self.keyword_fallback(query, &options).await
            }
        }
    }

    async fn vector_search(
        &self,
        collection: &VectorCollection,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<DeviceSearchResult>> {
        let embedding = self.embedder.embed(query);

        // Capability filtering happens after the query, so over-fetch when
        // filters are in play.
        let fetch_k = if options.filters.is_some() {
            options.limit.saturating_mul(4).max(options.limit)
        } else {
            options.limit
        };
        let mut storage_options = StorageSearchOptions::new(fetch_k);
        if let Some(filters) = &options.filters {
            if let Some(room) = &filters.room {
                storage_options = storage_options.with_filter("room", serde_json::json!(room));
            }
            if let Some(platform) = &filters.platform {
                storage_options =
                    storage_options.with_filter("platform", serde_json::json!(platform));
            }
            if let Some(online) = filters.online {
                storage_options = storage_options.with_filter("online", serde_json::json!(online));
            }
        }

        let raw = collection
            .query(&embedding, storage_options)
            .await
            .map_err(|e| Error::storage(e.to_string()))?;

        let registry = self.registry.read().await.clone();
        let mut results = Vec::with_capacity(raw.len());
        for hit in raw {
            if let Some(filters) = &options.filters {
                if let Some(required) = &filters.capabilities {
                    let indexed = hit
                        .metadata
                        .get("capabilities")
                        .and_then(|v| v.as_str())
                        .unwrap_or("");
                    let satisfied = required
                        .iter()
                        .all(|cap| indexed.split(',').any(|have| have == cap));
                    if !satisfied {
                        continue;
                    }
                }
            }

            let score = hit.score.clamp(0.0, 1.0);
            if score < options.min_similarity {
                continue;
            }

            let device_id = match UniversalDeviceId::parse(&hit.id) {
                Ok(id) => id,
                Err(_) => {
                    tracing::warn!(id = %hit.id, "Skipping indexed document with malformed id");
                    continue;
                }
            };
            let device = match &registry {
                Some(registry) => registry.get_device(&device_id).await,
                None => None,
            };
            results.push(DeviceSearchResult {
                device_id,
                score,
                device,
            });
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.device_id.cmp(&b.device_id))
        });
        results.truncate(options.limit);
        Ok(results)
    }

    /// Case-insensitive substring / edit-distance search over the current
    /// registry snapshot.
    async fn keyword_fallback(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<DeviceSearchResult>> {
        let registry = match self.registry.read().await.clone() {
            Some(registry) => registry,
            None => {
                return Err(Error::IndexNotInitialized(
                    "no vector backend and no registry wired for keyword fallback".to_string(),
                ))
            }
        };

        let query_lower = query.to_lowercase();
        let mut results = Vec::new();

        for device in registry.all_devices().await {
            if let Some(filters) = &options.filters {
                if !keyword_filters_match(&device, filters) {
                    continue;
                }
            }

            let name_lower = device.name.to_lowercase();
            let label_lower = device.label.as_deref().unwrap_or("").to_lowercase();

            let mut score = fuzzy::similarity(&query_lower, &name_lower);
            if !label_lower.is_empty() {
                score = score.max(fuzzy::similarity(&query_lower, &label_lower));
            }
            if name_lower.contains(&query_lower)
                || query_lower.contains(&name_lower)
                || (!label_lower.is_empty()
                    && (label_lower.contains(&query_lower) || query_lower.contains(&label_lower)))
            {
                score = score.max(0.9);
            }

            if score < options.min_similarity {
                continue;
            }
            results.push(DeviceSearchResult {
                device_id: device.id.clone(),
                score,
                device: Some(device),
            });
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.device_id.cmp(&b.device_id))
        });
        results.truncate(options.limit);
        Ok(results)
    }

    /// Diff-based registry sync: upsert additions and changed documents,
    /// delete documents whose device left the registry. Per-document
    /// errors are collected, never thrown.
    pub async fn sync_with_registry(&self, registry: &DeviceRegistry) -> Result<SyncReport> {
        if self.sync_in_progress.swap(true, Ordering::SeqCst) {
            tracing::warn!("Sync already in progress; deferring this request");
            return Ok(SyncReport::default());
        }
        let result = self.sync_locked(registry).await;
        self.sync_in_progress.store(false, Ordering::SeqCst);
        result
    }

    async fn sync_locked(&self, registry: &DeviceRegistry) -> Result<SyncReport> {
        let collection = self.collection().await?;
        let mut report = SyncReport::default();

        let devices = registry.all_devices().await;
        let desired: HashMap<String, &UnifiedDevice> = devices
            .iter()
            .map(|d| (d.id.as_str().to_string(), d))
            .collect();
        let indexed: HashSet<String> = collection.ids().await.into_iter().collect();

        for (id, device) in &desired {
            let doc = MetadataDocument::for_device(device);
            let vector_doc = match self.build_vector_document(&doc) {
                Ok(vector_doc) => vector_doc,
                Err(e) => {
                    report.errors.push(format!("{}: {}", id, e));
                    continue;
                }
            };

            if indexed.contains(id) {
                // Re-upsert only when the document actually changed.
                let unchanged = collection
                    .get(id)
                    .await
                    .map(|existing| existing.metadata == vector_doc.metadata)
                    .unwrap_or(false);
                if unchanged {
                    continue;
                }
                match collection.upsert(vector_doc).await {
                    Ok(()) => report.updated += 1,
                    Err(e) => report.errors.push(format!("{}: {}", id, e)),
                }
            } else {
                match collection.upsert(vector_doc).await {
                    Ok(()) => report.added += 1,
                    Err(e) => report.errors.push(format!("{}: {}", id, e)),
                }
            }
        }

        for id in indexed {
            if !desired.contains_key(&id) {
                match collection.delete(&id).await {
                    Ok(_) => report.removed += 1,
                    Err(e) => report.errors.push(format!("{}: {}", id, e)),
                }
            }
        }

        *self.last_sync.write().await = Some(Utc::now());
        tracing::debug!(
            added = report.added,
            updated = report.updated,
            removed = report.removed,
            errors = report.errors.len(),
            "Registry sync complete"
        );
        Ok(report)
    }

    /// Start syncing on a timer. Double-start is a warn no-op; a zero
    /// interval disables the timer.
    pub async fn start_periodic_sync(
        self: Arc<Self>,
        registry: Arc<DeviceRegistry>,
        interval: Duration,
    ) {
        let mut periodic = self.periodic.lock().await;
        if periodic.is_some() {
            tracing::warn!("Periodic sync already running; ignoring start request");
            return;
        }
        if interval.is_zero() {
            tracing::info!("Periodic sync disabled (zero interval)");
            return;
        }

        let index = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = index.sync_with_registry(&registry).await {
                    tracing::warn!("Periodic sync failed: {}", e);
                }
            }
        });
        *periodic = Some(handle);
    }

    /// Stop the periodic sync task, if one is running.
    pub async fn stop_periodic_sync(&self) {
        let mut periodic = self.periodic.lock().await;
        if let Some(handle) = periodic.take() {
            handle.abort();
        }
    }

    /// Index health snapshot.
    pub async fn stats(&self) -> IndexStats {
        let (healthy, total_devices) = match &*self.backend.read().await {
            Backend::Ready { collection, .. } => (true, collection.count().await),
            _ => (false, 0),
        };
        IndexStats {
            total_devices,
            collection_name: self.config.collection_name.clone(),
            embedding_model: self.embedder.name().to_string(),
            healthy,
            last_sync: *self.last_sync.read().await,
        }
    }

    /// Drop every indexed document.
    pub async fn clear(&self) -> Result<()> {
        let collection = self.collection().await?;
        collection
            .clear()
            .await
            .map_err(|e| Error::storage(e.to_string()))
    }
}

fn keyword_filters_match(device: &UnifiedDevice, filters: &SearchFilters) -> bool {
    if let Some(room) = &filters.room {
        if device.room.as_deref() != Some(room.as_str()) {
            return false;
        }
    }
    if let Some(platform) = &filters.platform {
        if device.platform != *platform {
            return false;
        }
    }
    if let Some(online) = filters.online {
        if device.online != online {
            return false;
        }
    }
    if let Some(required) = &filters.capabilities {
        let have: Vec<String> = device.capabilities.iter().map(|c| c.to_string()).collect();
        if !required.iter().all(|cap| have.iter().any(|h| h == cap)) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use homesight_devices::CapabilityTag;

    fn device(native: &str, name: &str) -> UnifiedDevice {
        UnifiedDevice::new(UniversalDeviceId::new("smartthings", native), name)
    }

    async fn ready_index() -> Arc<SemanticDeviceIndex> {
        let index = Arc::new(SemanticDeviceIndex::with_defaults());
        index.initialize().await.unwrap();
        index
    }

    #[tokio::test]
    async fn test_index_before_initialize() {
        let index = SemanticDeviceIndex::with_defaults();
        let doc = MetadataDocument::for_device(&device("a", "Lamp"));
        let err = index.index_device(&doc).await.unwrap_err();
        assert!(matches!(err, Error::IndexNotInitialized(_)));
    }

    #[tokio::test]
    async fn test_roundtrip_search() {
        let index = ready_index().await;

        for (native, name) in [
            ("a", "Alcove Light"),
            ("b", "Garage Door Sensor"),
            ("c", "Kitchen Thermostat"),
        ] {
            let doc = MetadataDocument::for_device(
                &device(native, name).with_capability(CapabilityTag::Switch),
            );
            index.index_device(&doc).await.unwrap();
        }

        let results = index
            .search_devices("Alcove Light", SearchOptions::with_limit(1))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].device_id.native_id(), "a");
    }

    #[tokio::test]
    async fn test_search_is_deterministic_on_ties() {
        let index = ready_index().await;
        // Identical content embeds identically; ids break the tie.
        for native in ["zz", "aa"] {
            let doc = MetadataDocument::for_device(&device(native, "Twin Lamp"));
            index.index_device(&doc).await.unwrap();
        }

        let results = index
            .search_devices("Twin Lamp", SearchOptions::with_limit(2))
            .await
            .unwrap();
        assert_eq!(results[0].device_id.native_id(), "aa");
        assert_eq!(results[1].device_id.native_id(), "zz");
    }

    #[tokio::test]
    async fn test_capability_filter() {
        let index = ready_index().await;
        index
            .index_device(&MetadataDocument::for_device(
                &device("a", "Hall Sensor").with_capability(CapabilityTag::MotionSensor),
            ))
            .await
            .unwrap();
        index
            .index_device(&MetadataDocument::for_device(
                &device("b", "Hall Switch").with_capability(CapabilityTag::Switch),
            ))
            .await
            .unwrap();

        let options = SearchOptions::with_limit(10).filters(SearchFilters {
            capabilities: Some(vec!["motion_sensor".to_string()]),
            ..Default::default()
        });
        let results = index.search_devices("Hall", options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].device_id.native_id(), "a");
    }

    #[tokio::test]
    async fn test_sync_diff() {
        let index = ready_index().await;
        // Pre-index A, B, C.
        for native in ["A", "B", "C"] {
            index
                .index_device(&MetadataDocument::for_device(&device(native, native)))
                .await
                .unwrap();
        }

        // Registry now holds B, C, D.
        let registry = DeviceRegistry::new();
        for native in ["B", "C", "D"] {
            registry.add_device(device(native, native)).await.unwrap();
        }

        let report = index.sync_with_registry(&registry).await.unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(report.updated, 0);
        assert!(report.errors.is_empty());

        // A is gone from search results for good.
        let results = index
            .search_devices("A", SearchOptions::with_limit(10))
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.device_id.native_id() != "A"));
    }

    #[tokio::test]
    async fn test_sync_counts_changed_devices_as_updates() {
        let index = ready_index().await;
        let registry = DeviceRegistry::new();
        registry.add_device(device("a", "Lamp")).await.unwrap();
        index.sync_with_registry(&registry).await.unwrap();

        // Unchanged device: nothing to do.
        let report = index.sync_with_registry(&registry).await.unwrap();
        assert_eq!(report, SyncReport::default());

        // Rename: one update.
        registry.add_device(device("a", "Desk Lamp")).await.unwrap();
        let report = index.sync_with_registry(&registry).await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.added, 0);
    }

    #[tokio::test]
    async fn test_keyword_fallback_when_uninitialized() {
        let index = SemanticDeviceIndex::with_defaults();
        let registry = Arc::new(DeviceRegistry::new());
        registry
            .add_device(device("a", "Bedroom Motion Sensor"))
            .await
            .unwrap();
        index.set_device_registry(registry).await;

        let results = index
            .search_devices("motion sensor", SearchOptions::with_limit(5))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].device_id.native_id(), "a");
        assert!(results[0].score >= 0.5);
    }

    #[tokio::test]
    async fn test_no_backend_and_no_registry_errors() {
        let index = SemanticDeviceIndex::with_defaults();
        let err = index
            .search_devices("anything", SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IndexNotInitialized(_)));
    }

    #[tokio::test]
    async fn test_initialize_unreachable_store() {
        use crate::config::VectorStoreConfig;
        // A directory is not a valid database file.
        let config = IndexConfig {
            store: VectorStoreConfig::from_path(std::env::temp_dir()),
            ..Default::default()
        };
        let index = SemanticDeviceIndex::new(Arc::new(HashEmbedder::default()), config);
        let err = index.initialize().await.unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable(_)));

        // Degrades to keyword fallback once a registry is wired.
        let registry = Arc::new(DeviceRegistry::new());
        registry.add_device(device("a", "Lamp")).await.unwrap();
        index.set_device_registry(registry).await;
        let results = index
            .search_devices("Lamp", SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let index = ready_index().await;
        index
            .index_device(&MetadataDocument::for_device(&device("a", "Lamp")))
            .await
            .unwrap();

        let stats = index.stats().await;
        assert!(stats.healthy);
        assert_eq!(stats.total_devices, 1);
        assert_eq!(stats.collection_name, "smartthings_devices");
        assert!(stats.embedding_model.starts_with("hash-ngram"));
    }

    #[tokio::test]
    async fn test_periodic_sync_double_start_is_noop() {
        let index = ready_index().await;
        let registry = Arc::new(DeviceRegistry::new());

        index
            .clone()
            .start_periodic_sync(registry.clone(), Duration::from_secs(60))
            .await;
        // Second start warns and leaves the first task running.
        index
            .clone()
            .start_periodic_sync(registry.clone(), Duration::from_secs(60))
            .await;
        index.stop_periodic_sync().await;
    }

    #[tokio::test]
    async fn test_clear() {
        let index = ready_index().await;
        index
            .index_device(&MetadataDocument::for_device(&device("a", "Lamp")))
            .await
            .unwrap();
        index.clear().await.unwrap();
        assert_eq!(index.stats().await.total_devices, 0);
    }
}
