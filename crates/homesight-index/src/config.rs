//! Vector-store addressing and index configuration.

use std::path::PathBuf;

/// Default collection name for the device index.
pub const DEFAULT_COLLECTION: &str = "smartthings_devices";

/// How the index reaches its backing vector store.
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    pub host: String,
    pub port: u16,
    pub ssl: bool,
    /// Deprecated single-path addressing; enables embedded persistence at
    /// the given file.
    pub(crate) path: Option<PathBuf>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            ssl: false,
            path: None,
        }
    }
}

impl VectorStoreConfig {
    /// Address a store by host, port and TLS flag.
    pub fn new(host: impl Into<String>, port: u16, ssl: bool) -> Self {
        Self {
            host: host.into(),
            port,
            ssl,
            path: None,
        }
    }

    /// Back-compat constructor for the deprecated single-`path` form.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        tracing::warn!(
            path = %path.display(),
            "Single-path vector store addressing is deprecated; use host/port/ssl"
        );
        Self {
            path: Some(path),
            ..Default::default()
        }
    }

    /// Display form of the address.
    pub fn endpoint(&self) -> String {
        match &self.path {
            Some(path) => format!("file://{}", path.display()),
            None => {
                let scheme = if self.ssl { "https" } else { "http" };
                format!("{}://{}:{}", scheme, self.host, self.port)
            }
        }
    }
}

/// Semantic index configuration.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub store: VectorStoreConfig,
    pub collection_name: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            store: VectorStoreConfig::default(),
            collection_name: DEFAULT_COLLECTION.to_string(),
        }
    }
}
