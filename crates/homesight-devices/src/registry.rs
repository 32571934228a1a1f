//! Device Registry - authoritative in-memory catalogue of known devices.
//!
//! The registry owns every [`UnifiedDevice`] snapshot; insertions, updates
//! and removals happen only through its API. Other components receive
//! cloned snapshots that may go stale after a later update. Exactly one
//! entry exists per universal id.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use homesight_core::{Error, Result};

use crate::device::{DevicePatch, UnifiedDevice};
use crate::fuzzy;
use crate::id::UniversalDeviceId;

/// In-memory device catalogue keyed by universal id.
pub struct DeviceRegistry {
    devices: Arc<RwLock<HashMap<UniversalDeviceId, UnifiedDevice>>>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace a device by id.
    ///
    /// Fails with `MissingId` when the snapshot carries an empty id.
    pub async fn add_device(&self, device: UnifiedDevice) -> Result<()> {
        if device.id.as_str().is_empty() {
            return Err(Error::MissingId("cannot register a device without an id".to_string()));
        }
        let id = device.id.clone();
        let mut devices = self.devices.write().await;
        if devices.insert(id.clone(), device).is_some() {
            tracing::debug!(device = %id, "Replaced existing registry entry");
        } else {
            tracing::debug!(device = %id, "Registered device");
        }
        Ok(())
    }

    /// Merge a patch into an existing device; fails with `NotFound` when
    /// the id is not registered. Returns the updated snapshot.
    pub async fn update_device(
        &self,
        id: &UniversalDeviceId,
        patch: DevicePatch,
    ) -> Result<UnifiedDevice> {
        let mut devices = self.devices.write().await;
        match devices.get_mut(id) {
            Some(device) => {
                patch.apply(device);
                Ok(device.clone())
            }
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    /// Remove a device. Idempotent; returns whether it existed.
    pub async fn remove_device(&self, id: &UniversalDeviceId) -> bool {
        let mut devices = self.devices.write().await;
        let existed = devices.remove(id).is_some();
        if existed {
            tracing::debug!(device = %id, "Removed device");
        }
        existed
    }

    /// Look up a device by id.
    pub async fn get_device(&self, id: &UniversalDeviceId) -> Option<UnifiedDevice> {
        let devices = self.devices.read().await;
        devices.get(id).cloned()
    }

    /// Snapshot of every registered device. Order is stable for an
    /// unchanged registry but otherwise unspecified.
    pub async fn all_devices(&self) -> Vec<UnifiedDevice> {
        let devices = self.devices.read().await;
        devices.values().cloned().collect()
    }

    /// Devices matching a predicate.
    pub async fn find_devices<F>(&self, predicate: F) -> Vec<UnifiedDevice>
    where
        F: Fn(&UnifiedDevice) -> bool,
    {
        let devices = self.devices.read().await;
        devices.values().filter(|d| predicate(d)).cloned().collect()
    }

    /// Last-resort fuzzy resolver over names and labels.
    ///
    /// Ranking: exact name, then exact label, then minimum Levenshtein
    /// distance over name and label, ties broken by lexicographic id.
    pub async fn resolve_device(&self, query: &str) -> Option<UnifiedDevice> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        let query_lower = query.to_lowercase();

        let devices = self.devices.read().await;
        let mut best: Option<(u8, usize, &UnifiedDevice)> = None;

        for device in devices.values() {
            let name_lower = device.name.to_lowercase();
            let label_lower = device.label.as_deref().map(|l| l.to_lowercase());

            let (tier, distance) = if name_lower == query_lower {
                (0u8, 0usize)
            } else if label_lower.as_deref() == Some(query_lower.as_str()) {
                (1, 0)
            } else {
                let mut distance = fuzzy::levenshtein(query, &device.name);
                if let Some(label) = device.label.as_deref() {
                    distance = distance.min(fuzzy::levenshtein(query, label));
                }
                (2, distance)
            };

            let better = match &best {
                None => true,
                Some((best_tier, best_distance, best_device)) => {
                    (tier, distance, device.id.as_str())
                        < (*best_tier, *best_distance, best_device.id.as_str())
                }
            };
            if better {
                best = Some((tier, distance, device));
            }
        }

        best.map(|(_, _, device)| device.clone())
    }

    /// Number of registered devices.
    pub async fn device_count(&self) -> usize {
        let devices = self.devices.read().await;
        devices.len()
    }

    /// Populate the registry from the platform adapter. Returns how many
    /// devices were registered.
    pub async fn load_from_service(
        &self,
        service: &dyn crate::service::DeviceService,
    ) -> Result<usize> {
        let devices = service.list_devices().await?;
        let count = devices.len();
        for device in devices {
            self.add_device(device).await?;
        }
        tracing::info!("Loaded {} devices from the platform adapter", count);
        Ok(count)
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
