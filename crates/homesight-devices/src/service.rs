//! External service contracts.
//!
//! The diagnostic core never talks to a platform SDK directly; it consumes
//! these traits. Concrete adapters live outside the core and must extract
//! the platform-specific id from the universal id (via
//! [`UniversalDeviceId::native_id`]) before invoking the underlying SDK -
//! every method here receives universal ids.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use homesight_core::Result;

use crate::device::{DeviceStatus, UnifiedDevice};
use crate::event::{DeviceEventResult, EventQuery};
use crate::id::UniversalDeviceId;

/// Platform adapter façade.
#[async_trait]
pub trait DeviceService: Send + Sync {
    /// All devices known to the platform, already normalised.
    async fn list_devices(&self) -> Result<Vec<UnifiedDevice>>;

    /// One device by universal id.
    async fn get_device(&self, id: &UniversalDeviceId) -> Result<UnifiedDevice>;

    /// Point-in-time status (reachability, battery, component attributes).
    async fn get_device_status(&self, id: &UniversalDeviceId) -> Result<DeviceStatus>;

    /// Event history for a device.
    async fn get_device_events(
        &self,
        id: &UniversalDeviceId,
        query: EventQuery,
    ) -> Result<DeviceEventResult>;
}

/// One automation rule that references a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRuleMatch {
    pub rule_id: String,
    pub rule_name: String,
    /// Roles the devices play in the rule ("trigger: motion sensor",
    /// "action: switch", ...).
    pub device_roles: Vec<String>,
    pub status: String,
    pub triggered_at: Option<DateTime<Utc>>,
    pub confidence: Option<f32>,
}

impl AutomationRuleMatch {
    /// Whether any role in the rule names a motion sensor.
    pub fn involves_motion_sensor(&self) -> bool {
        self.device_roles
            .iter()
            .any(|role| role.to_lowercase().contains("motion"))
    }
}

/// Optional rule-matching evidence source.
///
/// Implementations return an empty list on any failure; this contract
/// never errors.
#[async_trait]
pub trait AutomationService: Send + Sync {
    async fn find_rules_for_device(
        &self,
        device_id: &UniversalDeviceId,
        location_id: Option<&str>,
    ) -> Vec<AutomationRuleMatch>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_sensor_role_detection() {
        let rule = AutomationRuleMatch {
            rule_id: "r1".to_string(),
            rule_name: "Night light".to_string(),
            device_roles: vec!["trigger: Motion Sensor".to_string()],
            status: "enabled".to_string(),
            triggered_at: None,
            confidence: Some(0.9),
        };
        assert!(rule.involves_motion_sensor());

        let rule = AutomationRuleMatch {
            device_roles: vec!["action: switch".to_string()],
            ..rule
        };
        assert!(!rule.involves_motion_sensor());
    }
}
