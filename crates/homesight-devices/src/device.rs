//! Unified device model.
//!
//! Platform adapters produce loosely-typed [`DeviceInfo`] records; the
//! transformer normalises them into immutable [`UnifiedDevice`] snapshots
//! keyed by universal id. Capabilities are a closed enum; platform strings
//! the core does not recognise map to [`CapabilityTag::Other`] and are
//! never dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use homesight_core::{Error, Result};

use crate::id::UniversalDeviceId;

/// Closed capability vocabulary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapabilityTag {
    Switch,
    Dimmer,
    MotionSensor,
    ContactSensor,
    Lock,
    TemperatureSensor,
    HumiditySensor,
    Battery,
    WindowShade,
    Thermostat,
    Button,
    PresenceSensor,
    Other,
}

impl CapabilityTag {
    /// Map a platform capability string onto the closed vocabulary.
    pub fn from_platform(raw: &str) -> Self {
        match raw.trim() {
            "switch" => Self::Switch,
            "switchLevel" | "dimmer" => Self::Dimmer,
            "motionSensor" | "motion" => Self::MotionSensor,
            "contactSensor" | "contact" => Self::ContactSensor,
            "lock" => Self::Lock,
            "temperatureMeasurement" | "temperature" => Self::TemperatureSensor,
            "relativeHumidityMeasurement" | "humidity" => Self::HumiditySensor,
            "battery" => Self::Battery,
            "windowShade" => Self::WindowShade,
            "thermostat" | "thermostatMode" => Self::Thermostat,
            "button" => Self::Button,
            "presenceSensor" | "presence" => Self::PresenceSensor,
            _ => Self::Other,
        }
    }

    /// Verb phrase used when generating semantic index content.
    pub fn verb(&self) -> Option<&'static str> {
        match self {
            Self::Switch => Some("can be turned on and off"),
            Self::Dimmer => Some("can be dimmed"),
            Self::MotionSensor => Some("detects motion"),
            Self::ContactSensor => Some("senses open and closed state"),
            Self::Lock => Some("can be locked and unlocked"),
            Self::TemperatureSensor => Some("measures temperature"),
            Self::HumiditySensor => Some("measures humidity"),
            Self::Battery => Some("runs on battery"),
            Self::WindowShade => Some("raises and lowers a shade"),
            Self::Thermostat => Some("controls heating and cooling"),
            Self::Button => Some("reports button presses"),
            Self::PresenceSensor => Some("detects presence"),
            Self::Other => None,
        }
    }

    /// Whether this capability represents a sensor.
    pub fn is_sensor(&self) -> bool {
        matches!(
            self,
            Self::MotionSensor
                | Self::ContactSensor
                | Self::TemperatureSensor
                | Self::HumiditySensor
                | Self::PresenceSensor
        )
    }
}

impl fmt::Display for CapabilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Switch => "switch",
            Self::Dimmer => "dimmer",
            Self::MotionSensor => "motion_sensor",
            Self::ContactSensor => "contact_sensor",
            Self::Lock => "lock",
            Self::TemperatureSensor => "temperature_sensor",
            Self::HumiditySensor => "humidity_sensor",
            Self::Battery => "battery",
            Self::WindowShade => "window_shade",
            Self::Thermostat => "thermostat",
            Self::Button => "button",
            Self::PresenceSensor => "presence_sensor",
            Self::Other => "other",
        };
        write!(f, "{}", tag)
    }
}

/// Immutable snapshot of one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedDevice {
    /// Universal id (`platform:native-id`).
    pub id: UniversalDeviceId,
    /// Platform the device lives on.
    pub platform: String,
    /// Platform-specific id (the half after the separator).
    pub platform_device_id: String,
    /// Technical name from the platform.
    pub name: String,
    /// User-facing label, when the platform distinguishes it from the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Room assignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// Manufacturer name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Model identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Capabilities the device exposes.
    pub capabilities: BTreeSet<CapabilityTag>,
    /// Whether the platform currently reports the device reachable.
    pub online: bool,
    /// Last time the platform saw the device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    /// Battery percentage, when the device reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u8>,
}

impl UnifiedDevice {
    /// Minimal device for construction in code and tests.
    pub fn new(id: UniversalDeviceId, name: impl Into<String>) -> Self {
        let platform = id.platform().to_string();
        let platform_device_id = id.native_id().to_string();
        Self {
            id,
            platform,
            platform_device_id,
            name: name.into(),
            label: None,
            room: None,
            manufacturer: None,
            model: None,
            capabilities: BTreeSet::new(),
            online: true,
            last_seen: None,
            battery_level: None,
        }
    }

    /// Label when present, otherwise the name.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_capability(mut self, capability: CapabilityTag) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    pub fn with_battery_level(mut self, level: u8) -> Self {
        self.battery_level = Some(level);
        self
    }
}

/// Partial update applied to a registered device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevicePatch {
    pub name: Option<String>,
    pub label: Option<String>,
    pub room: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub capabilities: Option<BTreeSet<CapabilityTag>>,
    pub online: Option<bool>,
    pub last_seen: Option<DateTime<Utc>>,
    pub battery_level: Option<u8>,
}

impl DevicePatch {
    /// Merge the patch into a device snapshot, field by field.
    pub fn apply(self, device: &mut UnifiedDevice) {
        if let Some(name) = self.name {
            device.name = name;
        }
        if let Some(label) = self.label {
            device.label = Some(label);
        }
        if let Some(room) = self.room {
            device.room = Some(room);
        }
        if let Some(manufacturer) = self.manufacturer {
            device.manufacturer = Some(manufacturer);
        }
        if let Some(model) = self.model {
            device.model = Some(model);
        }
        if let Some(capabilities) = self.capabilities {
            device.capabilities = capabilities;
        }
        if let Some(online) = self.online {
            device.online = online;
        }
        if let Some(last_seen) = self.last_seen {
            device.last_seen = Some(last_seen);
        }
        if let Some(battery_level) = self.battery_level {
            device.battery_level = Some(battery_level);
        }
    }
}

/// Loosely-typed device record as platform adapters deliver it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: Option<String>,
    pub platform: Option<String>,
    pub platform_device_id: Option<String>,
    pub name: Option<String>,
    pub label: Option<String>,
    pub room: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub online: Option<bool>,
    pub last_seen: Option<DateTime<Utc>>,
    pub battery_level: Option<u8>,
}

impl UnifiedDevice {
    /// Transform a raw adapter record into a unified snapshot.
    ///
    /// The universal id is taken from `info.id` when it already has the
    /// `platform:id` shape, otherwise assembled from the `platform` and
    /// `platform_device_id` halves. A record with neither fails with
    /// `MissingId`.
    pub fn from_info(info: DeviceInfo) -> Result<Self> {
        let id = match info.id {
            Some(raw) => UniversalDeviceId::parse(&raw)?,
            None => match (info.platform.as_deref(), info.platform_device_id.as_deref()) {
                (Some(platform), Some(native)) => UniversalDeviceId::new(platform, native),
                _ => {
                    return Err(Error::MissingId(
                        "device record has no universal id and no platform/native pair"
                            .to_string(),
                    ))
                }
            },
        };

        let capabilities: BTreeSet<CapabilityTag> = info
            .capabilities
            .iter()
            .map(|raw| CapabilityTag::from_platform(raw))
            .collect();

        let name = info
            .name
            .or_else(|| info.label.clone())
            .unwrap_or_else(|| id.native_id().to_string());

        Ok(Self {
            platform: id.platform().to_string(),
            platform_device_id: id.native_id().to_string(),
            id,
            name,
            label: info.label,
            room: info.room,
            manufacturer: info.manufacturer,
            model: info.model,
            capabilities,
            online: info.online.unwrap_or(false),
            last_seen: info.last_seen,
            battery_level: info.battery_level,
        })
    }
}

/// Point-in-time device status as returned by the platform adapter.
///
/// `components` keeps the platform's nested attribute tree verbatim
/// (`{main: {battery: {battery: {value}}, switch: …}}`); typed accessors
/// dig out the fields the core reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceStatus {
    #[serde(default)]
    pub components: serde_json::Value,
    pub online: Option<bool>,
    pub battery_level: Option<u8>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl DeviceStatus {
    /// Battery percentage from the flat field or the nested
    /// `components.main.battery.battery.value` path.
    pub fn battery_percentage(&self) -> Option<u8> {
        if let Some(level) = self.battery_level {
            return Some(level);
        }
        self.components
            .get("main")?
            .get("battery")?
            .get("battery")?
            .get("value")?
            .as_f64()
            .map(|v| v.clamp(0.0, 100.0) as u8)
    }

    /// Reachability; absent means the platform did not say, treated as
    /// online.
    pub fn is_online(&self) -> bool {
        self.online.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_mapping() {
        assert_eq!(
            CapabilityTag::from_platform("motionSensor"),
            CapabilityTag::MotionSensor
        );
        assert_eq!(
            CapabilityTag::from_platform("switchLevel"),
            CapabilityTag::Dimmer
        );
        // Unknown capabilities are kept, never dropped.
        assert_eq!(
            CapabilityTag::from_platform("colorControl"),
            CapabilityTag::Other
        );
    }

    #[test]
    fn test_capability_serde_names() {
        let json = serde_json::to_string(&CapabilityTag::MotionSensor).unwrap();
        assert_eq!(json, "\"MOTION_SENSOR\"");
    }

    #[test]
    fn test_from_info_with_universal_id() {
        let info = DeviceInfo {
            id: Some("smartthings:abc".to_string()),
            name: Some("Alcove Light".to_string()),
            capabilities: vec!["switch".to_string(), "colorControl".to_string()],
            online: Some(true),
            ..Default::default()
        };
        let device = UnifiedDevice::from_info(info).unwrap();
        assert_eq!(device.platform, "smartthings");
        assert_eq!(device.platform_device_id, "abc");
        assert!(device.capabilities.contains(&CapabilityTag::Switch));
        assert!(device.capabilities.contains(&CapabilityTag::Other));
    }

    #[test]
    fn test_from_info_assembles_id() {
        let info = DeviceInfo {
            platform: Some("hue".to_string()),
            platform_device_id: Some("7".to_string()),
            label: Some("Hallway Lamp".to_string()),
            ..Default::default()
        };
        let device = UnifiedDevice::from_info(info).unwrap();
        assert_eq!(device.id.as_str(), "hue:7");
        assert_eq!(device.name, "Hallway Lamp");
    }

    #[test]
    fn test_from_info_missing_id() {
        let info = DeviceInfo {
            name: Some("Orphan".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            UnifiedDevice::from_info(info),
            Err(Error::MissingId(_))
        ));
    }

    #[test]
    fn test_patch_apply() {
        let id = UniversalDeviceId::new("smartthings", "abc");
        let mut device = UnifiedDevice::new(id, "Lamp");
        let patch = DevicePatch {
            room: Some("bedroom".to_string()),
            online: Some(false),
            ..Default::default()
        };
        patch.apply(&mut device);
        assert_eq!(device.room.as_deref(), Some("bedroom"));
        assert!(!device.online);
        assert_eq!(device.name, "Lamp");
    }

    #[test]
    fn test_status_battery_from_components() {
        let status = DeviceStatus {
            components: serde_json::json!({
                "main": { "battery": { "battery": { "value": 17.0 } } }
            }),
            ..Default::default()
        };
        assert_eq!(status.battery_percentage(), Some(17));
    }

    #[test]
    fn test_status_battery_flat_field_wins() {
        let status = DeviceStatus {
            components: serde_json::json!({
                "main": { "battery": { "battery": { "value": 90.0 } } }
            }),
            battery_level: Some(12),
            ..Default::default()
        };
        assert_eq!(status.battery_percentage(), Some(12));
    }

    #[test]
    fn test_status_battery_absent() {
        let status = DeviceStatus::default();
        assert_eq!(status.battery_percentage(), None);
        assert!(status.is_online());
    }
}
