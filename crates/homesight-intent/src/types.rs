//! Classification result types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    ModeManagement,
    DeviceHealth,
    IssueDiagnosis,
    Discovery,
    SystemStatus,
    NormalQuery,
}

impl Intent {
    /// Whether the diagnostic workflow should gather data for this intent.
    pub fn requires_diagnostics(&self) -> bool {
        matches!(
            self,
            Intent::DeviceHealth | Intent::IssueDiagnosis | Intent::SystemStatus
        )
    }

    /// Parse a loosely-formatted intent token: lowercased with every
    /// non-alphabetic character removed, so `"system_status"`,
    /// `"SYSTEM STATUS"` and `"systemstatus"` all resolve.
    pub fn from_token(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| c.is_alphabetic())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "modemanagement" => Some(Intent::ModeManagement),
            "devicehealth" => Some(Intent::DeviceHealth),
            "issuediagnosis" => Some(Intent::IssueDiagnosis),
            "discovery" => Some(Intent::Discovery),
            "systemstatus" => Some(Intent::SystemStatus),
            "normalquery" => Some(Intent::NormalQuery),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::ModeManagement => "MODE_MANAGEMENT",
            Intent::DeviceHealth => "DEVICE_HEALTH",
            Intent::IssueDiagnosis => "ISSUE_DIAGNOSIS",
            Intent::Discovery => "DISCOVERY",
            Intent::SystemStatus => "SYSTEM_STATUS",
            Intent::NormalQuery => "NORMAL_QUERY",
        };
        write!(f, "{}", name)
    }
}

/// Entities pulled out of the user message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(rename = "deviceId", skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(rename = "deviceName", skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(rename = "roomName", skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(rename = "issueType", skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
}

impl Entities {
    /// Fill any gap in `self` from `fallback`; present fields win.
    pub fn fill_missing_from(&mut self, fallback: Entities) {
        if self.device_id.is_none() {
            self.device_id = fallback.device_id;
        }
        if self.device_name.is_none() {
            self.device_name = fallback.device_name;
        }
        if self.room_name.is_none() {
            self.room_name = fallback.room_name;
        }
        if self.timeframe.is_none() {
            self.timeframe = fallback.timeframe;
        }
        if self.issue_type.is_none() {
            self.issue_type = fallback.issue_type;
        }
    }
}

/// Output of the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentClassification {
    pub intent: Intent,
    /// Confidence in [0, 1].
    pub confidence: f32,
    pub entities: Entities,
    #[serde(rename = "requiresDiagnostics")]
    pub requires_diagnostics: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl IntentClassification {
    /// Classification with derived diagnostics flag and no entities.
    pub fn new(intent: Intent, confidence: f32) -> Self {
        Self {
            intent,
            confidence,
            entities: Entities::default(),
            requires_diagnostics: intent.requires_diagnostics(),
            reasoning: None,
        }
    }

    /// The conservative default when nothing else applies.
    pub fn fallback() -> Self {
        Self::new(Intent::NormalQuery, 0.3)
    }
}

/// Classifier cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_from_token() {
        assert_eq!(Intent::from_token("systemstatus"), Some(Intent::SystemStatus));
        assert_eq!(Intent::from_token("SYSTEM_STATUS"), Some(Intent::SystemStatus));
        assert_eq!(Intent::from_token("Device Health"), Some(Intent::DeviceHealth));
        assert_eq!(Intent::from_token("banana"), None);
    }

    #[test]
    fn test_requires_diagnostics() {
        assert!(Intent::DeviceHealth.requires_diagnostics());
        assert!(Intent::IssueDiagnosis.requires_diagnostics());
        assert!(Intent::SystemStatus.requires_diagnostics());
        assert!(!Intent::Discovery.requires_diagnostics());
        assert!(!Intent::NormalQuery.requires_diagnostics());
        assert!(!Intent::ModeManagement.requires_diagnostics());
    }

    #[test]
    fn test_entities_fill_missing() {
        let mut entities = Entities {
            device_name: Some("motion sensor".to_string()),
            ..Default::default()
        };
        entities.fill_missing_from(Entities {
            device_name: Some("should not overwrite".to_string()),
            room_name: Some("bedroom".to_string()),
            ..Default::default()
        });
        assert_eq!(entities.device_name.as_deref(), Some("motion sensor"));
        assert_eq!(entities.room_name.as_deref(), Some("bedroom"));
    }

    #[test]
    fn test_fallback_shape() {
        let fallback = IntentClassification::fallback();
        assert_eq!(fallback.intent, Intent::NormalQuery);
        assert!((fallback.confidence - 0.3).abs() < f32::EPSILON);
        assert!(!fallback.requires_diagnostics);
    }
}
