//! Pattern detector: runs all four algorithms concurrently and joins them
//! with settle-all semantics.

use std::sync::Arc;

use homesight_devices::{DeviceEvent, DeviceService, UniversalDeviceId};

use crate::algorithms::{automation_conflict, battery_degradation, connectivity_gap, event_anomaly};
use crate::config::PatternConfig;
use crate::types::{DetectionOutcome, IssuePattern, PatternType, Severity};

/// Severity-scored pattern detection over a device's event timeline.
pub struct PatternDetector {
    device_service: Option<Arc<dyn DeviceService>>,
    config: PatternConfig,
}

impl PatternDetector {
    /// Detector without a platform connection; the battery check is
    /// skipped.
    pub fn new(config: PatternConfig) -> Self {
        Self {
            device_service: None,
            config,
        }
    }

    /// Detector with a platform connection for the battery check.
    pub fn with_device_service(config: PatternConfig, service: Arc<dyn DeviceService>) -> Self {
        Self {
            device_service: Some(service),
            config,
        }
    }

    /// Run every algorithm. One algorithm failing never aborts the
    /// others; its error is recorded and it contributes no pattern.
    pub async fn detect_all(
        &self,
        device_id: &UniversalDeviceId,
        events: &[DeviceEvent],
    ) -> DetectionOutcome {
        let config = &self.config;

        let connectivity = async { connectivity_gap(events, config) };
        let automation = async { automation_conflict(events, config) };
        let anomaly = async { event_anomaly(events, config) };
        let battery = async {
            match &self.device_service {
                Some(service) => battery_degradation(service.as_ref(), device_id, config).await,
                None => Ok(None),
            }
        };

        let (connectivity, automation, anomaly, battery) =
            tokio::join!(connectivity, automation, anomaly, battery);

        let mut outcome = DetectionOutcome {
            events_analyzed: events.len(),
            ..Default::default()
        };

        outcome.patterns.extend(connectivity);
        outcome.patterns.extend(automation);
        outcome.patterns.extend(anomaly);
        match battery {
            Ok(pattern) => outcome.patterns.extend(pattern),
            Err(e) => {
                tracing::warn!(device = %device_id, "Battery check failed: {}", e);
                outcome.errors.push(format!("battery_degradation: {}", e));
            }
        }
        outcome.all_algorithms_succeeded = outcome.errors.is_empty();

        // Nothing observed and nothing failed: report a clean bill of
        // health instead of an empty list.
        if events.is_empty() && outcome.patterns.is_empty() && outcome.errors.is_empty() {
            outcome.patterns.push(IssuePattern {
                pattern_type: PatternType::Normal,
                description: "No issues detected in recent activity".to_string(),
                occurrences: 0,
                confidence: 0.95,
                severity: Severity::Low,
                score: 0.0,
            });
        }

        outcome.patterns.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.pattern_type.to_string().cmp(&b.pattern_type.to_string()))
        });
        outcome
    }
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::new(PatternConfig::default())
    }
}
