//! End-to-end workflow scenarios over fully mocked dependencies.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use homesight_core::{DiagnosticsConfig, Error, Result};
use homesight_devices::{
    AutomationRuleMatch, AutomationService, CapabilityTag, DeviceEvent, DeviceEventResult,
    DeviceRegistry, DeviceService, DeviceStatus, EventQuery, UnifiedDevice, UniversalDeviceId,
};
use homesight_diagnostics::{
    DiagnosticPipeline, DiagnosticReport, DiagnosticWorkflow, FORBIDDEN_SPECULATION,
};
use homesight_index::{MetadataDocument, SemanticDeviceIndex};
use homesight_intent::{Entities, Intent, IntentClassification, IntentClassifier};
use homesight_patterns::{PatternType, Severity};

/// Platform mock: canned status and events, optionally failing outright.
struct MockDeviceService {
    status: Option<DeviceStatus>,
    events: Vec<DeviceEvent>,
    fail_everything: bool,
}

impl MockDeviceService {
    fn healthy(events: Vec<DeviceEvent>) -> Self {
        Self {
            status: Some(DeviceStatus {
                online: Some(true),
                ..Default::default()
            }),
            events,
            fail_everything: false,
        }
    }

    fn with_battery(battery: u8) -> Self {
        Self {
            status: Some(DeviceStatus {
                components: serde_json::json!({
                    "main": { "battery": { "battery": { "value": battery } } }
                }),
                online: Some(true),
                ..Default::default()
            }),
            events: Vec::new(),
            fail_everything: false,
        }
    }

    fn broken() -> Self {
        Self {
            status: None,
            events: Vec::new(),
            fail_everything: true,
        }
    }
}

#[async_trait]
impl DeviceService for MockDeviceService {
    async fn list_devices(&self) -> Result<Vec<UnifiedDevice>> {
        if self.fail_everything {
            return Err(Error::network("platform unreachable"));
        }
        Ok(Vec::new())
    }

    async fn get_device(&self, id: &UniversalDeviceId) -> Result<UnifiedDevice> {
        Err(Error::not_found(id.to_string()))
    }

    async fn get_device_status(&self, _id: &UniversalDeviceId) -> Result<DeviceStatus> {
        if self.fail_everything {
            return Err(Error::network("platform unreachable"));
        }
        self.status
            .clone()
            .ok_or_else(|| Error::not_found("no status"))
    }

    async fn get_device_events(
        &self,
        _id: &UniversalDeviceId,
        query: EventQuery,
    ) -> Result<DeviceEventResult> {
        if self.fail_everything {
            return Err(Error::network("platform unreachable"));
        }
        Ok(DeviceEventResult::from_events(self.events.clone(), &query))
    }
}

struct MockAutomationService {
    rules: Vec<AutomationRuleMatch>,
}

#[async_trait]
impl AutomationService for MockAutomationService {
    async fn find_rules_for_device(
        &self,
        _device_id: &UniversalDeviceId,
        _location_id: Option<&str>,
    ) -> Vec<AutomationRuleMatch> {
        self.rules.clone()
    }
}

fn bulb_id() -> UniversalDeviceId {
    UniversalDeviceId::new("smartthings", "bulb-1")
}

fn event_at(rfc3339: &str, attribute: &str, value: &str) -> DeviceEvent {
    DeviceEvent::new(
        bulb_id(),
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc),
        attribute,
        attribute,
        serde_json::json!(value),
    )
}

async fn workflow_for(
    device: UnifiedDevice,
    service: MockDeviceService,
) -> (DiagnosticWorkflow, Arc<DeviceRegistry>) {
    let registry = Arc::new(DeviceRegistry::new());
    registry.add_device(device.clone()).await.unwrap();

    let index = Arc::new(SemanticDeviceIndex::with_defaults());
    index.initialize().await.unwrap();
    index.set_device_registry(registry.clone()).await;
    index
        .index_device(&MetadataDocument::for_device(&device))
        .await
        .unwrap();

    let workflow = DiagnosticWorkflow::new(
        registry.clone(),
        index,
        Arc::new(service),
        DiagnosticsConfig::default(),
    );
    (workflow, registry)
}

fn classification(intent: Intent, confidence: f32, device_id: Option<&UniversalDeviceId>) -> IntentClassification {
    IntentClassification {
        intent,
        confidence,
        entities: Entities {
            device_id: device_id.map(|id| id.as_str().to_string()),
            ..Default::default()
        },
        requires_diagnostics: intent.requires_diagnostics(),
        reasoning: None,
    }
}

fn assert_no_speculation(report: &DiagnosticReport) {
    for item in &report.recommendations {
        let lowered = item.to_lowercase();
        for forbidden in FORBIDDEN_SPECULATION {
            assert!(
                !lowered.contains(forbidden),
                "speculative vocabulary {:?} in {:?}",
                forbidden,
                item
            );
        }
    }
}

// S1: a 3-second off -> on re-trigger reads as an automation override.
#[tokio::test]
async fn rapid_retrigger_scenario() {
    let device = UnifiedDevice::new(bulb_id(), "Alcove Light")
        .with_capability(CapabilityTag::Switch);
    let events = vec![
        event_at("2025-11-28T00:34:44Z", "switch", "off"),
        event_at("2025-11-28T00:34:47Z", "switch", "on"),
    ];
    let (workflow, _) = workflow_for(device, MockDeviceService::healthy(events)).await;

    let classification = classification(Intent::IssueDiagnosis, 0.9, Some(&bulb_id()));
    let report = workflow
        .execute_diagnostic_workflow(&classification, "why did my alcove light come on at 1 am?")
        .await;

    let rapid = report
        .diagnostic_context
        .related_issues
        .iter()
        .find(|p| {
            matches!(
                p.pattern_type,
                PatternType::RapidChanges | PatternType::AutomationConflict
            )
        })
        .expect("rapid pattern detected");
    assert!(rapid.confidence >= 0.95);

    let automation_item = report
        .recommendations
        .iter()
        .find(|r| r.to_lowercase().contains("automation"))
        .expect("automation recommendation present");
    assert!(
        automation_item.contains("Observable pattern:")
            || automation_item.contains("Evidence:")
            || automation_item.contains("Observation:")
    );
    assert!(report
        .recommendations
        .iter()
        .all(|r| !r.to_lowercase().contains("motion")));
    assert_no_speculation(&report);
}

// S2: a 26-hour silence is a critical connectivity gap.
#[tokio::test]
async fn connectivity_gap_scenario() {
    let device = UnifiedDevice::new(bulb_id(), "Alcove Light");
    let events = vec![
        event_at("2025-11-27T00:00:00Z", "switch", "on"),
        event_at("2025-11-28T02:00:00Z", "switch", "off"),
    ];
    let (workflow, _) = workflow_for(device, MockDeviceService::healthy(events)).await;

    let classification = classification(Intent::DeviceHealth, 0.85, Some(&bulb_id()));
    let report = workflow
        .execute_diagnostic_workflow(&classification, "check my alcove light")
        .await;

    let gap = report
        .diagnostic_context
        .related_issues
        .iter()
        .find(|p| p.pattern_type == PatternType::ConnectivityGap)
        .expect("connectivity gap detected");
    assert_eq!(gap.severity, Severity::Critical);
    assert!((gap.score - 1.0).abs() < f32::EPSILON);

    let gap_item = report
        .recommendations
        .iter()
        .find(|r| r.contains("gap"))
        .expect("gap recommendation present");
    assert!(gap_item.contains("network") || gap_item.contains("range"));
    assert_no_speculation(&report);
}

// S3: battery at 5% with no events is a critical battery pattern.
#[tokio::test]
async fn battery_critical_scenario() {
    let device = UnifiedDevice::new(bulb_id(), "Front Door Sensor")
        .with_capability(CapabilityTag::Battery);
    let (workflow, _) = workflow_for(device, MockDeviceService::with_battery(5)).await;

    let classification = classification(Intent::DeviceHealth, 0.85, Some(&bulb_id()));
    let report = workflow
        .execute_diagnostic_workflow(&classification, "check my front door sensor")
        .await;

    let battery = report
        .diagnostic_context
        .related_issues
        .iter()
        .find(|p| p.pattern_type == PatternType::BatteryDegradation)
        .expect("battery pattern detected");
    assert_eq!(battery.severity, Severity::Critical);
    assert!((battery.score - 1.0).abs() < f32::EPSILON);

    assert!(report
        .recommendations
        .iter()
        .any(|r| r.starts_with("Action: Replace battery")));
    assert_no_speculation(&report);
}

// S4: Sengled device, rapid pattern, no automations available.
#[tokio::test]
async fn sengled_priority_scenario() {
    let device = UnifiedDevice::new(bulb_id(), "Alcove Light")
        .with_manufacturer("Sengled")
        .with_capability(CapabilityTag::Switch);
    let events = vec![
        event_at("2025-11-28T00:34:44Z", "switch", "off"),
        event_at("2025-11-28T00:34:47Z", "switch", "on"),
    ];
    let (workflow, _) = workflow_for(device, MockDeviceService::healthy(events)).await;

    let classification = classification(Intent::IssueDiagnosis, 0.9, Some(&bulb_id()));
    let report = workflow
        .execute_diagnostic_workflow(&classification, "what's wrong with my alcove light?")
        .await;

    assert!(report.recommendations[0].contains("PRIORITY"));
    assert!(report.recommendations[0].contains("Sengled Home"));
    let priority_at = 0;
    let limitation_at = report
        .recommendations
        .iter()
        .position(|r| r.contains("API Limitation"))
        .expect("API limitation item present");
    assert!(limitation_at > priority_at);
    assert!(report
        .recommendations
        .iter()
        .all(|r| !r.to_lowercase().contains("motion")));
    assert_no_speculation(&report);
}

// Motion guidance appears when (and only when) an identified automation
// uses a motion sensor.
#[tokio::test]
async fn motion_guidance_gated_on_identified_rule() {
    let device = UnifiedDevice::new(bulb_id(), "Alcove Light")
        .with_capability(CapabilityTag::Switch);
    let events = vec![
        event_at("2025-11-28T00:34:44Z", "switch", "off"),
        event_at("2025-11-28T00:34:47Z", "switch", "on"),
    ];
    let registry = Arc::new(DeviceRegistry::new());
    registry.add_device(device.clone()).await.unwrap();
    let index = Arc::new(SemanticDeviceIndex::with_defaults());
    index.initialize().await.unwrap();
    index.set_device_registry(registry.clone()).await;

    let workflow = DiagnosticWorkflow::new(
        registry,
        index,
        Arc::new(MockDeviceService::healthy(events)),
        DiagnosticsConfig::default(),
    )
    .with_automation_service(Arc::new(MockAutomationService {
        rules: vec![AutomationRuleMatch {
            rule_id: "r-9".to_string(),
            rule_name: "Hallway night light".to_string(),
            device_roles: vec!["trigger: motion sensor".to_string()],
            status: "enabled".to_string(),
            triggered_at: None,
            confidence: Some(0.9),
        }],
    }));

    let classification = classification(Intent::IssueDiagnosis, 0.9, Some(&bulb_id()));
    let report = workflow
        .execute_diagnostic_workflow(&classification, "why did my alcove light come on?")
        .await;

    assert!(report
        .recommendations
        .iter()
        .any(|r| r.to_lowercase().contains("motion")));
    // Rules were identified, so the API-limitation item must not appear.
    assert!(report
        .recommendations
        .iter()
        .all(|r| !r.contains("API Limitation")));
    assert_no_speculation(&report);
}

// The workflow is total: every dependency failing still yields a report.
#[tokio::test]
async fn workflow_is_total_under_failure() {
    let registry = Arc::new(DeviceRegistry::new());
    let index = Arc::new(SemanticDeviceIndex::with_defaults());
    // Index never initialized and no registry wired into it.

    let workflow = DiagnosticWorkflow::new(
        registry,
        index,
        Arc::new(MockDeviceService::broken()),
        DiagnosticsConfig::default(),
    );

    let classification = IntentClassification {
        intent: Intent::IssueDiagnosis,
        confidence: 0.9,
        entities: Entities {
            device_name: Some("motion sensor".to_string()),
            ..Default::default()
        },
        requires_diagnostics: true,
        reasoning: None,
    };
    let report = workflow
        .execute_diagnostic_workflow(&classification, "why is my motion sensor broken?")
        .await;

    assert!(!report.summary.is_empty());
    assert!((report.confidence - 0.9).abs() < f32::EPSILON);
    assert!(report.diagnostic_context.device.is_none());
    assert!(report.diagnostic_context.health_data.is_none());
    assert_no_speculation(&report);
}

// Device resolves but every platform call fails: the report carries the
// device and omits the failed fields.
#[tokio::test]
async fn partial_failure_omits_fields() {
    let device = UnifiedDevice::new(bulb_id(), "Alcove Light");
    let (workflow, _) = workflow_for(device, MockDeviceService::broken()).await;

    let classification = classification(Intent::DeviceHealth, 0.85, Some(&bulb_id()));
    let report = workflow
        .execute_diagnostic_workflow(&classification, "check my alcove light")
        .await;

    assert!(report.diagnostic_context.device.is_some());
    assert!(report.diagnostic_context.health_data.is_none());
    assert!(report.diagnostic_context.recent_events.is_none());
    assert!(report.rich_context.contains("## Device Information"));
    assert!(!report.rich_context.contains("## Health Status"));
}

#[tokio::test]
async fn system_status_scenario() {
    let registry = Arc::new(DeviceRegistry::new());
    let devices = [
        UnifiedDevice::new(UniversalDeviceId::new("smartthings", "a"), "Porch Light")
            .with_online(false),
        UnifiedDevice::new(UniversalDeviceId::new("smartthings", "b"), "Door Sensor")
            .with_battery_level(10),
        UnifiedDevice::new(UniversalDeviceId::new("smartthings", "c"), "Kitchen Lamp"),
        UnifiedDevice::new(UniversalDeviceId::new("smartthings", "d"), "Thermostat")
            .with_battery_level(80),
    ];
    for device in devices {
        registry.add_device(device).await.unwrap();
    }
    let index = Arc::new(SemanticDeviceIndex::with_defaults());
    index.initialize().await.unwrap();
    index.set_device_registry(registry.clone()).await;

    let workflow = DiagnosticWorkflow::new(
        registry,
        index,
        Arc::new(MockDeviceService::healthy(Vec::new())),
        DiagnosticsConfig::default(),
    );

    let classification = classification(Intent::SystemStatus, 0.9, None);
    let report = workflow
        .execute_diagnostic_workflow(&classification, "how is my system?")
        .await;

    let status = report
        .diagnostic_context
        .system_status
        .as_ref()
        .expect("system status gathered");
    assert_eq!(status.total, 4);
    assert_eq!(status.healthy, 2);
    assert_eq!(status.warning, 1);
    assert_eq!(status.critical, 1);
    assert_eq!(status.recent_issues.len(), 2);
    assert!(report.summary.contains("2 of 4"));
    assert!(report.rich_context.contains("## System Status Overview"));
}

#[tokio::test]
async fn discovery_scenario() {
    let device = UnifiedDevice::new(bulb_id(), "Alcove Light")
        .with_capability(CapabilityTag::Switch);
    let (workflow, registry) = workflow_for(device, MockDeviceService::healthy(Vec::new())).await;

    // A second lamp to discover.
    let other = UnifiedDevice::new(UniversalDeviceId::new("smartthings", "bulb-2"), "Porch Light")
        .with_capability(CapabilityTag::Switch);
    registry.add_device(other).await.unwrap();

    let classification = IntentClassification {
        intent: Intent::Discovery,
        confidence: 0.85,
        entities: Entities {
            device_name: Some("light".to_string()),
            ..Default::default()
        },
        requires_diagnostics: false,
        reasoning: None,
    };
    let report = workflow
        .execute_diagnostic_workflow(&classification, "list all devices like my lights")
        .await;

    assert!(report.diagnostic_context.similar_devices.is_some());
    // Discovery gathers similar devices only.
    assert!(report.diagnostic_context.related_issues.is_empty());
    assert!(report.diagnostic_context.health_data.is_none());
}

#[tokio::test]
async fn minimal_report_for_normal_query() {
    let device = UnifiedDevice::new(bulb_id(), "Alcove Light");
    let (workflow, _) = workflow_for(device, MockDeviceService::healthy(Vec::new())).await;

    let classification = classification(Intent::NormalQuery, 0.4, None);
    let report = workflow
        .execute_diagnostic_workflow(&classification, "tell me a joke")
        .await;

    assert!(report.diagnostic_context.device.is_none());
    assert!(report.rich_context.is_empty());
    assert!(report.recommendations.is_empty());
}

// Full pipeline: keyword classification into the health plan, normal path
// recommendation when nothing is wrong.
#[tokio::test]
async fn pipeline_classifies_and_diagnoses() {
    let device = UnifiedDevice::new(bulb_id(), "Motion Sensor")
        .with_capability(CapabilityTag::MotionSensor);
    let registry = Arc::new(DeviceRegistry::new());
    registry.add_device(device.clone()).await.unwrap();

    let index = Arc::new(SemanticDeviceIndex::with_defaults());
    index.initialize().await.unwrap();
    index.set_device_registry(registry.clone()).await;
    index
        .index_device(&MetadataDocument::for_device(&device))
        .await
        .unwrap();

    let workflow = DiagnosticWorkflow::new(
        registry,
        index.clone(),
        Arc::new(MockDeviceService::healthy(Vec::new())),
        DiagnosticsConfig::default(),
    );
    let pipeline = DiagnosticPipeline::new(
        Arc::new(IntentClassifier::keyword_only()),
        workflow,
        index,
    );

    let (classification, report) = pipeline.diagnose("check my motion sensor", None).await;

    assert_eq!(classification.intent, Intent::DeviceHealth);
    assert!(classification.requires_diagnostics);
    assert!(report.diagnostic_context.device.is_some());
    assert!(report
        .recommendations
        .iter()
        .any(|r| r == "No unusual patterns detected in recent activity."));
    assert_no_speculation(&report);
}

// Mocked workflow latency stays well under the CI budget.
#[tokio::test]
async fn mocked_workflow_latency() {
    let device = UnifiedDevice::new(bulb_id(), "Alcove Light");
    let events = vec![
        event_at("2025-11-28T00:34:44Z", "switch", "off"),
        event_at("2025-11-28T00:34:47Z", "switch", "on"),
    ];
    let (workflow, _) = workflow_for(device, MockDeviceService::healthy(events)).await;
    let classification = classification(Intent::IssueDiagnosis, 0.9, Some(&bulb_id()));

    let started = std::time::Instant::now();
    let _ = workflow
        .execute_diagnostic_workflow(&classification, "why did my alcove light come on?")
        .await;
    assert!(started.elapsed().as_millis() < 100);
}
