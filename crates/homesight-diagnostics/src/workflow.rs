//! Diagnostic workflow orchestrator.
//!
//! Plans data gathering per intent, fans out to the registry, the
//! semantic index, the platform API and the pattern detector, and joins
//! with settle-all semantics: a failed subtask is logged, its context
//! field stays empty, and the report is produced regardless. This
//! function never fails.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use homesight_core::{DiagnosticsConfig, Error, Result};
use homesight_devices::{
    AutomationService, DeviceRegistry, DeviceService, EventQuery, UnifiedDevice,
    UniversalDeviceId,
};
use homesight_index::{SearchOptions, SemanticDeviceIndex};
use homesight_intent::{Intent, IntentClassification};
use homesight_patterns::{PatternConfig, PatternDetector};

use crate::context::{DiagnosticContext, DiagnosticReport, SystemStatusOverview};
use crate::recommend::build_recommendations;
use crate::render::render_rich_context;

/// Offline devices at or above this count read as a fleet-wide problem.
const SYSTEM_WIDE_OFFLINE_MIN: usize = 3;

/// Per-intent diagnostic orchestrator. Holds no cross-request state.
pub struct DiagnosticWorkflow {
    registry: Arc<DeviceRegistry>,
    index: Arc<SemanticDeviceIndex>,
    device_service: Arc<dyn DeviceService>,
    automation_service: Option<Arc<dyn AutomationService>>,
    detector: PatternDetector,
    config: DiagnosticsConfig,
}

impl DiagnosticWorkflow {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        index: Arc<SemanticDeviceIndex>,
        device_service: Arc<dyn DeviceService>,
        config: DiagnosticsConfig,
    ) -> Self {
        let detector = PatternDetector::with_device_service(
            PatternConfig::from(&config),
            device_service.clone(),
        );
        Self {
            registry,
            index,
            device_service,
            automation_service: None,
            detector,
            config,
        }
    }

    /// Wire the optional rule-matching evidence source.
    pub fn with_automation_service(mut self, service: Arc<dyn AutomationService>) -> Self {
        self.automation_service = Some(service);
        self
    }

    /// Execute the per-intent plan and synthesise a report.
    ///
    /// Total over its input: every dependency failing still yields a
    /// well-formed report.
    pub async fn execute_diagnostic_workflow(
        &self,
        classification: &IntentClassification,
        user_message: &str,
    ) -> DiagnosticReport {
        let mut context = DiagnosticContext::default();

        match classification.intent {
            Intent::DeviceHealth => {
                self.gather_device_diagnostics(&mut context, classification, user_message, 50, false)
                    .await;
            }
            Intent::IssueDiagnosis => {
                self.gather_device_diagnostics(&mut context, classification, user_message, 100, true)
                    .await;
            }
            Intent::Discovery => {
                self.gather_discovery(&mut context, classification, user_message)
                    .await;
            }
            Intent::SystemStatus => {
                self.gather_system_status(&mut context).await;
            }
            Intent::ModeManagement | Intent::NormalQuery => {}
        }

        let recommendations =
            build_recommendations(classification.intent, &context, &self.config);
        let rich_context = render_rich_context(&context);
        let summary = self.synthesise_summary(classification.intent, &context, &recommendations);

        DiagnosticReport {
            summary,
            diagnostic_context: context,
            rich_context,
            recommendations,
            confidence: classification.confidence,
            timestamp: Utc::now(),
        }
    }

    /// Three-stage device resolution; failure is non-fatal.
    async fn resolve_device(
        &self,
        classification: &IntentClassification,
        user_message: &str,
    ) -> Option<UnifiedDevice> {
        if let Some(raw) = &classification.entities.device_id {
            if let Ok(id) = UniversalDeviceId::parse(raw) {
                if let Some(device) = self.registry.get_device(&id).await {
                    return Some(device);
                }
            }
        }

        if let Some(name) = &classification.entities.device_name {
            let options =
                SearchOptions::with_limit(1).min_similarity(self.config.semantic_min_similarity);
            if let Ok(results) = self.index.search_devices(name, options).await {
                if let Some(hit) = results.into_iter().next() {
                    if let Some(device) = hit.device {
                        return Some(device);
                    }
                    if let Some(device) = self.registry.get_device(&hit.device_id).await {
                        return Some(device);
                    }
                }
            }
        }

        self.registry.resolve_device(user_message).await
    }

    async fn with_deadline<T, F>(&self, label: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(Duration::from_millis(self.config.api_call_timeout_ms), fut)
            .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!("{} call expired", label))),
        }
    }

    async fn gather_device_diagnostics(
        &self,
        context: &mut DiagnosticContext,
        classification: &IntentClassification,
        user_message: &str,
        event_limit: usize,
        with_automations: bool,
    ) {
        let device = self.resolve_device(classification, user_message).await;
        context.device = device.clone();
        let device = match device {
            Some(device) => device,
            None => {
                tracing::debug!("No device resolved; skipping per-device data gathering");
                return;
            }
        };
        let id = device.id.clone();

        let status_task = self.with_deadline("status", self.device_service.get_device_status(&id));
        let events_task = self.with_deadline(
            "events",
            self.device_service
                .get_device_events(&id, EventQuery::with_limit(event_limit)),
        );
        let similar_task = self.find_similar(&device, 5);
        let automations_task = async {
            if !with_automations {
                return None;
            }
            match &self.automation_service {
                Some(service) => {
                    Some(service.find_rules_for_device(&id, None).await)
                }
                None => None,
            }
        };

        let (status, events, similar, automations) =
            tokio::join!(status_task, events_task, similar_task, automations_task);

        match status {
            Ok(status) => context.health_data = Some(status),
            Err(e) => tracing::warn!(device = %id, "Status fetch failed: {}", e),
        }
        match events {
            Ok(result) => context.recent_events = Some(result),
            Err(e) => tracing::warn!(device = %id, "Event fetch failed: {}", e),
        }
        match similar {
            Ok(results) => context.similar_devices = Some(results),
            Err(e) => tracing::warn!(device = %id, "Similar-device search failed: {}", e),
        }
        if let Some(rules) = automations {
            context.identified_automations = Some(rules);
        }

        // Patterns run over whatever events actually arrived.
        let events: &[_] = context
            .recent_events
            .as_ref()
            .map(|r| r.events.as_slice())
            .unwrap_or(&[]);
        let outcome = self.detector.detect_all(&id, events).await;
        if !outcome.all_algorithms_succeeded {
            tracing::warn!(
                device = %id,
                errors = ?outcome.errors,
                "Pattern detection completed with partial failures"
            );
        }
        context.related_issues = outcome.patterns;
    }

    async fn find_similar(
        &self,
        device: &UnifiedDevice,
        limit: usize,
    ) -> Result<Vec<homesight_index::DeviceSearchResult>> {
        let results = self
            .index
            .search_devices(device.display_name(), SearchOptions::with_limit(limit + 1))
            .await?;
        Ok(results
            .into_iter()
            .filter(|r| r.device_id != device.id)
            .take(limit)
            .collect())
    }

    async fn gather_discovery(
        &self,
        context: &mut DiagnosticContext,
        classification: &IntentClassification,
        user_message: &str,
    ) {
        let query = classification
            .entities
            .device_name
            .as_deref()
            .unwrap_or(user_message);
        match self
            .index
            .search_devices(query, SearchOptions::with_limit(10))
            .await
        {
            Ok(results) => context.similar_devices = Some(results),
            Err(e) => tracing::warn!("Discovery search failed: {}", e),
        }
    }

    async fn gather_system_status(&self, context: &mut DiagnosticContext) {
        let devices = self.registry.all_devices().await;
        let mut overview = SystemStatusOverview {
            total: devices.len(),
            ..Default::default()
        };

        for device in &devices {
            if !device.online {
                overview.critical += 1;
                overview
                    .recent_issues
                    .push(format!("{}: offline", device.display_name()));
            } else if device
                .battery_level
                .map(|level| level < self.config.battery_low)
                .unwrap_or(false)
            {
                overview.warning += 1;
                overview.recent_issues.push(format!(
                    "{}: battery at {}%",
                    device.display_name(),
                    device.battery_level.unwrap_or(0)
                ));
            } else {
                overview.healthy += 1;
            }
        }

        let offline = overview.critical;
        if offline >= SYSTEM_WIDE_OFFLINE_MIN {
            overview.system_wide_patterns.push(format!(
                "system_wide_connectivity: {} devices offline together",
                offline
            ));
        }

        context.system_status = Some(overview);
    }

    fn synthesise_summary(
        &self,
        intent: Intent,
        context: &DiagnosticContext,
        recommendations: &[String],
    ) -> String {
        if let Some(status) = &context.system_status {
            return format!(
                "System status: {} of {} devices healthy",
                status.healthy, status.total
            );
        }
        if let Some(device) = &context.device {
            let lead = recommendations
                .first()
                .map(|r| r.split(". ").next().unwrap_or(r).to_string())
                .unwrap_or_else(|| "no issues to report".to_string());
            return format!("Diagnosis for {}: {}", device.display_name(), lead);
        }
        match intent {
            Intent::Discovery => {
                let found = context
                    .similar_devices
                    .as_ref()
                    .map(|r| r.len())
                    .unwrap_or(0);
                format!("Found {} matching devices", found)
            }
            Intent::ModeManagement | Intent::NormalQuery => {
                "No diagnostics were gathered for this request".to_string()
            }
            _ => "No matching device was found; the report contains what was knowable".to_string(),
        }
    }
}
