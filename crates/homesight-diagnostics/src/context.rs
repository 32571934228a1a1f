//! Diagnostic context and report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use homesight_devices::{AutomationRuleMatch, DeviceEventResult, DeviceStatus, UnifiedDevice};
use homesight_index::DeviceSearchResult;
use homesight_patterns::{IssuePattern, PatternType};

/// Everything the workflow managed to gather for one request.
///
/// Every field is optional: a missing field means the data source failed
/// or was not part of the plan. Consumers must tolerate any subset.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticContext {
    pub device: Option<UnifiedDevice>,
    pub health_data: Option<DeviceStatus>,
    pub recent_events: Option<DeviceEventResult>,
    pub similar_devices: Option<Vec<DeviceSearchResult>>,
    pub related_issues: Vec<IssuePattern>,
    pub identified_automations: Option<Vec<AutomationRuleMatch>>,
    pub system_status: Option<SystemStatusOverview>,
}

impl DiagnosticContext {
    /// Whether any diagnostic signal (a non-normal pattern or at least one
    /// event) was produced.
    pub fn has_signals(&self) -> bool {
        let has_pattern = self
            .related_issues
            .iter()
            .any(|p| p.pattern_type != PatternType::Normal);
        let has_events = self
            .recent_events
            .as_ref()
            .map(|r| !r.events.is_empty())
            .unwrap_or(false);
        has_pattern || has_events
    }
}

/// Health buckets across the whole registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemStatusOverview {
    pub total: usize,
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
    /// One line per degraded device.
    pub recent_issues: Vec<String>,
    /// Fleet-level observations ("system_wide_connectivity: ...").
    pub system_wide_patterns: Vec<String>,
}

/// The workflow's output: produced, returned, forgotten.
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    /// One-line synthesis.
    pub summary: String,
    pub diagnostic_context: DiagnosticContext,
    /// Markdown block for downstream LLM injection.
    pub rich_context: String,
    /// Ordered, evidence-based recommendations.
    pub recommendations: Vec<String>,
    /// Mirror of the classification confidence.
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}
